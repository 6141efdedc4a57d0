//! TCP transport
//!
//! Delivers server bytes as discrete chunks through a channel fed by a reader
//! thread, so the event loop never blocks on the socket.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::error::TransportError;

/// A connected telnet server
pub struct TcpTransport {
    stream: TcpStream,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Reader thread handle
    reader_thread: Option<JoinHandle<()>>,
    /// Channel to receive server output
    output_rx: Receiver<Vec<u8>>,
}

impl TcpTransport {
    /// Connect and start the reader thread
    pub fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", host, port);
        info!("connecting to {}", addr);
        let stream = TcpStream::connect(&addr).map_err(|source| TransportError::Connect {
            addr: addr.clone(),
            source,
        })?;
        let _ = stream.set_nodelay(true);
        let mut reader = stream
            .try_clone()
            .map_err(|source| TransportError::Connect { addr, source })?;

        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel::<Vec<u8>>();

        let thread_running = running.clone();
        let reader_thread = thread::spawn(move || {
            let mut buffer = vec![0u8; 4096];
            while thread_running.load(Ordering::SeqCst) {
                match reader.read(&mut buffer) {
                    Ok(0) => {
                        debug!("server closed the connection");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(buffer[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("read failed: {}", e);
                        break;
                    }
                }
            }
            thread_running.store(false, Ordering::SeqCst);
        });

        Ok(Self {
            stream,
            running,
            reader_thread: Some(reader_thread),
            output_rx: rx,
        })
    }

    /// Drain every chunk received so far, in arrival order
    pub fn try_recv_all(&mut self) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        loop {
            match self.output_rx.try_recv() {
                Ok(data) => chunks.push(data),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
        chunks
    }

    /// Write bytes to the server immediately
    pub fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if data.is_empty() {
            return Ok(());
        }
        if !self.is_running() {
            return Err(TransportError::Closed);
        }
        debug!("Sending {:?}", data);
        self.stream.write_all(data).map_err(TransportError::Write)?;
        self.stream.flush().map_err(TransportError::Write)
    }

    /// Check if the connection is still open
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // Unblocks the reader thread
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
    }
}
