//! mudcon - a telnet console client
//!
//! Connects to a telnet server (typically a MUD), renders its ANSI-colored
//! output and provides a local input line with command history.
//!
//! # Quick Start
//!
//! ```text
//! mudcon mud.example.org 4000
//! mudcon --term VT100 --width 100 localhost 23
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Enter | Send the input line |
//! | Up/Down | Browse command history |
//! | Left/Right | Scroll a long input line |
//! | Esc | Clear the input line |
//! | Ctrl+C / Ctrl+Q | Quit |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{self, Event, KeyEventKind};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mudcon::config::{config_dir, Config};
use mudcon::core::session::Session;
use mudcon::core::telnet::WindowSize;
use mudcon::core::transport::TcpTransport;
use mudcon::editor::EchoMode;
use mudcon::error::ConfigError;
use mudcon::ui::{KeyAction, KeyMapper, Renderer};

/// Command line arguments
#[derive(Default)]
struct Args {
    host: String,
    port: u16,
    term_type: Option<String>,
    width: Option<u16>,
    config_path: Option<PathBuf>,
    widget_echo: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("mudcon {}", VERSION);
}

fn print_help() {
    eprintln!("mudcon {} - a telnet console client", VERSION);
    eprintln!();
    eprintln!("Usage: mudcon [OPTIONS] <HOST> <PORT>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -t, --term <TYPE>     Terminal type sent to the server (default: ANSI)");
    eprintln!("  -w, --width <COLS>    Wrap output at this many columns (default: 80)");
    eprintln!("  -c, --config <PATH>   Read configuration from PATH");
    eprintln!("      --widget-echo     Do not echo typed lines into the output");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Enter                 Send the input line");
    eprintln!("  Up/Down               Browse command history");
    eprintln!("  Left/Right            Scroll a long input line");
    eprintln!("  Esc                   Clear the input line");
    eprintln!("  Ctrl+C, Ctrl+Q        Quit");
    eprintln!();
    eprintln!("Configuration: ~/.mudcon/config.toml");
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut positional = Vec::new();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-t" | "--term" => {
                i += 1;
                let value = args.get(i).ok_or("Missing terminal type argument")?;
                parsed.term_type = Some(value.clone());
            }
            "-w" | "--width" => {
                i += 1;
                let value = args.get(i).ok_or("Missing width argument")?;
                let width = value
                    .parse::<u16>()
                    .map_err(|_| format!("Invalid width: {}", value))?;
                parsed.width = Some(width);
            }
            "-c" | "--config" => {
                i += 1;
                let value = args.get(i).ok_or("Missing config path argument")?;
                parsed.config_path = Some(PathBuf::from(value));
            }
            "--widget-echo" => {
                parsed.widget_echo = true;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    match positional.as_slice() {
        [host, port] => {
            parsed.host = host.clone();
            parsed.port = port
                .parse()
                .map_err(|_| format!("Invalid port: {}", port))?;
            Ok(parsed)
        }
        _ => Err("Expected <HOST> <PORT>".to_string()),
    }
}

/// Build the effective configuration. A broken default config file is not
/// fatal; it is returned alongside the defaults so it can be reported.
fn load_config(args: &Args) -> anyhow::Result<(Config, Option<ConfigError>)> {
    let (mut config, ignored) = match &args.config_path {
        Some(path) => {
            let config = Config::from_path(path)
                .with_context(|| format!("loading {}", path.display()))?;
            (config, None)
        }
        None => match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    // Command line arguments override the config file
    if let Some(term) = &args.term_type {
        config.term_type = term.clone();
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if args.widget_echo {
        config.echo_mode = EchoMode::Widget;
    }
    config.validate()?;
    Ok((config, ignored))
}

fn init_logging(config: &Config) {
    let log_path = config_dir()
        .map(|dir| dir.join("mudcon.log"))
        .unwrap_or_else(|| PathBuf::from("mudcon.log"));

    // Open log file (append mode)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let (config, ignored) = load_config(&args)?;
    init_logging(&config);
    info!("mudcon starting...");
    if let Some(e) = ignored {
        // Still on the normal screen, so the user sees this before raw mode
        eprintln!("Warning: ignoring config file: {}", e);
        warn!("Ignoring config file: {}", e);
    }

    let transport = TcpTransport::connect(&args.host, args.port)?;
    info!("Connected to {}:{}", args.host, args.port);

    let fallback = WindowSize::new(config.width, config.height);
    let mut renderer = Renderer::new(config.palette.clone(), config.prompt.clone(), fallback);
    renderer.init()?;

    let mut session = Session::new(&config, renderer);
    session.on_line_submitted(|line| debug!("Submitted {} byte line", line.len()));

    let result = run_main_loop(&mut session, transport);
    session.sink_mut().cleanup()?;

    match result {
        Ok(()) => {
            eprintln!("Connection closed.");
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}

fn run_main_loop(session: &mut Session<Renderer>, mut transport: TcpTransport) -> anyhow::Result<()> {
    let poll_timeout = Duration::from_millis(10);
    session.connected();

    loop {
        // Sample before draining so the final chunks are never skipped
        let running = transport.is_running();
        for chunk in transport.try_recv_all() {
            let replies = session.receive(&chunk);
            flush(&mut transport, &replies);
        }
        if !running {
            info!("Session ended");
            session.disconnected();
            return Ok(());
        }

        // Process input events
        if !event::poll(poll_timeout)? {
            continue;
        }
        match event::read()? {
            Event::Key(key_event) => {
                // Only process key press events
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }
                match KeyMapper::map(&key_event) {
                    Some(KeyAction::Quit) => {
                        info!("Quit requested");
                        session.disconnected();
                        return Ok(());
                    }
                    Some(KeyAction::Input(input)) => {
                        let outbound = session.handle_key(input);
                        flush(&mut transport, &outbound);
                    }
                    None => {}
                }
            }
            Event::Resize(_, _) => {
                let report = session.resize();
                flush(&mut transport, &report);
            }
            _ => {}
        }
    }
}

/// Send queued bytes now; a failed write shows up as a closed connection on the next pass
fn flush(transport: &mut TcpTransport, bytes: &[u8]) {
    if let Err(e) = transport.send(bytes) {
        error!("{}", e);
    }
}
