//! Telnet option negotiation
//!
//! Splits the raw byte stream from the server into plain application data and
//! protocol commands, answering the commands it understands. Only ECHO,
//! TERM-TYPE and NAWS are negotiated; every other option is refused.
//!
//! The parser is resumable: a command split across two transport reads is
//! completed when the rest arrives.

use tracing::{debug, info, warn};

/// Interpret As Command
pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
/// Subnegotiation begin
pub const SB: u8 = 250;
/// Subnegotiation end
pub const SE: u8 = 240;
/// Data Mark (Synch)
pub const DATA_MARK: u8 = 242;

/// Option codes this client negotiates
pub mod opt {
    pub const ECHO: u8 = 1;
    pub const TTYPE: u8 = 24;
    pub const NAWS: u8 = 31;
}

/// TERM-TYPE subnegotiation verbs
const TTYPE_IS: u8 = 0;
const TTYPE_SEND: u8 = 1;

/// Subnegotiation payloads are only ever a few bytes; anything longer is junk
const MAX_SUBNEG_LEN: usize = 512;

/// Window dimensions reported through NAWS
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u16,
    pub height: u16,
}

impl WindowSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Negotiated state of one option
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptionState {
    /// We perform the option (our WILL was accepted)
    pub local: bool,
    /// The server performs the option
    pub remote: bool,
}

/// Result of processing one inbound chunk
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Inbound {
    /// Application bytes with all protocol commands removed
    pub data: Vec<u8>,
    /// Replies to send back, in the order they were generated
    pub replies: Vec<u8>,
    /// New local echo setting if negotiation changed it during this chunk
    pub local_echo: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ParserState {
    #[default]
    Data,
    Iac,
    /// WILL/WONT/DO/DONT seen, waiting for the option byte
    Command(u8),
    /// IAC SB seen, waiting for the option byte
    SbOption,
    SbData,
    /// IAC seen inside a subnegotiation payload
    SbIac,
    /// Data Mark seen; this many following bytes are still to be dropped
    DataMark(u8),
}

/// Telnet negotiator: one per connection.
pub struct Negotiator {
    state: ParserState,
    term_type: String,
    window: WindowSize,
    local_echo: bool,
    echo: OptionState,
    ttype: OptionState,
    naws: OptionState,
    sb_option: u8,
    sb_buf: Vec<u8>,
}

impl Negotiator {
    pub fn new(term_type: impl Into<String>, window: WindowSize, local_echo: bool) -> Self {
        Self {
            state: ParserState::Data,
            term_type: term_type.into(),
            window,
            local_echo,
            echo: OptionState::default(),
            ttype: OptionState::default(),
            naws: OptionState::default(),
            sb_option: 0,
            sb_buf: Vec::new(),
        }
    }

    /// Process one chunk of raw bytes from the transport.
    pub fn process_inbound(&mut self, bytes: &[u8]) -> Inbound {
        let echo_before = self.local_echo;
        let mut inbound = Inbound::default();
        for &byte in bytes {
            self.feed(byte, &mut inbound);
        }
        if self.local_echo != echo_before {
            inbound.local_echo = Some(self.local_echo);
        }
        inbound
    }

    fn feed(&mut self, byte: u8, inbound: &mut Inbound) {
        match self.state {
            ParserState::Data => match byte {
                IAC => self.state = ParserState::Iac,
                DATA_MARK => self.state = ParserState::DataMark(2),
                _ => inbound.data.push(byte),
            },
            ParserState::Iac => match byte {
                // Escaped literal 0xFF
                IAC => {
                    inbound.data.push(IAC);
                    self.state = ParserState::Data;
                }
                WILL | WONT | DO | DONT => self.state = ParserState::Command(byte),
                SB => self.state = ParserState::SbOption,
                _ => {
                    info!("Got Cmd {}, ignoring", byte);
                    self.state = ParserState::Data;
                }
            },
            ParserState::Command(command) => {
                self.state = ParserState::Data;
                self.negotiate(command, byte, &mut inbound.replies);
            }
            ParserState::SbOption => {
                self.sb_option = byte;
                self.sb_buf.clear();
                self.state = ParserState::SbData;
            }
            ParserState::SbData => {
                if byte == IAC {
                    self.state = ParserState::SbIac;
                } else {
                    self.push_subneg(byte);
                }
            }
            ParserState::SbIac => match byte {
                SE => {
                    self.state = ParserState::Data;
                    self.subnegotiate(&mut inbound.replies);
                }
                IAC => {
                    self.push_subneg(IAC);
                    self.state = ParserState::SbData;
                }
                _ => {
                    warn!(
                        "Unexpected byte {} after IAC in subnegotiation of option {}",
                        byte, self.sb_option
                    );
                    self.state = ParserState::SbData;
                }
            },
            ParserState::DataMark(remaining) => {
                self.state = if remaining > 1 {
                    ParserState::DataMark(remaining - 1)
                } else {
                    info!("Ignoring Data Mark (Synch)");
                    ParserState::Data
                };
            }
        }
    }

    fn push_subneg(&mut self, byte: u8) {
        if self.sb_buf.len() < MAX_SUBNEG_LEN {
            self.sb_buf.push(byte);
        }
    }

    fn negotiate(&mut self, command: u8, option: u8, replies: &mut Vec<u8>) {
        match command {
            DO => {
                info!("Got Cmd DO '{}'", option);
                match option {
                    opt::ECHO => {
                        self.local_echo = true;
                        self.echo.local = true;
                        reply(replies, WILL, option);
                    }
                    opt::TTYPE => {
                        self.ttype.local = true;
                        reply(replies, WILL, option);
                    }
                    opt::NAWS => {
                        self.naws.local = true;
                        reply(replies, WILL, option);
                        replies.extend_from_slice(&encode_naws(self.window));
                    }
                    _ => {
                        info!("Send WONT '{}'", option);
                        reply(replies, WONT, option);
                    }
                }
            }
            DONT => {
                info!("Got Cmd DONT '{}'", option);
                match option {
                    opt::ECHO => {
                        self.local_echo = false;
                        self.echo.local = false;
                    }
                    opt::TTYPE => self.ttype.local = false,
                    opt::NAWS => self.naws.local = false,
                    _ => {}
                }
            }
            WILL => {
                info!("Got Cmd WILL '{}'", option);
                if option == opt::ECHO {
                    // Server echoes, so we stop
                    self.local_echo = false;
                    self.echo.remote = true;
                    reply(replies, DO, option);
                } else {
                    info!("Send DONT '{}'", option);
                    reply(replies, DONT, option);
                }
            }
            WONT => {
                info!("Got Cmd WONT '{}'", option);
                if option == opt::ECHO {
                    self.local_echo = true;
                    self.echo.remote = false;
                    reply(replies, DONT, option);
                }
            }
            _ => debug!("Unexpected negotiation command {}", command),
        }
    }

    fn subnegotiate(&mut self, replies: &mut Vec<u8>) {
        let payload = std::mem::take(&mut self.sb_buf);
        match self.sb_option {
            opt::TTYPE if payload == [TTYPE_SEND] => {
                info!("Send IAC SB TERM-TYPE IS '{}' IAC SE", self.term_type);
                replies.extend_from_slice(&[IAC, SB, opt::TTYPE, TTYPE_IS]);
                replies.extend(self.term_type.bytes().filter(|&b| b != IAC));
                replies.extend_from_slice(&[IAC, SE]);
            }
            option => {
                warn!(
                    "Discarding subnegotiation for option {} ({} bytes)",
                    option,
                    payload.len()
                );
            }
        }
    }

    /// Record new window dimensions; returns a NAWS report if NAWS is active.
    pub fn resize(&mut self, window: WindowSize) -> Option<Vec<u8>> {
        self.window = window;
        if self.naws.local {
            debug!("Reporting window size {}x{}", window.width, window.height);
            Some(encode_naws(window))
        } else {
            None
        }
    }

    /// Encode application text for the wire: Latin-1 octets with IAC doubled.
    pub fn encode_outbound(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let byte = u8::try_from(u32::from(ch)).unwrap_or(b'?');
            out.push(byte);
            if byte == IAC {
                out.push(IAC);
            }
        }
        out
    }

    pub fn local_echo(&self) -> bool {
        self.local_echo
    }

    pub fn naws_enabled(&self) -> bool {
        self.naws.local
    }

    pub fn window(&self) -> WindowSize {
        self.window
    }

    pub fn term_type(&self) -> &str {
        &self.term_type
    }

    /// Negotiated state of a handled option; `None` for options we always refuse
    pub fn option_state(&self, option: u8) -> Option<OptionState> {
        match option {
            opt::ECHO => Some(self.echo),
            opt::TTYPE => Some(self.ttype),
            opt::NAWS => Some(self.naws),
            _ => None,
        }
    }

    /// Forget all negotiated state, including a half-read command
    pub fn reset(&mut self, local_echo: bool) {
        self.state = ParserState::Data;
        self.local_echo = local_echo;
        self.echo = OptionState::default();
        self.ttype = OptionState::default();
        self.naws = OptionState::default();
        self.sb_option = 0;
        self.sb_buf.clear();
    }
}

fn reply(replies: &mut Vec<u8>, command: u8, option: u8) {
    replies.extend_from_slice(&[IAC, command, option]);
}

/// Build `IAC SB NAWS <w_hi> <w_lo> <h_hi> <h_lo> IAC SE`, doubling any 255 octet.
pub fn encode_naws(window: WindowSize) -> Vec<u8> {
    let mut out = vec![IAC, SB, opt::NAWS];
    let [w_hi, w_lo] = window.width.to_be_bytes();
    let [h_hi, h_lo] = window.height.to_be_bytes();
    for byte in [w_hi, w_lo, h_hi, h_lo] {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out.extend_from_slice(&[IAC, SE]);
    out
}

/// Parse a NAWS subnegotiation produced by [`encode_naws`].
pub fn decode_naws(bytes: &[u8]) -> Option<WindowSize> {
    let body = bytes
        .strip_prefix(&[IAC, SB, opt::NAWS])?
        .strip_suffix(&[IAC, SE])?;

    let mut octets = Vec::with_capacity(4);
    let mut iter = body.iter().copied();
    while let Some(byte) = iter.next() {
        if byte == IAC && iter.next()? != IAC {
            return None;
        }
        octets.push(byte);
    }

    match octets[..] {
        [w_hi, w_lo, h_hi, h_lo] => Some(WindowSize::new(
            u16::from_be_bytes([w_hi, w_lo]),
            u16::from_be_bytes([h_hi, h_lo]),
        )),
        _ => None,
    }
}
