//! Single-character control protocol.
//!
//! Commands arrive one byte at a time on an out-of-band stream (normally a
//! FIFO). The render loop reads at most one byte per tick; an empty stream
//! is the common case and simply means "nothing to do".

use std::io::{ErrorKind, Read};

use tracing::{debug, warn};

use crate::session::DisplayMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show this many channel rows (0 blanks the meter).
    Show(usize),
    StartRecording,
    StopRecording,
    SetMode(DisplayMode),
    Exit,
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'0' => Some(Command::Show(0)),
            b'1' => Some(Command::Show(1)),
            b'2' => Some(Command::Show(2)),
            b'r' => Some(Command::StartRecording),
            b's' => Some(Command::StopRecording),
            b'b' => Some(Command::SetMode(DisplayMode::Bar)),
            b'n' => Some(Command::SetMode(DisplayMode::Numeric)),
            b'x' => Some(Command::Exit),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Command::Show(n) => b'0' + n.min(9) as u8,
            Command::StartRecording => b'r',
            Command::StopRecording => b's',
            Command::SetMode(DisplayMode::Bar) => b'b',
            Command::SetMode(DisplayMode::Numeric) => b'n',
            Command::Exit => b'x',
        }
    }
}

/// A non-blocking source of commands, polled once per render tick.
pub trait CommandSource: Send {
    fn poll(&mut self) -> Option<Command>;
}

/// Never yields a command. Used when no control stream is available.
#[derive(Debug, Default)]
pub struct NoCommands;

impl CommandSource for NoCommands {
    fn poll(&mut self) -> Option<Command> {
        None
    }
}

/// Reads commands from any byte stream. The reader must not block: a
/// `WouldBlock`, end-of-stream or any other error reads as "no command".
#[derive(Debug)]
pub struct ByteCommands<R> {
    reader: R,
}

impl<R: Read> ByteCommands<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read + Send> CommandSource for ByteCommands<R> {
    fn poll(&mut self) -> Option<Command> {
        let mut byte = [0u8; 1];
        match self.reader.read(&mut byte) {
            Ok(1) => decode(byte[0]),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                None
            }
            Err(e) => {
                warn!("command stream read failed: {}", e);
                None
            }
        }
    }
}

/// Decode one byte, logging anything unrecognized.
pub fn decode(byte: u8) -> Option<Command> {
    let command = Command::from_byte(byte);
    if command.is_none() && !byte.is_ascii_whitespace() {
        debug!("ignoring unknown command byte 0x{:02x}", byte);
    }
    command
}
