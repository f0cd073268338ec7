//! Metering and rendering engine for a character-display peak meter.
//!
//! The audio side feeds [`peak::PeakCollector`]; [`engine::Meter`] drains it
//! at a fixed rate, runs the IEC scale and peak-hold ballistics, and draws
//! rows on the display through [`display::Display`]. Single-byte commands
//! from a [`command::CommandSource`] drive the [`session::DisplaySession`].

pub mod command;
pub mod config;
pub mod decay;
pub mod display;
pub mod encoder;
pub mod engine;
pub mod peak;
pub mod platform;
pub mod scale;
pub mod session;

/// Channels the meter can bind and show.
pub const MAX_CHANNELS: usize = 2;

pub use command::{ByteCommands, Command, CommandSource, NoCommands};
pub use config::Config;
pub use display::{Display, DisplaySink, XrunMonitor};
pub use encoder::DisplayEncoder;
pub use engine::{Meter, MeterSettings};
pub use peak::PeakCollector;
pub use session::DisplayMode;
