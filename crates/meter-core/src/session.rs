//! Display session state machine.
//!
//! State is `(channels shown, display mode, recording)`. Commands move it
//! around and draw or clear whatever the transition requires; the render
//! loop only asks for the clock to be advanced once per tick.

use std::ops::ControlFlow;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::command::Command;
use crate::display::{Display, XrunMonitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Bar,
    Numeric,
}

#[derive(Debug)]
pub struct DisplaySession {
    bound_channels: usize,
    channels_displaying: usize,
    mode: DisplayMode,
    recording: bool,
    start_time: Option<Instant>,
    elapsed_secs: u64,
}

impl DisplaySession {
    pub fn new(bound_channels: usize, channels_displaying: usize, mode: DisplayMode) -> Self {
        Self {
            bound_channels,
            channels_displaying: channels_displaying.min(bound_channels),
            mode,
            recording: false,
            start_time: None,
            elapsed_secs: 0,
        }
    }

    pub fn channels_displaying(&self) -> usize {
        self.channels_displaying
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Apply one command. Breaks when the meter should shut down; the
    /// display has already been cleared by then.
    pub fn apply(
        &mut self,
        command: Command,
        now: Instant,
        display: &Display,
        xruns: &XrunMonitor,
    ) -> ControlFlow<()> {
        info!("command '{}': {:?}", command.as_byte() as char, command);
        match command {
            Command::Show(requested) => {
                let shown = requested.min(self.bound_channels);
                if shown < requested {
                    warn!(
                        "asked to show {} channels but only {} bound",
                        requested, self.bound_channels
                    );
                }
                display.clear_channels();
                self.channels_displaying = shown;
            }
            Command::SetMode(mode) => {
                self.mode = mode;
            }
            Command::StopRecording => {
                self.recording = false;
                display.clear_status();
            }
            Command::StartRecording => {
                self.recording = true;
                display.clear_status();
                self.start_time = Some(now);
                self.elapsed_secs = 0;
                xruns.reset();
                display.time(self.elapsed_secs, xruns.count());
            }
            Command::Exit => {
                if self.recording {
                    display.clear_status();
                }
                display.clear_channels();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Advance the recording clock, redrawing it when the second changes.
    pub fn tick_clock(&mut self, now: Instant, display: &Display, xruns: &XrunMonitor) {
        if !self.recording {
            return;
        }
        let Some(start) = self.start_time else {
            return;
        };
        let elapsed = now.saturating_duration_since(start).as_secs();
        if elapsed > self.elapsed_secs {
            self.elapsed_secs = elapsed;
            display.time(elapsed, xruns.count());
        }
    }
}
