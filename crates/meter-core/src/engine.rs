//! The fixed-rate render loop.
//!
//! Owns everything the render side touches: the session state machine, the
//! per-channel hold state and the command source. The audio callback only
//! shares the `PeakCollector`; xrun notifications share the `XrunMonitor`.
//!
//! Each tick: poll one command, drain every bound channel and draw the
//! visible ones, then advance the recording clock.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::command::CommandSource;
use crate::config::MeterConfig;
use crate::decay::DecayTracker;
use crate::display::{Display, XrunMonitor};
use crate::peak::PeakCollector;
use crate::scale::{iec_scale, peak_to_db};
use crate::session::{DisplayMode, DisplaySession};
use crate::MAX_CHANNELS;

/// Startup parameters fixed for the lifetime of the loop.
#[derive(Debug, Clone)]
pub struct MeterSettings {
    pub update_rate_hz: u32,
    pub bias: f32,
    pub width: usize,
    pub decay_timeout_ticks: u32,
    pub mode: DisplayMode,
    /// Channel rows shown at startup; `None` shows every bound channel.
    pub show_channels: Option<usize>,
}

impl MeterSettings {
    pub fn from_config(config: &MeterConfig) -> Self {
        Self {
            update_rate_hz: config.update_rate_hz.max(1),
            bias: config.bias(),
            width: config.width,
            decay_timeout_ticks: config.decay_timeout_ticks(),
            mode: if config.numeric {
                DisplayMode::Numeric
            } else {
                DisplayMode::Bar
            },
            show_channels: config.show_channels,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.update_rate_hz.max(1)
    }
}

/// Last reading taken for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReading {
    pub last_peak: f32,
    pub decibels: f32,
}

impl Default for ChannelReading {
    fn default() -> Self {
        Self {
            last_peak: 0.0,
            decibels: f32::NEG_INFINITY,
        }
    }
}

pub struct Meter {
    settings: MeterSettings,
    peaks: Arc<PeakCollector>,
    holds: DecayTracker,
    readings: [ChannelReading; MAX_CHANNELS],
    session: DisplaySession,
    display: Display,
    xruns: XrunMonitor,
    commands: Box<dyn CommandSource>,
}

impl Meter {
    pub fn new(
        settings: MeterSettings,
        peaks: Arc<PeakCollector>,
        display: Display,
        xruns: XrunMonitor,
        commands: Box<dyn CommandSource>,
    ) -> Self {
        let bound = peaks.bound_channels();
        let shown = settings.show_channels.unwrap_or(bound);
        let session = DisplaySession::new(bound, shown, settings.mode);
        Self {
            holds: DecayTracker::new(MAX_CHANNELS),
            readings: [ChannelReading::default(); MAX_CHANNELS],
            settings,
            peaks,
            session,
            display,
            xruns,
            commands,
        }
    }

    pub fn session(&self) -> &DisplaySession {
        &self.session
    }

    pub fn settings(&self) -> &MeterSettings {
        &self.settings
    }

    pub fn reading(&self, channel: usize) -> ChannelReading {
        self.readings.get(channel).copied().unwrap_or_default()
    }

    pub fn hold_position(&self, channel: usize) -> usize {
        self.holds.position(channel)
    }

    pub fn xruns(&self) -> &XrunMonitor {
        &self.xruns
    }

    /// Blank whatever a previous run left on the status and channel rows,
    /// then draw the xrun counter.
    pub fn start(&mut self) {
        self.display.clear_all();
        self.display.xruns(self.xruns.count());
    }

    /// One render tick at time `now`. Breaks once an exit command has been
    /// handled.
    pub fn tick(&mut self, now: Instant) -> ControlFlow<()> {
        if let Some(command) = self.commands.poll() {
            self.session
                .apply(command, now, &self.display, &self.xruns)?;
        }

        // every bound channel is drained; only the shown ones are drawn
        for channel in 0..self.peaks.bound_channels() {
            let position = self.measure_channel(channel);
            if channel < self.session.channels_displaying() {
                self.draw_channel(channel, position);
            }
        }

        self.session.tick_clock(now, &self.display, &self.xruns);
        ControlFlow::Continue(())
    }

    /// Drain one channel and advance its hold. Returns the held position.
    fn measure_channel(&mut self, channel: usize) -> usize {
        let last_peak = self.peaks.drain(channel);
        let decibels = peak_to_db(last_peak, self.settings.bias);
        if let Some(reading) = self.readings.get_mut(channel) {
            *reading = ChannelReading {
                last_peak,
                decibels,
            };
        }

        let size = iec_scale(decibels, self.settings.width);
        let position = self
            .holds
            .update(channel, size, self.settings.decay_timeout_ticks);
        trace!(channel, decibels, size, position, "meter");
        position
    }

    fn draw_channel(&self, channel: usize, position: usize) {
        match self.session.mode() {
            DisplayMode::Bar => self.display.bar(channel, position),
            DisplayMode::Numeric => self.display.numeric(channel, self.reading(channel).decibels),
        }
    }

    /// Run ticks at the configured rate until an exit command arrives.
    pub async fn run(mut self) {
        let period = self.settings.period();
        info!(
            "meter running: {} Hz, {} channel(s) bound, hold {} ticks",
            self.settings.update_rate_hz,
            self.peaks.bound_channels(),
            self.settings.decay_timeout_ticks
        );

        self.start();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let now = ticker.tick().await.into_std();
            if self.tick(now).is_break() {
                break;
            }
        }

        debug!("meter stopped after {} short display writes", self.display.short_writes());
        info!("meter: exit");
    }
}
