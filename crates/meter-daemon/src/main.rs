mod audio;
mod control;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use meter_core::config::Config;
use meter_core::{Display, DisplayEncoder, DisplaySink, Meter, MeterSettings, XrunMonitor};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::audio::AudioInput;
use crate::control::ControlStream;

/// Character-display peak meter.
///
/// Values given on the command line override the config file.
#[derive(Debug, Parser)]
#[command(name = "lcd-meter", version)]
struct Args {
    /// Config file (default: ~/.config/lcd-meter/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Meter updates per second
    #[arg(short = 'f', long = "frequency")]
    update_rate_hz: Option<u32>,

    /// Reference signal level (dBFS) for 0 dB on the meter
    #[arg(short = 'r', long = "ref-level", allow_hyphen_values = true)]
    reference_level_db: Option<f32>,

    /// Meter width in characters
    #[arg(short, long)]
    width: Option<usize>,

    /// Display device; `-` writes to stdout
    #[arg(short = 'l', long)]
    lcd: Option<PathBuf>,

    /// Show the level as a number in decibels instead of a bar
    #[arg(short, long)]
    numeric: bool,

    /// Control FIFO for runtime commands
    #[arg(short = 'c', long)]
    fifo: Option<PathBuf>,

    /// Audio host (e.g. alsa, jack)
    #[arg(short = 's', long)]
    host: Option<String>,

    /// Audio input device name
    #[arg(short = 'd', long = "device")]
    input_device: Option<String>,

    /// Number of input channels to bind
    #[arg(long)]
    channels: Option<usize>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(rate) = self.update_rate_hz {
            config.meter.update_rate_hz = rate;
        }
        if let Some(level) = self.reference_level_db {
            config.meter.reference_level_db = level;
        }
        if let Some(width) = self.width {
            config.meter.width = width;
        }
        if self.numeric {
            config.meter.numeric = true;
        }
        if let Some(lcd) = self.lcd {
            config.display.device = lcd;
        }
        if let Some(fifo) = self.fifo {
            config.control.fifo = fifo;
        }
        if self.host.is_some() {
            config.audio.host = self.host;
        }
        if self.input_device.is_some() {
            config.audio.device = self.input_device;
        }
        if let Some(channels) = self.channels {
            config.audio.channels = channels;
        }
    }
}

fn init_logging() -> anyhow::Result<PathBuf> {
    let data_dir = meter_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = meter_core::platform::log_path();

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,meter_daemon=debug,meter_core=debug")
            }),
        )
        .init();

    Ok(log_path)
}

fn open_display(device: &Path) -> anyhow::Result<DisplaySink> {
    if device == Path::new("-") {
        return Ok(Box::new(std::io::stdout()));
    }
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(device)
        .with_context(|| format!("cannot open display {:?}", device))?;
    Ok(Box::new(file))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let log_path = init_logging()?;
    info!("Log file: {:?}", log_path);

    let config_path = args.config.clone().unwrap_or_else(Config::config_path);
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .with_context(|| format!("cannot load config {:?}", config_path))?;
    info!("Config loaded from: {:?}", config_path);
    args.apply(&mut config);
    config.validate()?;

    let meter_config = &config.meter;
    info!(
        "Reference level: {:.1}dB, updates per second: {}",
        meter_config.reference_level_db, meter_config.update_rate_hz
    );

    let sink = open_display(&config.display.device)?;
    info!("Using display {:?}", config.display.device);
    let encoder = DisplayEncoder::new(
        meter_config.width,
        meter_config.meter_char,
        meter_config.peak_char,
    );
    let display = Display::new(sink, encoder);
    let xruns = XrunMonitor::new(display.clone());

    let audio = AudioInput::open(&config.audio, xruns.clone()).context("cannot open audio input")?;
    info!(
        "Metering {} channel(s) from '{}'",
        audio.peaks().bound_channels(),
        audio.device_name()
    );

    let interrupted = Arc::new(AtomicBool::new(false));
    let _signals = control::spawn_signal_watcher(Arc::clone(&interrupted));
    let commands = ControlStream::open(&config.control.fifo, interrupted);

    let meter = Meter::new(
        MeterSettings::from_config(meter_config),
        audio.peaks(),
        display,
        xruns,
        Box::new(commands),
    );
    meter.run().await;

    // disconnect from the audio host only after the display is cleared
    drop(audio);
    info!("lcd-meter stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_overrides_config() {
        let args = Args::parse_from([
            "lcd-meter", "-f", "4", "-r", "-12", "-l", "-", "-n", "-s", "jack", "-d", "system", "-c",
            "/tmp/meter-test.fifo", "--channels", "1",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.meter.update_rate_hz, 4);
        assert_eq!(config.meter.reference_level_db, -12.0);
        assert!(config.meter.numeric);
        assert_eq!(config.display.device, PathBuf::from("-"));
        assert_eq!(config.audio.host.as_deref(), Some("jack"));
        assert_eq!(config.audio.device.as_deref(), Some("system"));
        assert_eq!(config.control.fifo, PathBuf::from("/tmp/meter-test.fifo"));
        assert_eq!(config.audio.channels, 1);
        // untouched values keep their defaults
        assert_eq!(config.meter.width, 20);
        assert_eq!(config.meter.meter_char, '#');
    }

    #[test]
    fn test_no_arguments_change_nothing() {
        let args = Args::parse_from(["lcd-meter"]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.meter.update_rate_hz, 8);
        assert!(!config.meter.numeric);
        assert_eq!(config.display.device, PathBuf::from("/dev/lcd0"));
    }
}
