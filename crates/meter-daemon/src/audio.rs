//! Audio input via cpal.
//!
//! The stream callback runs on the audio host's real-time thread and does
//! nothing but fold each buffer into the shared `PeakCollector`: no locks,
//! no allocation, no I/O. Stream errors arrive on the host's own thread and
//! are reported to the `XrunMonitor`, which redraws the counter directly.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleFormat, StreamConfig};
use meter_core::config::AudioConfig;
use meter_core::{PeakCollector, XrunMonitor, MAX_CHANNELS};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Audio host not available: {0}")]
    NoHost(String),

    #[error("No input device found")]
    NoInputDevice,

    #[error("Input device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Unsupported sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),

    #[error("Failed to build audio stream: {0}")]
    StreamError(String),

    #[error("Failed to start stream: {0}")]
    PlayError(String),
}

/// A running input stream. Dropping it disconnects from the audio host.
pub struct AudioInput {
    _stream: cpal::Stream,
    peaks: Arc<PeakCollector>,
    device_name: String,
}

impl AudioInput {
    pub fn open(config: &AudioConfig, xruns: XrunMonitor) -> Result<Self, CaptureError> {
        let host = select_host(config.host.as_deref())?;
        let device = select_device(&host, config.device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::ConfigError(e.to_string()))?;
        let sample_format = supported.sample_format();
        let device_channels = supported.channels() as usize;
        let stream_config: StreamConfig = supported.into();

        let bound = config.channels.min(device_channels).min(MAX_CHANNELS);
        if bound < config.channels {
            warn!(
                "'{}' has {} input channel(s); binding {} of the {} requested",
                device_name, device_channels, bound, config.channels
            );
        }
        let peaks = Arc::new(PeakCollector::new(bound));

        info!(
            "Audio input '{}' on {}: {} Hz, {} channel(s), {:?}",
            device_name,
            host.id().name(),
            stream_config.sample_rate.0,
            device_channels,
            sample_format
        );

        let stream = match sample_format {
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, Arc::clone(&peaks), xruns)
            }
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, Arc::clone(&peaks), xruns)
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, Arc::clone(&peaks), xruns)
            }
            SampleFormat::I32 => {
                build_stream::<i32>(&device, &stream_config, Arc::clone(&peaks), xruns)
            }
            other => return Err(CaptureError::UnsupportedFormat(other)),
        }
        .map_err(|e| CaptureError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::PlayError(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            peaks,
            device_name,
        })
    }

    pub fn peaks(&self) -> Arc<PeakCollector> {
        Arc::clone(&self.peaks)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

fn select_host(name: Option<&str>) -> Result<Host, CaptureError> {
    let Some(name) = name else {
        return Ok(cpal::default_host());
    };
    let id = cpal::available_hosts()
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| CaptureError::NoHost(name.to_string()))?;
    cpal::host_from_id(id).map_err(|e| CaptureError::NoHost(format!("{}: {}", name, e)))
}

fn select_device(host: &Host, name: Option<&str>) -> Result<Device, CaptureError> {
    match name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::ConfigError(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string())),
        None => host.default_input_device().ok_or(CaptureError::NoInputDevice),
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    peaks: Arc<PeakCollector>,
    xruns: XrunMonitor,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::Sample + cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let frame_len = (config.channels as usize).max(1);
    let bound = peaks.bound_channels();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for channel in 0..bound {
                let samples = data
                    .iter()
                    .skip(channel)
                    .step_by(frame_len)
                    .map(|s| <f32 as cpal::Sample>::from_sample(*s));
                peaks.observe_block(channel, samples);
            }
        },
        move |err| match err {
            cpal::StreamError::DeviceNotAvailable => {
                error!("Audio device no longer available");
            }
            other => {
                warn!("Audio stream error (counted as xrun): {}", other);
                xruns.notify();
            }
        },
        None,
    )
}
