//! Shared handle to the display sink.
//!
//! The render loop and the audio subsystem's notification thread both draw
//! on the same device, so the sink sits behind a mutex. Each encoded buffer
//! goes out as a single `write` call; a short write or an I/O error is
//! logged and dropped, the next frame simply overwrites it.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{trace, warn};

use crate::encoder::{DisplayEncoder, STATUS_ROW};

pub type DisplaySink = Box<dyn Write + Send>;

struct DisplayInner {
    sink: DisplaySink,
    encoder: DisplayEncoder,
}

#[derive(Clone)]
pub struct Display {
    inner: Arc<Mutex<DisplayInner>>,
    short_writes: Arc<AtomicU64>,
}

impl Display {
    pub fn new(sink: DisplaySink, encoder: DisplayEncoder) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DisplayInner { sink, encoder })),
            short_writes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn bar(&self, channel: usize, position: usize) {
        self.emit(|enc| enc.bar_row(channel, position));
    }

    pub fn numeric(&self, channel: usize, db: f32) {
        self.emit(|enc| enc.numeric_row(channel, db));
    }

    pub fn xruns(&self, count: u64) {
        self.emit(|enc| enc.xrun_row(count));
    }

    pub fn time(&self, elapsed_secs: u64, xrun_count: u64) {
        self.emit(|enc| enc.time_row(elapsed_secs, xrun_count));
    }

    pub fn clear_status(&self) {
        self.emit(|enc| enc.clear_row(STATUS_ROW));
    }

    pub fn clear_channels(&self) {
        self.emit(|enc| enc.clear_channels());
    }

    /// Blank the status row and everything below it.
    pub fn clear_all(&self) {
        self.emit(|enc| enc.clear_from(STATUS_ROW));
    }

    /// Writes that did not go out in full since startup.
    pub fn short_writes(&self) -> u64 {
        self.short_writes.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, DisplayInner> {
        // a panic mid-write leaves nothing half-updated worth protecting
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, encode: impl FnOnce(&DisplayEncoder) -> Vec<u8>) {
        let mut inner = self.lock();
        let buf = encode(&inner.encoder);
        trace!(bytes = buf.len(), "display write");

        match inner.sink.write(&buf) {
            Ok(written) if written == buf.len() => {}
            Ok(written) => {
                self.short_writes.fetch_add(1, Ordering::Relaxed);
                warn!("only wrote {} of {} bytes to display", written, buf.len());
            }
            Err(e) => {
                self.short_writes.fetch_add(1, Ordering::Relaxed);
                warn!("display write failed: {}", e);
            }
        }
        if let Err(e) = inner.sink.flush() {
            warn!("display flush failed: {}", e);
        }
    }
}

/// Shared xrun counter. Notifications come from the audio subsystem's own
/// thread and redraw the xrun row straight away.
#[derive(Clone)]
pub struct XrunMonitor {
    count: Arc<AtomicU64>,
    display: Display,
}

impl XrunMonitor {
    pub fn new(display: Display) -> Self {
        Self {
            count: Arc::new(AtomicU64::new(0)),
            display,
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Count one xrun and redraw the counter.
    pub fn notify(&self) -> u64 {
        let count = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        self.display.xruns(count);
        count
    }

    /// Zero the counter and redraw it.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
        self.display.xruns(0);
    }
}
