//! Command input for the render loop: the control FIFO plus process signals.
//!
//! The FIFO is opened non-blocking and read one byte per tick. A signal
//! (Ctrl-C, SIGTERM) sets a flag that reads as an `exit` command, so the
//! display is cleared the same way either way.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use meter_core::command::{self, Command, CommandSource};
use tracing::{info, warn};

pub struct ControlStream {
    #[cfg(unix)]
    fifo: Option<tokio::net::unix::pipe::Receiver>,
    interrupted: Arc<AtomicBool>,
}

impl ControlStream {
    /// Open the FIFO at `path`. A missing or unreadable FIFO is logged and
    /// the meter runs with signal-only control. Must be called from within
    /// the tokio runtime.
    pub fn open(path: &Path, interrupted: Arc<AtomicBool>) -> Self {
        #[cfg(not(unix))]
        open_fifo(path);
        Self {
            #[cfg(unix)]
            fifo: open_fifo(path),
            interrupted,
        }
    }
}

#[cfg(unix)]
fn open_fifo(path: &Path) -> Option<tokio::net::unix::pipe::Receiver> {
    let mut options = tokio::net::unix::pipe::OpenOptions::new();
    // read-write so the FIFO never reports EOF between writers
    #[cfg(target_os = "linux")]
    options.read_write(true);

    match options.open_receiver(path) {
        Ok(receiver) => {
            info!("Listening for commands on {:?}", path);
            Some(receiver)
        }
        Err(e) => {
            warn!(
                "Cannot open command FIFO {:?} ({}); create it with mkfifo to control the meter",
                path, e
            );
            None
        }
    }
}

#[cfg(not(unix))]
fn open_fifo(path: &Path) {
    warn!("Command FIFO {:?} is only supported on unix", path);
}

impl ControlStream {
    #[cfg(unix)]
    fn read_fifo(&self) -> Option<Command> {
        let fifo = self.fifo.as_ref()?;
        let mut byte = [0u8; 1];
        match fifo.try_read(&mut byte) {
            Ok(1) => command::decode(byte[0]),
            Ok(_) => None,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => None,
            Err(e) => {
                warn!("Command FIFO read failed: {}", e);
                None
            }
        }
    }

    #[cfg(not(unix))]
    fn read_fifo(&self) -> Option<Command> {
        None
    }
}

impl CommandSource for ControlStream {
    fn poll(&mut self) -> Option<Command> {
        if self.interrupted.load(Ordering::Acquire) {
            return Some(Command::Exit);
        }
        self.read_fifo()
    }
}

/// Set `interrupted` when the process is asked to stop.
pub fn spawn_signal_watcher(interrupted: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received");
        interrupted.store(true, Ordering::Release);
    })
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("Cannot watch SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_fifo_still_honours_interrupt() {
        let interrupted = Arc::new(AtomicBool::new(false));
        let path = std::env::temp_dir().join("lcd-meter-no-such-fifo");
        let mut control = ControlStream::open(&path, Arc::clone(&interrupted));

        assert_eq!(control.poll(), None);
        interrupted.store(true, Ordering::Release);
        assert_eq!(control.poll(), Some(Command::Exit));
    }

    #[tokio::test]
    async fn test_regular_file_is_not_a_fifo() {
        let path = std::env::temp_dir().join(format!("lcd-meter-plain-{}", std::process::id()));
        std::fs::write(&path, b"x").unwrap();

        let mut control = ControlStream::open(&path, Arc::new(AtomicBool::new(false)));
        assert_eq!(control.poll(), None);

        let _ = std::fs::remove_file(&path);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_reads_one_command_per_poll_from_fifo() {
        use std::io::Write;

        let path = std::env::temp_dir().join(format!("lcd-meter-fifo-{}", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let made = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !made {
            eprintln!("mkfifo unavailable, skipping");
            return;
        }

        let mut control = ControlStream::open(&path, Arc::new(AtomicBool::new(false)));
        assert_eq!(control.poll(), None);

        let mut writer = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        writer.write_all(b"2r\n").unwrap();
        // let the reactor see the pipe become readable
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(control.poll(), Some(Command::Show(2)));
        assert_eq!(control.poll(), Some(Command::StartRecording));
        assert_eq!(control.poll(), None);
        assert_eq!(control.poll(), None);

        let _ = std::fs::remove_file(&path);
    }
}
