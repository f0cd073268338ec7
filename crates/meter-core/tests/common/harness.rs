use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use meter_core::{
    Command, CommandSource, Display, DisplayEncoder, DisplayMode, Meter, MeterSettings,
    PeakCollector, XrunMonitor,
};

pub const WIDTH: usize = 20;

/// Display sink that keeps every write as a separate buffer.
#[derive(Clone, Default)]
pub struct RecordingSink(Arc<Mutex<Vec<Vec<u8>>>>);

impl RecordingSink {
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Command source the test feeds between ticks. Each entry is consumed by
/// one poll; `None` entries model an idle tick.
#[derive(Clone, Default)]
pub struct ScriptedCommands(Arc<Mutex<VecDeque<Option<Command>>>>);

impl ScriptedCommands {
    pub fn push(&self, command: Command) {
        self.0.lock().unwrap().push_back(Some(command));
    }

    pub fn idle(&self, ticks: usize) {
        let mut queue = self.0.lock().unwrap();
        for _ in 0..ticks {
            queue.push_back(None);
        }
    }
}

impl CommandSource for ScriptedCommands {
    fn poll(&mut self) -> Option<Command> {
        self.0.lock().unwrap().pop_front().flatten()
    }
}

pub struct Rig {
    pub meter: Meter,
    pub peaks: Arc<PeakCollector>,
    pub sink: RecordingSink,
    pub commands: ScriptedCommands,
}

pub fn settings(rate: u32, show: Option<usize>) -> MeterSettings {
    MeterSettings {
        update_rate_hz: rate,
        bias: 1.0,
        width: WIDTH,
        decay_timeout_ticks: (1.6f32 * rate as f32).round() as u32,
        mode: DisplayMode::Bar,
        show_channels: show,
    }
}

pub fn rig(settings: MeterSettings, bound: usize) -> Rig {
    let sink = RecordingSink::default();
    let display = Display::new(
        Box::new(sink.clone()),
        DisplayEncoder::new(WIDTH, '#', 'I'),
    );
    let xruns = XrunMonitor::new(display.clone());
    let peaks = Arc::new(PeakCollector::new(bound));
    let commands = ScriptedCommands::default();
    let meter = Meter::new(
        settings,
        Arc::clone(&peaks),
        display,
        xruns,
        Box::new(commands.clone()),
    );
    Rig {
        meter,
        peaks,
        sink,
        commands,
    }
}

pub fn bar(row: u8, filled: usize) -> Vec<u8> {
    let mut buf = format!("\x1b[{};0H", row).into_bytes();
    let mut content = vec![b' '; WIDTH];
    content[..filled.min(WIDTH)].fill(b'#');
    content[filled.min(WIDTH - 1)] = b'I';
    buf.extend_from_slice(&content);
    buf
}

pub const CLEAR_CHANNELS: &[u8] = b"\x1b[3;0H\x1b[0J";
pub const CLEAR_STATUS: &[u8] = b"\x1b[2;0H\x1b[2K";
