//! Byte buffers for the character display.
//!
//! Every buffer starts with a cursor-position prefix, `ESC [ row ; col H`,
//! followed by the row content. Bar and numeric rows are always padded to
//! the full meter width so a shorter reading overwrites a longer one.

const ESC: u8 = 0x1b;

/// Length of the `ESC [ r ; c H` prefix with single-digit row and column.
pub const PREFIX_WIDTH: usize = 6;

/// Row carrying the xrun counter and the recording clock.
pub const STATUS_ROW: u8 = 2;

/// Row of channel 0; channel `n` is drawn on `CHANNEL_ROW + n`.
pub const CHANNEL_ROW: u8 = 3;

const CLEAR_LINE: &[u8] = b"\x1b[2K";
const CLEAR_TO_END: &[u8] = b"\x1b[0J";

#[derive(Debug, Clone)]
pub struct DisplayEncoder {
    width: usize,
    meter_char: u8,
    peak_char: u8,
}

impl DisplayEncoder {
    /// `meter_char` and `peak_char` must be ASCII; anything else is drawn
    /// as `?`.
    pub fn new(width: usize, meter_char: char, peak_char: char) -> Self {
        Self {
            width,
            meter_char: ascii_or_placeholder(meter_char),
            peak_char: ascii_or_placeholder(peak_char),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Bargraph: `position` meter cells with the peak marker at `position`.
    pub fn bar_row(&self, channel: usize, position: usize) -> Vec<u8> {
        let mut buf = self.row_buffer(channel_row(channel), 0);
        let filled = position.min(self.width);
        let start = buf.len();
        buf.resize(start + self.width, b' ');

        let content = &mut buf[start..];
        content[..filled].fill(self.meter_char);
        if self.width > 0 {
            content[filled.min(self.width - 1)] = self.peak_char;
        }
        buf
    }

    /// Level in dB with one decimal, left-justified.
    pub fn numeric_row(&self, channel: usize, db: f32) -> Vec<u8> {
        let mut buf = self.row_buffer(channel_row(channel), 0);
        self.push_padded(&mut buf, format!("{:.1}", db).as_bytes());
        buf
    }

    /// `X: <count>` at the start of the status row.
    pub fn xrun_row(&self, count: u64) -> Vec<u8> {
        let text = xrun_text(count);
        let mut buf = self.row_buffer(STATUS_ROW, 0);
        buf.extend_from_slice(&text.as_bytes()[..text.len().min(self.width)]);
        buf
    }

    /// `  T:MM:SS` on the status row, to the right of the xrun text.
    pub fn time_row(&self, elapsed_secs: u64, xrun_count: u64) -> Vec<u8> {
        let column = time_column(xrun_count);
        let text = format!("  T:{:02}:{:02}", elapsed_secs / 60, elapsed_secs % 60);
        let room = self.width.saturating_sub(column as usize);
        let mut buf = self.row_buffer(STATUS_ROW, column);
        buf.extend_from_slice(&text.as_bytes()[..text.len().min(room)]);
        buf
    }

    /// Erase one whole row.
    pub fn clear_row(&self, row: u8) -> Vec<u8> {
        let mut buf = self.row_buffer(row, 0);
        buf.extend_from_slice(CLEAR_LINE);
        buf
    }

    /// Erase both channel rows in one write.
    pub fn clear_channels(&self) -> Vec<u8> {
        self.clear_from(CHANNEL_ROW)
    }

    /// Erase everything from `row` to the bottom of the display.
    pub fn clear_from(&self, row: u8) -> Vec<u8> {
        let mut buf = self.row_buffer(row, 0);
        buf.extend_from_slice(CLEAR_TO_END);
        buf
    }

    fn row_buffer(&self, row: u8, column: u8) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PREFIX_WIDTH + self.width);
        buf.extend_from_slice(&[
            ESC,
            b'[',
            digit(row),
            b';',
            digit(column),
            b'H',
        ]);
        buf
    }

    fn push_padded(&self, buf: &mut Vec<u8>, text: &[u8]) {
        let len = text.len().min(self.width);
        buf.extend_from_slice(&text[..len]);
        buf.resize(buf.len() + (self.width - len), b' ');
    }
}

fn channel_row(channel: usize) -> u8 {
    CHANNEL_ROW.saturating_add(channel.min(6) as u8)
}

fn xrun_text(count: u64) -> String {
    format!("X: {}", count)
}

/// Column the clock starts at: right after the xrun text, capped at the
/// last single-digit column.
fn time_column(xrun_count: u64) -> u8 {
    xrun_text(xrun_count).len().min(9) as u8
}

fn digit(value: u8) -> u8 {
    b'0' + value.min(9)
}

fn ascii_or_placeholder(c: char) -> u8 {
    if c.is_ascii() {
        c as u8
    } else {
        b'?'
    }
}
