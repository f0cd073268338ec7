//! Per-channel running peak shared between the audio callback and the
//! render loop.
//!
//! Each slot is an `AtomicU32` holding the bits of a non-negative `f32`.
//! For non-negative floats the IEEE-754 bit pattern orders the same way as
//! the value, so `fetch_max` on the bits is a lock-free "max" on the level.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::MAX_CHANNELS;

#[derive(Debug)]
pub struct PeakCollector {
    slots: Vec<AtomicU32>,
}

impl PeakCollector {
    /// Create a collector with `bound` channels connected to an input.
    /// Slots past `bound` behave as permanently silent channels.
    pub fn new(bound: usize) -> Self {
        let bound = bound.min(MAX_CHANNELS);
        Self {
            slots: (0..bound).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn bound_channels(&self) -> usize {
        self.slots.len()
    }

    /// Fold one sample into the running peak. Safe to call from the
    /// real-time thread: never blocks, never allocates.
    #[inline]
    pub fn observe(&self, channel: usize, sample: f32) {
        let level = sample.abs();
        if level.is_nan() {
            return;
        }
        if let Some(slot) = self.slots.get(channel) {
            slot.fetch_max(level.to_bits(), Ordering::Relaxed);
        }
    }

    /// Fold a whole buffer with a single atomic update.
    pub fn observe_block<I>(&self, channel: usize, samples: I)
    where
        I: IntoIterator<Item = f32>,
    {
        let Some(slot) = self.slots.get(channel) else {
            return;
        };
        let level = samples
            .into_iter()
            .map(f32::abs)
            .filter(|s| !s.is_nan())
            .fold(0.0f32, f32::max);
        if level > 0.0 {
            slot.fetch_max(level.to_bits(), Ordering::Relaxed);
        }
    }

    /// Read the peak seen since the last drain and reset it to zero.
    pub fn drain(&self, channel: usize) -> f32 {
        match self.slots.get(channel) {
            Some(slot) => f32::from_bits(slot.swap(0, Ordering::AcqRel)),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_drain_returns_max_magnitude_and_resets() {
        let peaks = PeakCollector::new(2);
        peaks.observe(0, 0.25);
        peaks.observe(0, -0.75);
        peaks.observe(0, 0.5);
        assert_eq!(peaks.drain(0), 0.75);
        assert_eq!(peaks.drain(0), 0.0);
        assert_eq!(peaks.drain(1), 0.0);
    }

    #[test]
    fn test_channels_are_independent() {
        let peaks = PeakCollector::new(2);
        peaks.observe(0, 0.1);
        peaks.observe(1, -0.9);
        assert_eq!(peaks.drain(1), 0.9);
        assert_eq!(peaks.drain(0), 0.1);
    }

    #[test]
    fn test_unbound_channels_read_silent() {
        let peaks = PeakCollector::new(1);
        assert_eq!(peaks.bound_channels(), 1);
        peaks.observe(1, 1.0);
        peaks.observe_block(1, [1.0, -1.0]);
        assert_eq!(peaks.drain(1), 0.0);
        assert_eq!(peaks.drain(7), 0.0);

        let none = PeakCollector::new(0);
        none.observe(0, 1.0);
        assert_eq!(none.drain(0), 0.0);
    }

    #[test]
    fn test_bound_is_capped() {
        assert_eq!(PeakCollector::new(8).bound_channels(), MAX_CHANNELS);
    }

    #[test]
    fn test_nan_samples_are_ignored() {
        let peaks = PeakCollector::new(1);
        peaks.observe(0, f32::NAN);
        peaks.observe_block(0, [0.3, f32::NAN, -0.4]);
        assert_eq!(peaks.drain(0), 0.4);
    }

    #[test]
    fn test_block_folds_into_existing_peak() {
        let peaks = PeakCollector::new(1);
        peaks.observe(0, 0.6);
        peaks.observe_block(0, [0.1, -0.2]);
        assert_eq!(peaks.drain(0), 0.6);
    }

    #[test]
    fn test_peak_is_visible_across_threads() {
        let peaks = Arc::new(PeakCollector::new(2));
        let writer = Arc::clone(&peaks);
        std::thread::spawn(move || {
            for i in 0..1000 {
                writer.observe(1, i as f32 / 1000.0);
            }
        })
        .join()
        .unwrap();
        assert_eq!(peaks.drain(1), 0.999);
        assert_eq!(peaks.drain(1), 0.0);
    }
}
