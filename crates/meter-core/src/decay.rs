//! Peak-hold ballistics: instant attack, timed release.

/// Hold state for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeakHold {
    /// Deflection currently rendered.
    pub position: usize,
    /// Ticks since `position` was last raised.
    pub age: u32,
}

impl PeakHold {
    /// Feed the latest deflection and return the one to render.
    ///
    /// A louder reading is taken immediately and restarts the hold. Quieter
    /// readings leave the hold in place until more than `timeout_ticks`
    /// have passed, after which the bar follows the current level.
    pub fn update(&mut self, size: usize, timeout_ticks: u32) -> usize {
        if size > self.position {
            self.position = size;
            self.age = 0;
        } else {
            self.age = self.age.saturating_add(1);
            if self.age > timeout_ticks {
                self.position = size;
            }
        }
        self.position
    }
}

/// Hold state for every channel the meter can show.
#[derive(Debug, Clone)]
pub struct DecayTracker {
    holds: Vec<PeakHold>,
}

impl DecayTracker {
    pub fn new(channels: usize) -> Self {
        Self {
            holds: vec![PeakHold::default(); channels],
        }
    }

    /// Returns the deflection to render for `channel`. Unknown channels
    /// render the raw size without any hold.
    pub fn update(&mut self, channel: usize, size: usize, timeout_ticks: u32) -> usize {
        match self.holds.get_mut(channel) {
            Some(hold) => hold.update(size, timeout_ticks),
            None => size,
        }
    }

    pub fn position(&self, channel: usize) -> usize {
        self.holds.get(channel).map_or(0, |h| h.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_louder_reading_is_taken_immediately() {
        let mut hold = PeakHold::default();
        assert_eq!(hold.update(5, 3), 5);
        assert_eq!(hold.update(12, 3), 12);
        assert_eq!(hold.age, 0);
    }

    #[test]
    fn test_holds_for_timeout_then_releases() {
        let timeout = 13;
        let mut hold = PeakHold::default();
        hold.update(20, timeout);

        for call in 1..=timeout {
            assert_eq!(hold.update(4, timeout), 20, "released early on call {call}");
        }
        assert_eq!(hold.update(4, timeout), 4);
        // once released the bar tracks the level
        assert_eq!(hold.update(2, timeout), 2);
        assert_eq!(hold.update(3, timeout), 3);
    }

    #[test]
    fn test_equal_reading_counts_toward_release() {
        let mut hold = PeakHold::default();
        hold.update(8, 1);
        assert_eq!(hold.update(8, 1), 8);
        assert_eq!(hold.age, 1);
        assert_eq!(hold.update(0, 1), 0);
    }

    #[test]
    fn test_new_peak_restarts_hold() {
        let mut hold = PeakHold::default();
        hold.update(10, 2);
        hold.update(0, 2);
        hold.update(0, 2);
        assert_eq!(hold.update(11, 2), 11);
        assert_eq!(hold.update(0, 2), 11);
        assert_eq!(hold.update(0, 2), 11);
        assert_eq!(hold.update(0, 2), 0);
    }

    #[test]
    fn test_tracker_keeps_channels_apart() {
        let mut tracker = DecayTracker::new(2);
        assert_eq!(tracker.update(0, 9, 5), 9);
        assert_eq!(tracker.update(1, 3, 5), 3);
        assert_eq!(tracker.update(0, 0, 5), 9);
        assert_eq!(tracker.position(0), 9);
        assert_eq!(tracker.position(1), 3);
        assert_eq!(tracker.update(4, 6, 5), 6);
        assert_eq!(tracker.position(4), 0);
    }
}
