//! IEC 60268-10 style meter deflection.

/// Convert a level in dB into a deflection of `0..=width` cells.
///
/// Seven linear segments approximate the standard peak programme meter
/// response: the low end is compressed, the top 20 dB take half the scale.
/// Anything below -70 dB (including `-inf` silence and NaN) reads as zero.
pub fn iec_scale(db: f32, width: usize) -> usize {
    let deflection = if db.is_nan() || db < -70.0 {
        0.0
    } else if db < -60.0 {
        (db + 70.0) * 0.25
    } else if db < -50.0 {
        (db + 60.0) * 0.5 + 2.5
    } else if db < -40.0 {
        (db + 50.0) * 0.75 + 7.5
    } else if db < -30.0 {
        (db + 40.0) * 1.5 + 15.0
    } else if db < -20.0 {
        (db + 30.0) * 2.0 + 30.0
    } else if db < 0.0 {
        (db + 20.0) * 2.5 + 50.0
    } else {
        100.0
    };

    let size = ((deflection / 100.0) * width as f32).floor() as usize;
    size.min(width)
}

/// Level of a linear peak in dB after applying the reference-level bias.
pub fn peak_to_db(peak: f32, bias: f32) -> f32 {
    20.0 * (peak * bias).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_reads_zero() {
        assert_eq!(iec_scale(f32::NEG_INFINITY, 20), 0);
        assert_eq!(iec_scale(f32::NAN, 20), 0);
        assert_eq!(iec_scale(-90.0, 20), 0);
    }

    #[test]
    fn test_full_scale_at_and_above_zero_db() {
        for width in [1, 8, 16, 20, 40] {
            assert_eq!(iec_scale(0.0, width), width);
            assert_eq!(iec_scale(12.0, width), width);
            assert_eq!(iec_scale(f32::INFINITY, width), width);
        }
    }

    #[test]
    fn test_segment_boundaries() {
        // percentages at each knee: 0, 2.5, 7.5, 15, 30, 50
        assert_eq!(iec_scale(-70.0, 100), 0);
        assert_eq!(iec_scale(-60.0, 100), 2);
        assert_eq!(iec_scale(-50.0, 100), 7);
        assert_eq!(iec_scale(-40.0, 100), 15);
        assert_eq!(iec_scale(-30.0, 100), 30);
        assert_eq!(iec_scale(-20.0, 100), 50);
        assert_eq!(iec_scale(-10.0, 100), 75);
        assert_eq!(iec_scale(-20.0, 20), 10);
    }

    #[test]
    fn test_monotone_and_bounded() {
        for width in [0, 1, 7, 20, 33] {
            let mut previous = 0;
            let mut db = -80.0f32;
            while db <= 5.0 {
                let size = iec_scale(db, width);
                assert!(size >= previous, "scale dropped at {db} dB (width {width})");
                assert!(size <= width);
                previous = size;
                db += 0.25;
            }
        }
    }

    #[test]
    fn test_peak_to_db_applies_bias() {
        assert_eq!(peak_to_db(1.0, 1.0), 0.0);
        assert_eq!(peak_to_db(0.0, 1.0), f32::NEG_INFINITY);
        assert!((peak_to_db(0.1, 1.0) + 20.0).abs() < 1e-4);
        assert!((peak_to_db(0.1, 10.0)).abs() < 1e-4);
    }
}
