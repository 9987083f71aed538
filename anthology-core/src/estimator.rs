//! Active lyric line estimation.
//!
//! Lyrics arrive without timing, so the active line is guessed from elapsed time
//! with a fixed average line duration. This is an approximation: it knows nothing
//! about line length or actual vocal timing.

/// Average seconds per lyric line used when nothing else is configured
pub const DEFAULT_AVERAGE_LINE_DURATION_SECS: f64 = 4.5;

/// Map a playback position to a lyric line index.
///
/// Returns `None` when there are no lines, otherwise
/// `clamp(floor(position / avg_line_duration), 0, line_count - 1)`.
/// NaN or negative positions, and non-positive averages, map to the first line.
#[must_use]
pub fn estimate_line_index(
    position: f64,
    line_count: usize,
    avg_line_duration: f64,
) -> Option<usize> {
    let last = line_count.checked_sub(1)?;

    if position.is_nan() || position <= 0.0 || avg_line_duration.is_nan() || avg_line_duration <= 0.0
    {
        return Some(0);
    }

    let estimated = (position / avg_line_duration).floor();
    if !estimated.is_finite() {
        return Some(last);
    }

    // Saturating float-to-int conversion; estimated is finite and non-negative here.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = estimated as usize;
    Some(index.min(last))
}

/// Strategy for deriving the active line from the playback position.
///
/// Kept behind a trait so a time-coded transcript source can replace the heuristic
/// without touching display or transport code.
pub trait LineIndexEstimator: Send + Sync {
    fn estimate(&self, position: f64, line_count: usize) -> Option<usize>;
}

/// Fixed seconds-per-line heuristic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageLineDuration {
    seconds: f64,
}

impl AverageLineDuration {
    #[must_use]
    pub const fn new(seconds: f64) -> Self {
        Self { seconds }
    }

    #[must_use]
    pub const fn seconds(&self) -> f64 {
        self.seconds
    }
}

impl Default for AverageLineDuration {
    fn default() -> Self {
        Self::new(DEFAULT_AVERAGE_LINE_DURATION_SECS)
    }
}

impl LineIndexEstimator for AverageLineDuration {
    fn estimate(&self, position: f64, line_count: usize) -> Option<usize> {
        estimate_line_index(position, line_count, self.seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_reference_points() {
        assert_eq!(estimate_line_index(0.0, 10, 4.5), Some(0));
        assert_eq!(estimate_line_index(9.0, 10, 4.5), Some(2));
        assert_eq!(estimate_line_index(999.0, 10, 4.5), Some(9));
    }

    #[test]
    fn test_estimate_no_lines() {
        assert_eq!(estimate_line_index(0.0, 0, 4.5), None);
        assert_eq!(estimate_line_index(100.0, 0, 4.5), None);
    }

    #[test]
    fn test_estimate_line_boundaries() {
        assert_eq!(estimate_line_index(4.49, 10, 4.5), Some(0));
        assert_eq!(estimate_line_index(4.5, 10, 4.5), Some(1));
    }

    #[test]
    fn test_estimate_degenerate_inputs() {
        assert_eq!(estimate_line_index(-3.0, 10, 4.5), Some(0));
        assert_eq!(estimate_line_index(f64::NAN, 10, 4.5), Some(0));
        assert_eq!(estimate_line_index(f64::INFINITY, 10, 4.5), Some(9));
        assert_eq!(estimate_line_index(50.0, 10, 0.0), Some(0));
        assert_eq!(estimate_line_index(50.0, 10, f64::NAN), Some(0));
        assert_eq!(estimate_line_index(1e300, 10, 1e-300), Some(9));
    }

    #[test]
    fn test_estimate_monotonic_and_bounded() {
        for line_count in [1usize, 2, 7, 40] {
            let mut previous = 0;
            for step in 0..2000u32 {
                let position = f64::from(step) * 0.25;
                let index = estimate_line_index(position, line_count, 4.5).unwrap();
                assert!(index >= previous, "index went backwards at {position}");
                assert!(index < line_count);
                previous = index;
            }
        }
    }

    #[test]
    fn test_strategy_uses_configured_duration() {
        let estimator = AverageLineDuration::new(2.0);
        assert_eq!(estimator.estimate(5.0, 10), Some(2));
        assert_eq!(AverageLineDuration::default().seconds(), 4.5);
    }
}
