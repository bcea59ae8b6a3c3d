//! Fixed-timestep accumulator.
//!
//! Real frame time goes in, a whole number of constant simulation steps
//! comes out. Frame time is clamped first so a stalled host cannot force an
//! unbounded catch-up burst.

use serde::{Deserialize, Serialize};

/// Converts variable frame durations into fixed simulation steps.
///
/// # Example
///
/// ```
/// use village_core::clock::FixedStepClock;
///
/// let mut clock = FixedStepClock::new(1.0 / 60.0, 0.1);
/// // A 5 second stall is clamped to 0.1s: a handful of steps, not three hundred.
/// assert!(clock.advance(5.0) <= 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedStepClock {
    step: f64,
    max_frame: f64,
    accumulated: f64,
}

impl FixedStepClock {
    /// Create a clock with the given step and per-frame clamp.
    #[must_use]
    pub const fn new(step: f64, max_frame: f64) -> Self {
        Self {
            step,
            max_frame,
            accumulated: 0.0,
        }
    }

    /// Simulation step in seconds.
    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Time carried over to the next frame.
    #[must_use]
    pub const fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Feed `frame_dt` seconds of real time; returns how many steps to run.
    ///
    /// Negative or NaN frame times count as zero.
    pub fn advance(&mut self, frame_dt: f64) -> u32 {
        let dt = if frame_dt.is_nan() {
            0.0
        } else {
            frame_dt.clamp(0.0, self.max_frame)
        };
        self.accumulated += dt;

        let mut steps = 0;
        while self.accumulated > self.step {
            self.accumulated -= self.step;
            steps += 1;
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_long_frames() {
        let mut clock = FixedStepClock::new(0.01, 0.1);
        let steps = clock.advance(10.0);
        assert!(steps == 9 || steps == 10, "got {steps}");
    }

    #[test]
    fn test_accumulates_short_frames() {
        let mut clock = FixedStepClock::new(0.1, 0.5);
        assert_eq!(clock.advance(0.06), 0);
        assert_eq!(clock.advance(0.06), 1);
        assert!((clock.accumulated() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_ignores_negative() {
        let mut clock = FixedStepClock::new(0.1, 0.5);
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.advance(f64::NAN), 0);
        assert_eq!(clock.accumulated(), 0.0);
    }
}
