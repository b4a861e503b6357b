//! # Smoothing Filter
//!
//! Exponential interpolation of the mapped sample on the consumer's tick.
//!
//! Each tick moves every channel a fraction `factor` of the way toward the
//! latest sample: `0.0` never moves, `1.0` snaps to the target. The state is
//! owned by the consumer alone and needs no locking.

use super::mapper::{InputSample, Vector2};

/// Linear interpolation between `current` and `target`.
#[inline]
#[must_use]
pub fn lerp(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

/// Smoothed output visible to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmoothedState {
    directional: Vector2,
    roll: f32,
}

impl SmoothedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick toward `target`.
    ///
    /// `factor` is clamped to `0.0..=1.0` so the filter can never overshoot.
    ///
    /// # Examples
    ///
    /// ```
    /// use airmouse_bridge::input::mapper::{InputSample, Vector2};
    /// use airmouse_bridge::input::smoothing::SmoothedState;
    ///
    /// let mut state = SmoothedState::new();
    /// let target = InputSample { directional: Vector2::new(10.0, 0.0), roll: 0.0 };
    /// state.step(&target, 0.5);
    /// assert_eq!(state.directional().x, 5.0);
    /// ```
    pub fn step(&mut self, target: &InputSample, factor: f32) {
        let factor = factor.clamp(0.0, 1.0);
        self.directional.x = lerp(self.directional.x, target.directional.x, factor);
        self.directional.y = lerp(self.directional.y, target.directional.y, factor);
        self.roll = lerp(self.roll, target.roll, factor);
    }

    /// Smoothed directional vector
    #[must_use]
    pub fn directional(&self) -> Vector2 {
        self.directional
    }

    /// Smoothed roll
    #[must_use]
    pub fn roll(&self) -> f32 {
        self.roll
    }
}
