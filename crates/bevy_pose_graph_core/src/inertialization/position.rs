use bevy::{
    math::Vec3,
    reflect::{Reflect, std_traits::ReflectDefault},
};

use crate::decay::QuinticDecay;

/// Offsets at or below this length are considered to be no discontinuity at all.
pub const POSITION_OFFSET_EPSILON: f32 = 1e-5;

/// Decaying translation offset, applied on top of the target position.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq)]
#[reflect(Default)]
pub struct PositionInertializer {
    offset: Vec3,
    decay: QuinticDecay,
}

impl PositionInertializer {
    /// Estimates the offset `prev - target` and its rate of change along its own direction from the
    /// two history positions. The rate is clamped so that the offset can only shrink.
    pub fn create(prev_prev: Vec3, prev: Vec3, target: Vec3, duration: f32, delta: f32) -> Self {
        let x_prev = prev - target;
        let x_prev_prev = prev_prev - target;
        let length = x_prev.length();
        let x_m1 = x_prev_prev.dot(x_prev.normalize_or_zero());
        let velocity = if delta > 0. {
            ((length - x_m1) / delta).min(0.)
        } else {
            0.
        };

        Self {
            offset: x_prev,
            decay: QuinticDecay::new(length, velocity, duration),
        }
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn duration(&self) -> f32 {
        self.decay.duration()
    }

    pub fn is_negligible(&self) -> bool {
        self.offset.length() <= POSITION_OFFSET_EPSILON
    }

    pub fn is_done(&self) -> bool {
        self.decay.is_done()
    }

    /// Advances the decay and returns the remaining offset.
    pub fn advance(&mut self, delta: f32) -> Vec3 {
        self.offset.normalize_or_zero() * self.decay.advance(delta)
    }
}
