use bevy::{
    math::{Quat, Vec3},
    reflect::{Reflect, std_traits::ReflectDefault},
};
use std::f32::consts::{PI, TAU};

use crate::decay::QuinticDecay;

/// Default threshold below which two rotations are considered equal.
pub const DEFAULT_MIN_ROTATION_DEGREES: f32 = 0.05;

/// Decomposes a rotation into an angle in `[0, 2π]` and a unit axis. Rotations whose vector part
/// is shorter than `eps` decompose to a zero angle around X instead of producing NaNs.
pub fn quat_to_angle_axis(q: Quat, eps: f32) -> (f32, Vec3) {
    let xyz = q.xyz();
    let length = xyz.length();
    if length < eps {
        (0., Vec3::X)
    } else {
        (2. * q.w.clamp(-1., 1.).acos(), xyz / length)
    }
}

/// Decaying rotation offset around a fixed axis, applied on top of the target rotation.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq)]
#[reflect(Default)]
pub struct RotationInertializer {
    axis: Vec3,
    decay: QuinticDecay,
}

impl RotationInertializer {
    /// Returns `None` when `prev` and `target` are closer than the default minimum angle.
    pub fn create(
        prev_prev: Quat,
        prev: Quat,
        target: Quat,
        duration: f32,
        delta: f32,
    ) -> Option<Self> {
        Self::create_with_threshold(
            prev_prev,
            prev,
            target,
            duration,
            delta,
            DEFAULT_MIN_ROTATION_DEGREES.to_radians(),
        )
    }

    pub fn create_with_threshold(
        prev_prev: Quat,
        prev: Quat,
        target: Quat,
        duration: f32,
        delta: f32,
        min_angle: f32,
    ) -> Option<Self> {
        if prev.angle_between(target) < min_angle {
            return None;
        }

        let target_inverse = target.inverse();
        let q_prev = (target_inverse * prev).normalize();
        let mut q_prev_prev = target_inverse * prev_prev;
        if q_prev_prev.w < 0. {
            q_prev_prev = -q_prev_prev;
        }

        let (mut angle, axis) = quat_to_angle_axis(q_prev, 1e-8);
        let mut axis = axis.normalize_or(Vec3::X);
        // Shortest arc
        if angle > PI {
            angle = TAU - angle;
            axis = -axis;
        }

        let x_m1 = 2. * q_prev_prev.xyz().dot(axis).atan2(q_prev_prev.w);
        let velocity = if delta > 0. {
            ((angle - x_m1) / delta).min(0.)
        } else {
            0.
        };

        Some(Self {
            axis,
            decay: QuinticDecay::new(angle, velocity, duration),
        })
    }

    pub fn offset_angle(&self) -> f32 {
        self.decay.initial_offset()
    }

    pub fn offset_axis(&self) -> Vec3 {
        self.axis
    }

    pub fn duration(&self) -> f32 {
        self.decay.duration()
    }

    pub fn is_done(&self) -> bool {
        self.decay.is_done()
    }

    /// Advances the decay and returns the remaining offset rotation.
    pub fn advance(&mut self, delta: f32) -> Quat {
        Quat::from_axis_angle(self.axis, self.decay.advance(delta))
    }
}
