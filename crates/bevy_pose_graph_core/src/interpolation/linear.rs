use bevy::{math::FloatExt, prelude::*};

use crate::pose::BonePose;

/// Linear interpolation, spherical for rotations.
pub trait InterpolateLinear {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self;
}

impl InterpolateLinear for f32 {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        self.lerp(*other, f)
    }
}

impl InterpolateLinear for Vec3 {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        self.lerp(*other, f)
    }
}

impl InterpolateLinear for Quat {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        self.slerp(*other, f)
    }
}

impl InterpolateLinear for Transform {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        Transform {
            translation: self.translation.interpolate_linear(&other.translation, f),
            rotation: self.rotation.interpolate_linear(&other.rotation, f),
            scale: self.scale.interpolate_linear(&other.scale, f),
        }
    }
}

fn interpolate_channel<T: InterpolateLinear>(a: Option<T>, b: Option<T>, f: f32) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.interpolate_linear(&b, f)),
        (a, b) => a.or(b),
    }
}

/// Channels present on only one side are taken from that side unchanged.
impl InterpolateLinear for BonePose {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        BonePose {
            id: self.id,
            rotation: interpolate_channel(self.rotation, other.rotation, f),
            translation: interpolate_channel(self.translation, other.translation, f),
            scale: interpolate_channel(self.scale, other.scale, f),
        }
    }
}
