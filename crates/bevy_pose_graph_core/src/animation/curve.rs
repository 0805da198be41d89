use bevy::{
    math::FloatExt,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use serde::{Deserialize, Serialize};

/// Scalar track sampled linearly between keys and clamped at both ends.
#[derive(Reflect, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[reflect(Default)]
pub struct FloatCurve {
    keys: Vec<(f32, f32)>,
}

impl FloatCurve {
    pub fn from_keys(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut curve = Self::default();
        for (time, value) in keys {
            curve.insert(time, value);
        }
        curve
    }

    /// Inserts a key, keeping keys sorted by time.
    pub fn insert(&mut self, time: f32, value: f32) {
        let index = self.keys.partition_point(|(t, _)| *t <= time);
        self.keys.insert(index, (time, value));
    }

    pub fn keys(&self) -> &[(f32, f32)] {
        &self.keys
    }

    pub fn sample(&self, time: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.;
        };
        if time <= first.0 {
            return first.1;
        }
        if time >= last.0 {
            return last.1;
        }
        let next = self.keys.partition_point(|(t, _)| *t <= time);
        let (t0, v0) = self.keys[next - 1];
        let (t1, v1) = self.keys[next];
        if t1 <= t0 {
            return v1;
        }
        v0.lerp(v1, (time - t0) / (t1 - t0))
    }
}
