use bevy::{
    platform::collections::HashMap,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use serde::{Deserialize, Serialize};

use super::FloatCurve;
use crate::{edge_data::bone_mask::BoneMask, interpolation::cubic_spline_weights, pose::Pose};

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[reflect(Default)]
pub enum InterpolationMethod {
    /// Holds the previous keyframe
    Step,
    #[default]
    Linear,
    /// Catmull-Rom spline whose neighbours wrap around, for looping clips
    BicubicSpline,
    /// Catmull-Rom spline whose neighbours are clamped to the first and last keyframes
    BicubicSplineClamped,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[reflect(Default)]
pub struct Keyframe {
    pub time: f32,
    pub pose: Pose,
}

/// Keyframed pose animation with named scalar curves.
#[derive(Reflect, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[reflect(Default)]
pub struct Animation {
    keyframes: Vec<Keyframe>,
    curves: HashMap<String, FloatCurve>,
}

impl Animation {
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe>) -> Self {
        let mut animation = Self::default();
        for keyframe in keyframes {
            animation.add_keyframe(keyframe);
        }
        animation
    }

    /// Inserts a keyframe, keeping keyframes sorted by time.
    pub fn add_keyframe(&mut self, keyframe: Keyframe) {
        let index = self
            .keyframes
            .partition_point(|k| k.time <= keyframe.time);
        self.keyframes.insert(index, keyframe);
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    /// Removes every keyframe and curve.
    pub fn clear(&mut self) {
        self.keyframes.clear();
        self.curves.clear();
    }

    pub fn insert_curve(&mut self, name: impl Into<String>, curve: FloatCurve) {
        self.curves.insert(name.into(), curve);
    }

    pub fn curve(&self, name: &str) -> Option<&FloatCurve> {
        self.curves.get(name)
    }

    /// Samples a named curve, or 0 when the animation has no such curve.
    pub fn sample_curve(&self, name: &str, time: f32) -> f32 {
        self.curve(name).map(|c| c.sample(time)).unwrap_or(0.)
    }

    pub fn length(&self) -> f32 {
        self.keyframes.last().map(|k| k.time).unwrap_or(0.)
    }

    /// Writes the animation's pose at `time` into `target`. Bones that the keyframes do not
    /// animate are left untouched.
    pub fn interpolate(&self, time: f32, base: &Pose, target: &mut Pose, method: InterpolationMethod) {
        let mask = BoneMask::all();
        let count = self.keyframes.len();
        match count {
            0 => return,
            1 => {
                let pose = &self.keyframes[0].pose;
                target.overwrite_from(&pose.blend(pose, base, 0., &mask));
                return;
            }
            _ => {}
        }

        let (mut prev, mut next) = (0, 1);
        for i in 0..count - 1 {
            if self.keyframes[i].time <= time {
                prev = i;
                next = i + 1;
            }
        }

        let start = self.keyframes[prev].time;
        let end = self.keyframes[next].time;
        let blend = if end > start {
            ((time.min(end) - start) / (end - start)).clamp(0., 1.)
        } else {
            0.
        };

        let pose_at = |index: usize| &self.keyframes[index].pose;

        let result = match method {
            InterpolationMethod::Step => pose_at(prev).blend(pose_at(prev), base, 0., &mask),
            InterpolationMethod::Linear => pose_at(prev).blend(pose_at(next), base, blend, &mask),
            InterpolationMethod::BicubicSpline | InterpolationMethod::BicubicSplineClamped => {
                let frames = if method == InterpolationMethod::BicubicSpline {
                    [
                        (prev + count - 1) % count,
                        prev,
                        next,
                        (next + 1) % count,
                    ]
                } else {
                    [prev.saturating_sub(1), prev, next, (next + 1).min(count - 1)]
                };
                let weights = cubic_spline_weights(blend);

                // Chained pairwise blends, each weighted by its share of the accumulated weight
                let mut result = pose_at(frames[1]).clone();
                let mut total_weight = weights[0] + weights[1];
                if total_weight > 0. {
                    result = pose_at(frames[0]).blend(
                        pose_at(frames[1]),
                        base,
                        weights[1] / total_weight,
                        &mask,
                    );
                }
                for k in 2..4 {
                    total_weight += weights[k];
                    if total_weight > 0. {
                        result = result.blend(
                            pose_at(frames[k]),
                            base,
                            weights[k] / total_weight,
                            &mask,
                        );
                    }
                }
                result
            }
        };

        target.overwrite_from(&result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::BoneId;
    use bevy::math::Vec3;

    fn bone() -> BoneId {
        BoneId::from_name("root")
    }

    fn keyframe(time: f32, x: f32) -> Keyframe {
        let mut pose = Pose::default();
        pose.set_bone_translation(bone(), Vec3::new(x, 0., 0.));
        Keyframe { time, pose }
    }

    fn animation() -> Animation {
        Animation::from_keyframes([keyframe(1., 1.), keyframe(0., 0.), keyframe(2., 4.)])
    }

    fn sample(animation: &Animation, time: f32, method: InterpolationMethod) -> f32 {
        let base = Pose::from_transforms([(bone(), Default::default())]);
        let mut target = Pose::default();
        animation.interpolate(time, &base, &mut target, method);
        target.bone_translation(&bone(), &base).x
    }

    #[test]
    fn keyframes_are_sorted() {
        let animation = animation();
        let times: Vec<f32> = animation.keyframes().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0., 1., 2.]);
        assert_eq!(animation.length(), 2.);
    }

    #[test]
    fn empty_animation_leaves_target() {
        let mut target = Pose::default();
        Animation::default().interpolate(0.5, &Pose::default(), &mut target, InterpolationMethod::Linear);
        assert!(target.is_empty());
    }

    #[test]
    fn single_keyframe_is_constant() {
        let animation = Animation::from_keyframes([keyframe(0., 3.)]);
        assert_eq!(sample(&animation, 10., InterpolationMethod::Linear), 3.);
    }

    #[test]
    fn linear_and_step() {
        let animation = animation();
        assert!((sample(&animation, 0.5, InterpolationMethod::Linear) - 0.5).abs() < 1e-6);
        assert!((sample(&animation, 1.5, InterpolationMethod::Linear) - 2.5).abs() < 1e-6);
        assert_eq!(sample(&animation, 1.5, InterpolationMethod::Step), 1.);
        assert_eq!(sample(&animation, 5., InterpolationMethod::Linear), 4.);
    }

    #[test]
    fn bicubic_passes_through_keyframes() {
        let animation = animation();
        for method in [
            InterpolationMethod::BicubicSpline,
            InterpolationMethod::BicubicSplineClamped,
        ] {
            assert!((sample(&animation, 1., method) - 1.).abs() < 1e-5);
            assert!((sample(&animation, 0., method)).abs() < 1e-5);
        }
    }

    #[test]
    fn sparse_base_still_interpolates() {
        let animation = animation();
        let base = Pose::default();
        for (time, expected) in [(0.5, 0.5), (1.5, 2.5), (3., 4.)] {
            let mut target = Pose::default();
            animation.interpolate(time, &base, &mut target, InterpolationMethod::Linear);
            assert!((target.bone_translation(&bone(), &base).x - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn clear_drops_keyframes_and_curves() {
        let mut animation = animation();
        animation.insert_curve("left_ik_grounded", FloatCurve::from_keys([(0., 1.)]));
        animation.clear();
        assert_eq!(animation.keyframe_count(), 0);
        assert_eq!(animation.sample_curve("left_ik_grounded", 0.), 0.);
    }

    #[test]
    fn curves_default_to_zero() {
        let mut animation = animation();
        animation.insert_curve("left_ik_grounded", FloatCurve::from_keys([(0., 1.), (2., 0.)]));
        assert_eq!(animation.sample_curve("left_ik_grounded", 1.), 0.5);
        assert_eq!(animation.sample_curve("right_ik_grounded", 1.), 0.);
    }
}
