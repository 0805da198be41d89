use bevy::{
    log::debug,
    reflect::{Reflect, std_traits::ReflectDefault},
};

use super::{DEFAULT_MIN_ROTATION_DEGREES, PositionInertializer, RotationInertializer};
use crate::{
    edge_data::bone_mask::BoneMask,
    errors::{GraphError, GraphResult},
    pose::{BoneId, Pose},
};

/// The three consecutive poses an inertialization is built from.
#[derive(Clone, Copy, Default)]
pub struct InertializationPoses<'a> {
    pub prev_prev: Option<&'a Pose>,
    pub prev: Option<&'a Pose>,
    pub target: Option<&'a Pose>,
}

/// Decaying channels of a single bone. At least one of them is present.
#[derive(Reflect, Clone, Debug, Default, PartialEq)]
#[reflect(Default)]
pub struct BoneInertialization {
    pub bone: BoneId,
    pub position: Option<PositionInertializer>,
    pub rotation: Option<RotationInertializer>,
}

/// Per-bone inertialization of a whole pose. The set of bones is fixed at creation.
#[derive(Reflect, Clone, Debug, Default, PartialEq)]
#[reflect(Default)]
pub struct PoseInertializer {
    bones: Vec<BoneInertialization>,
    elapsed: f32,
}

impl PoseInertializer {
    pub fn create(
        poses: InertializationPoses,
        base: &Pose,
        duration: f32,
        delta: f32,
        mask: &BoneMask,
    ) -> GraphResult<Self> {
        Self::create_with_threshold(
            poses,
            base,
            duration,
            delta,
            mask,
            DEFAULT_MIN_ROTATION_DEGREES.to_radians(),
        )
    }

    /// Builds decaying channels for every bone of `base` accepted by `mask`. Channels without a
    /// visible discontinuity are skipped. `min_rotation_angle` is in radians.
    pub fn create_with_threshold(
        poses: InertializationPoses,
        base: &Pose,
        duration: f32,
        delta: f32,
        mask: &BoneMask,
        min_rotation_angle: f32,
    ) -> GraphResult<Self> {
        let prev_prev = poses
            .prev_prev
            .ok_or_else(|| GraphError::MissingInertializationPose("prev_prev".into()))?;
        let prev = poses
            .prev
            .ok_or_else(|| GraphError::MissingInertializationPose("prev".into()))?;
        let target = poses
            .target
            .ok_or_else(|| GraphError::MissingInertializationPose("target".into()))?;

        let mut bones = Vec::new();

        for id in base.bone_ids() {
            if !mask.contains(&id) {
                continue;
            }

            let position = PositionInertializer::create(
                prev_prev.bone_translation(&id, base),
                prev.bone_translation(&id, base),
                target.bone_translation(&id, base),
                duration,
                delta,
            );
            let position = (!position.is_negligible()).then_some(position);

            let rotation = RotationInertializer::create_with_threshold(
                prev_prev.bone_rotation(&id, base),
                prev.bone_rotation(&id, base),
                target.bone_rotation(&id, base),
                duration,
                delta,
                min_rotation_angle,
            )
            .filter(|rotation| rotation.duration() > 0.);

            if position.is_some() || rotation.is_some() {
                bones.push(BoneInertialization {
                    bone: id,
                    position,
                    rotation,
                });
            }
        }

        debug!("Inertializing {} bones over {duration}s", bones.len());

        Ok(Self { bones, elapsed: 0. })
    }

    pub fn bones(&self) -> &[BoneInertialization] {
        &self.bones
    }

    pub fn channel_count(&self) -> usize {
        self.bones
            .iter()
            .map(|b| b.position.is_some() as usize + b.rotation.is_some() as usize)
            .sum()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_done(&self) -> bool {
        self.bones.iter().all(|b| {
            b.position.as_ref().is_none_or(|p| p.is_done())
                && b.rotation.as_ref().is_none_or(|r| r.is_done())
        })
    }

    /// Adds the remaining offsets onto `target`, creating bones that are missing from it. Returns
    /// true once every channel is done.
    pub fn advance(&mut self, target: &mut Pose, base: &Pose, delta: f32) -> bool {
        let mut done = true;
        self.elapsed += delta;

        for bone in self.bones.iter_mut() {
            let id = bone.bone;
            target.create_bone(id);

            if let Some(position) = bone.position.as_mut().filter(|p| !p.is_done()) {
                let translation = target.bone_translation(&id, base) + position.advance(delta);
                target.set_bone_translation(id, translation);
                done &= position.is_done();
            }

            if let Some(rotation) = bone.rotation.as_mut().filter(|r| !r.is_done()) {
                let value = target.bone_rotation(&id, base) * rotation.advance(delta);
                target.set_bone_rotation(id, value);
                done &= rotation.is_done();
            }
        }

        done
    }
}
