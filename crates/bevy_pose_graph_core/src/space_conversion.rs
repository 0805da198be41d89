use bevy::transform::components::Transform;

use crate::{
    pose::{BoneId, Pose},
    skeleton::SkeletonProvider,
};

/// Converts transforms between bone space and skeleton space for a given pose. Skeleton space is
/// the space in which the skeleton's root bones are expressed.
// Implements Copy because it's just immutable references
#[derive(Clone, Copy)]
pub struct SpaceConversion<'a> {
    pub pose: &'a Pose,
    pub base: &'a Pose,
    pub skeleton: &'a dyn SkeletonProvider,
}

impl<'a> SpaceConversion<'a> {
    pub fn new(pose: &'a Pose, base: &'a Pose, skeleton: &'a dyn SkeletonProvider) -> Self {
        Self {
            pose,
            base,
            skeleton,
        }
    }

    /// Local transform of a bone in this pose, falling back to the base pose and then to the rest
    /// transform.
    pub fn local_transform(&self, bone: BoneId) -> Transform {
        let rest = self
            .skeleton
            .rest_transform(&bone)
            .unwrap_or(Transform::IDENTITY);
        let base = self
            .base
            .get_bone(&bone)
            .map(|b| b.to_transform_with_base(rest))
            .unwrap_or(rest);
        self.pose
            .get_bone(&bone)
            .map(|b| b.to_transform_with_base(base))
            .unwrap_or(base)
    }

    /// Accumulates local transforms from `source` up to, but excluding, `target`. With `None` as
    /// target, the walk ends at the skeleton root.
    pub fn change_bone_space_up(
        &self,
        transform: Transform,
        source: BoneId,
        target: Option<BoneId>,
    ) -> Transform {
        let mut curr_bone_id = Some(source);
        let mut curr_transform = Transform::IDENTITY;

        // A well formed hierarchy is never deeper than its bone count
        for _ in 0..=self.skeleton.bone_count() {
            let Some(bone) = curr_bone_id else {
                break;
            };
            if Some(bone) == target {
                break;
            }
            curr_transform = self.local_transform(bone) * curr_transform;
            curr_bone_id = self.skeleton.bone_parent(&bone);
        }

        curr_transform * transform
    }

    /// Skeleton space transform of `bone`.
    pub fn skeleton_transform_of_bone(&self, bone: BoneId) -> Transform {
        self.change_bone_space_up(Transform::IDENTITY, bone, None)
    }

    /// Skeleton space transform of the parent of `bone`, or identity for a root bone.
    pub fn parent_skeleton_transform(&self, bone: BoneId) -> Transform {
        self.skeleton
            .bone_parent(&bone)
            .map(|parent| self.skeleton_transform_of_bone(parent))
            .unwrap_or(Transform::IDENTITY)
    }

    /// Expresses a skeleton space transform in the space of `bone`.
    pub fn skeleton_to_bone_space(&self, transform: Transform, bone: BoneId) -> Transform {
        let bone_transform = self.skeleton_transform_of_bone(bone);
        Transform::from_matrix(bone_transform.to_matrix().inverse()) * transform
    }
}

/// Skeleton space transform of `bone` under `pose`.
pub fn bone_global_transform(
    pose: &Pose,
    base: &Pose,
    skeleton: &dyn SkeletonProvider,
    bone: BoneId,
) -> Transform {
    SpaceConversion::new(pose, base, skeleton).skeleton_transform_of_bone(bone)
}

/// Expresses a skeleton space transform in the local space of `bone`.
pub fn global_to_bone_space(
    transform: Transform,
    pose: &Pose,
    base: &Pose,
    skeleton: &dyn SkeletonProvider,
    bone: BoneId,
) -> Transform {
    SpaceConversion::new(pose, base, skeleton).skeleton_to_bone_space(transform, bone)
}
