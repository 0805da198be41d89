pub use crate::id::BoneId;
use crate::{edge_data::bone_mask::BoneMask, interpolation::InterpolateLinear};
use bevy::{
    math::{Quat, Vec3},
    platform::collections::HashMap,
    reflect::{Reflect, std_traits::ReflectDefault},
    transform::components::Transform,
};
use serde::{Deserialize, Serialize};

/// Transform channels of a single bone. A channel set to `None` is not animated by this pose and
/// resolves through the base pose instead.
#[derive(Reflect, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[reflect(Default)]
pub struct BonePose {
    pub id: BoneId,
    pub rotation: Option<Quat>,
    pub translation: Option<Vec3>,
    pub scale: Option<Vec3>,
}

impl BonePose {
    pub fn new(id: BoneId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn from_transform(id: BoneId, transform: Transform) -> Self {
        Self {
            id,
            rotation: Some(transform.rotation),
            translation: Some(transform.translation),
            scale: Some(transform.scale),
        }
    }

    pub fn has_any_channel(&self) -> bool {
        self.rotation.is_some() || self.translation.is_some() || self.scale.is_some()
    }

    pub fn to_transform(&self) -> Transform {
        self.to_transform_with_base(Transform::default())
    }

    pub fn to_transform_with_base(&self, mut base: Transform) -> Transform {
        if let Some(translation) = &self.translation {
            base.translation = *translation;
        }

        if let Some(rotation) = &self.rotation {
            base.rotation = *rotation;
        }

        if let Some(scale) = &self.scale {
            base.scale = *scale;
        }

        base
    }

    /// Copies every channel that is present in `other`, leaving the rest untouched.
    pub fn overwrite_from(&mut self, other: &BonePose) {
        if other.translation.is_some() {
            self.translation = other.translation;
        }
        if other.rotation.is_some() {
            self.rotation = other.rotation;
        }
        if other.scale.is_some() {
            self.scale = other.scale;
        }
    }
}

/// Sparse, per-bone snapshot of a skeleton. Every read takes a base pose that answers for the
/// bones and channels missing here.
#[derive(Reflect, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[reflect(Default)]
pub struct Pose {
    pub bones: Vec<BonePose>,
    pub paths: HashMap<BoneId, usize>,
}

impl Pose {
    pub fn from_transforms(transforms: impl IntoIterator<Item = (BoneId, Transform)>) -> Self {
        let mut pose = Pose::default();
        for (id, transform) in transforms {
            pose.add_bone(BonePose::from_transform(id, transform));
        }
        pose
    }

    /// Inserts a bone, replacing any previous entry with the same id.
    pub fn add_bone(&mut self, pose: BonePose) {
        if let Some(index) = self.paths.get(&pose.id) {
            self.bones[*index] = pose;
            return;
        }
        let index = self.bones.len();
        self.paths.insert(pose.id, index);
        self.bones.push(pose);
    }

    /// Creates an empty entry for a bone and returns it. An existing entry is returned as is.
    pub fn create_bone(&mut self, id: BoneId) -> &mut BonePose {
        self.get_or_create_bone_mut(id)
    }

    pub fn get_or_create_bone_mut(&mut self, id: BoneId) -> &mut BonePose {
        let index = match self.paths.get(&id) {
            Some(index) => *index,
            None => {
                let index = self.bones.len();
                self.paths.insert(id, index);
                self.bones.push(BonePose::new(id));
                index
            }
        };
        &mut self.bones[index]
    }

    pub fn get_bone(&self, id: &BoneId) -> Option<&BonePose> {
        self.paths.get(id).map(|index| &self.bones[*index])
    }

    pub fn get_bone_mut(&mut self, id: &BoneId) -> Option<&mut BonePose> {
        self.paths.get(id).map(|index| &mut self.bones[*index])
    }

    pub fn has_bone(&self, id: &BoneId) -> bool {
        self.paths.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BonePose> {
        self.bones.iter()
    }

    pub fn bone_ids(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.bones.iter().map(|bone| bone.id)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn clear(&mut self) {
        self.bones.clear();
        self.paths.clear();
    }

    pub fn bone_translation(&self, id: &BoneId, base: &Pose) -> Vec3 {
        self.get_bone(id)
            .and_then(|b| b.translation)
            .or_else(|| base.get_bone(id).and_then(|b| b.translation))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn bone_rotation(&self, id: &BoneId, base: &Pose) -> Quat {
        self.get_bone(id)
            .and_then(|b| b.rotation)
            .or_else(|| base.get_bone(id).and_then(|b| b.rotation))
            .unwrap_or(Quat::IDENTITY)
    }

    pub fn bone_scale(&self, id: &BoneId, base: &Pose) -> Vec3 {
        self.get_bone(id)
            .and_then(|b| b.scale)
            .or_else(|| base.get_bone(id).and_then(|b| b.scale))
            .unwrap_or(Vec3::ONE)
    }

    /// Local transform of a bone, resolved channel by channel against `base`.
    pub fn bone_transform(&self, id: &BoneId, base: &Pose) -> Transform {
        Transform {
            translation: self.bone_translation(id, base),
            rotation: self.bone_rotation(id, base),
            scale: self.bone_scale(id, base),
        }
    }

    pub fn set_bone_translation(&mut self, id: BoneId, translation: Vec3) {
        self.get_or_create_bone_mut(id).translation = Some(translation);
    }

    pub fn set_bone_rotation(&mut self, id: BoneId, rotation: Quat) {
        self.get_or_create_bone_mut(id).rotation = Some(rotation);
    }

    pub fn set_bone_scale(&mut self, id: BoneId, scale: Vec3) {
        self.get_or_create_bone_mut(id).scale = Some(scale);
    }

    /// Copies the present channels of every bone in `other` over this pose.
    pub fn overwrite_from(&mut self, other: &Pose) {
        for bone in other.iter() {
            self.get_or_create_bone_mut(bone.id).overwrite_from(bone);
        }
    }

    /// Mixes `second` into this pose with factor `alpha`, for every bone that either pose
    /// animates. Channels missing on one side resolve through `base`, or are taken from the other
    /// side when `base` lacks them too. The mask weight of each bone scales `alpha`.
    pub fn blend(&self, second: &Pose, base: &Pose, alpha: f32, mask: &BoneMask) -> Pose {
        let mut output = self.clone();

        let mut ids: Vec<BoneId> = self.bone_ids().collect();
        ids.extend(second.bone_ids().filter(|id| !self.has_bone(id)));

        for id in ids {
            let first_bone = self.get_bone(&id);
            let second_bone = second.get_bone(&id);
            let base_bone = base.get_bone(&id);
            let weight = alpha * mask.bone_weight(&id);
            let out = output.get_or_create_bone_mut(id);

            let translation = |bone: Option<&BonePose>| bone.and_then(|b| b.translation);
            let rotation = |bone: Option<&BonePose>| bone.and_then(|b| b.rotation);
            let scale = |bone: Option<&BonePose>| bone.and_then(|b| b.scale);

            if let Some(value) = blend_channel(
                translation(first_bone),
                translation(second_bone),
                translation(base_bone),
                weight,
            ) {
                out.translation = Some(value);
            }
            if let Some(value) = blend_channel(
                rotation(first_bone),
                rotation(second_bone),
                rotation(base_bone),
                weight,
            ) {
                out.rotation = Some(value);
            }
            if let Some(value) = blend_channel(
                scale(first_bone),
                scale(second_bone),
                scale(base_bone),
                weight,
            ) {
                out.scale = Some(value);
            }
        }

        output
    }

    /// Layers `additive` on top of this pose. Translation and scale are added, rotation is
    /// pre-multiplied, and the result is mixed in by `alpha` times the mask weight. Bones that are
    /// not part of `base` are ignored.
    pub fn add(&mut self, additive: &Pose, base: &Pose, alpha: f32, mask: &BoneMask) {
        for second_bone in additive.iter() {
            let id = second_bone.id;
            let Some(base_bone) = base.get_bone(&id) else {
                continue;
            };
            let weight = alpha * mask.bone_weight(&id);

            let first = match self.get_bone(&id) {
                Some(bone) => bone.clone(),
                None => BonePose {
                    id,
                    ..base_bone.clone()
                },
            };
            let first_translation = first.translation.or(base_bone.translation);
            let first_rotation = first.rotation.or(base_bone.rotation);
            let first_scale = first.scale.or(base_bone.scale);

            let out = self.get_or_create_bone_mut(id);
            *out = first;

            if let Some(offset) = second_bone.translation {
                let a = first_translation.unwrap_or(Vec3::ZERO);
                out.translation = Some(a.lerp(a + offset, weight));
            }
            if let Some(offset) = second_bone.rotation {
                let a = first_rotation.unwrap_or(Quat::IDENTITY);
                out.rotation = Some(a.slerp(offset * a, weight));
            }
            if let Some(offset) = second_bone.scale {
                let a = first_scale.unwrap_or(Vec3::ONE);
                out.scale = Some(a.lerp(a + offset, weight));
            }
        }
    }
}

/// `None` when neither side animates the channel.
fn blend_channel<T: InterpolateLinear + Copy>(
    first: Option<T>,
    second: Option<T>,
    base: Option<T>,
    weight: f32,
) -> Option<T> {
    if first.is_none() && second.is_none() {
        return None;
    }
    match (first.or(base), second.or(base)) {
        (Some(a), Some(b)) => Some(a.interpolate_linear(&b, weight)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn base_pose() -> Pose {
        Pose::from_transforms([
            (
                BoneId::from_name("hip"),
                Transform::from_xyz(0., 1., 0.).with_rotation(Quat::from_rotation_y(0.3)),
            ),
            (BoneId::from_name("spine"), Transform::from_xyz(0., 0.5, 0.)),
        ])
    }

    #[test]
    fn missing_bone_falls_back_to_base() {
        let base = base_pose();
        let pose = Pose::default();
        let hip = BoneId::from_name("hip");

        assert_eq!(pose.bone_transform(&hip, &base), base.bone_transform(&hip, &base));
        assert_eq!(pose.bone_translation(&hip, &base), Vec3::new(0., 1., 0.));
        assert_eq!(pose.bone_rotation(&hip, &base), Quat::from_rotation_y(0.3));
    }

    #[test]
    fn missing_channel_falls_back_to_base() {
        let base = base_pose();
        let hip = BoneId::from_name("hip");
        let mut pose = Pose::default();
        pose.set_bone_rotation(hip, Quat::from_rotation_x(FRAC_PI_2));

        assert_eq!(pose.bone_rotation(&hip, &base), Quat::from_rotation_x(FRAC_PI_2));
        assert_eq!(pose.bone_translation(&hip, &base), Vec3::new(0., 1., 0.));
        assert_eq!(pose.bone_scale(&hip, &base), Vec3::ONE);
    }

    #[test]
    fn unknown_bone_resolves_to_identity() {
        let base = base_pose();
        let pose = Pose::default();
        let unknown = BoneId::from_name("tail");

        assert_eq!(pose.bone_transform(&unknown, &base), Transform::IDENTITY);
    }

    #[test]
    fn create_bone_is_idempotent() {
        let mut pose = Pose::default();
        let hip = BoneId::from_name("hip");
        pose.create_bone(hip).translation = Some(Vec3::X);
        pose.create_bone(hip);

        assert_eq!(pose.len(), 1);
        assert_eq!(pose.get_bone(&hip).and_then(|b| b.translation), Some(Vec3::X));
    }

    #[test]
    fn blend_halfway() {
        let base = base_pose();
        let spine = BoneId::from_name("spine");
        let mut a = Pose::default();
        a.set_bone_translation(spine, Vec3::ZERO);
        let mut b = Pose::default();
        b.set_bone_translation(spine, Vec3::new(2., 0., 0.));

        let out = a.blend(&b, &base, 0.5, &BoneMask::all());
        assert!(
            out.bone_translation(&spine, &base)
                .abs_diff_eq(Vec3::new(1., 0., 0.), 1e-6)
        );
    }

    #[test]
    fn blend_respects_mask() {
        let base = base_pose();
        let spine = BoneId::from_name("spine");
        let hip = BoneId::from_name("hip");
        let mut a = Pose::default();
        a.set_bone_translation(spine, Vec3::ZERO);
        a.set_bone_translation(hip, Vec3::ZERO);
        let mut b = Pose::default();
        b.set_bone_translation(spine, Vec3::X);
        b.set_bone_translation(hip, Vec3::X);

        let out = a.blend(&b, &base, 1.0, &BoneMask::only(["spine"]));
        assert!(out.bone_translation(&spine, &base).abs_diff_eq(Vec3::X, 1e-6));
        assert!(out.bone_translation(&hip, &base).abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn blend_covers_bones_outside_base() {
        let base = Pose::default();
        let tail = BoneId::from_name("tail");
        let mut a = Pose::default();
        a.set_bone_translation(tail, Vec3::ZERO);
        let mut b = Pose::default();
        b.set_bone_translation(tail, Vec3::new(4., 0., 0.));
        b.set_bone_rotation(tail, Quat::from_rotation_y(0.5));

        let out = a.blend(&b, &base, 0.25, &BoneMask::all());
        let bone = out.get_bone(&tail).unwrap();
        assert!(bone.translation.unwrap().abs_diff_eq(Vec3::X, 1e-6));
        assert_eq!(bone.rotation, Some(Quat::from_rotation_y(0.5)));
        assert_eq!(bone.scale, None);
    }

    #[test]
    fn add_layers_offsets() {
        let base = base_pose();
        let spine = BoneId::from_name("spine");
        let mut pose = Pose::default();
        pose.set_bone_translation(spine, Vec3::Y);
        let mut additive = Pose::default();
        additive.set_bone_translation(spine, Vec3::X);
        additive.set_bone_rotation(spine, Quat::from_rotation_z(0.5));

        pose.add(&additive, &base, 1.0, &BoneMask::all());
        assert!(
            pose.bone_translation(&spine, &base)
                .abs_diff_eq(Vec3::new(1., 1., 0.), 1e-6)
        );
        assert!(
            pose.bone_rotation(&spine, &base)
                .abs_diff_eq(Quat::from_rotation_z(0.5), 1e-5)
        );
    }

    #[test]
    fn add_skips_bones_outside_base() {
        let base = base_pose();
        let tail = BoneId::from_name("tail");
        let mut pose = Pose::default();
        let mut additive = Pose::default();
        additive.set_bone_translation(tail, Vec3::X);

        pose.add(&additive, &base, 1.0, &BoneMask::all());
        assert!(!pose.has_bone(&tail));
    }
}
