use bevy::{platform::collections::HashMap, reflect::Reflect, transform::components::Transform};
use indexmap::IndexMap;
use regex::Regex;
use std::fmt::Debug;

use super::SkeletonProvider;
use crate::{
    errors::{GraphError, GraphResult},
    pose::{BoneId, Pose},
};

#[derive(Reflect, Clone, Debug, PartialEq)]
pub struct SkeletonBone {
    pub name: String,
    pub parent: Option<BoneId>,
    pub children: Vec<BoneId>,
    pub rest: Transform,
}

/// Bone hierarchy with rest transforms. Bones keep the order in which they were first added.
/// Re-adding a bone moves it to its new parent, which must not be one of its descendants.
#[derive(Reflect, Clone, Default)]
pub struct Skeleton {
    #[reflect(ignore)]
    bones: IndexMap<BoneId, SkeletonBone>,
    name_to_id: HashMap<String, BoneId>,
}

impl Skeleton {
    /// Adds a bone without a parent.
    pub fn add_root(&mut self, name: &str, rest: Transform) -> BoneId {
        self.detach(BoneId::from_name(name));
        self.insert(name, None, rest)
    }

    /// Adds a bone under `parent`, which must already be part of the skeleton.
    pub fn add_bone(
        &mut self,
        name: &str,
        parent: Option<&str>,
        rest: Transform,
    ) -> GraphResult<BoneId> {
        let parent_id = match parent {
            Some(parent) => Some(
                self.id_of(parent)
                    .ok_or_else(|| GraphError::MissingBone(parent.to_string()))?,
            ),
            None => None,
        };
        let id = BoneId::from_name(name);
        if let Some(parent_id) = parent_id
            && self.is_ancestor_or_self(id, parent_id)
        {
            return Err(GraphError::InvalidBoneParent {
                bone: name.to_string(),
                parent: parent.unwrap_or_default().to_string(),
            });
        }
        self.detach(id);
        Ok(self.insert(name, parent_id, rest))
    }

    /// Whether `ancestor` is `bone` or lies on its parent chain.
    fn is_ancestor_or_self(&self, ancestor: BoneId, bone: BoneId) -> bool {
        let mut current = Some(bone);
        for _ in 0..=self.bones.len() {
            let Some(id) = current else {
                return false;
            };
            if id == ancestor {
                return true;
            }
            current = self.bones.get(&id).and_then(|b| b.parent);
        }
        false
    }

    /// Removes a bone from its parent's children.
    fn detach(&mut self, id: BoneId) {
        let Some(parent) = self.bones.get(&id).and_then(|b| b.parent) else {
            return;
        };
        if let Some(parent) = self.bones.get_mut(&parent) {
            parent.children.retain(|child| *child != id);
        }
    }

    fn insert(&mut self, name: &str, parent: Option<BoneId>, rest: Transform) -> BoneId {
        let id = BoneId::from_name(name);
        if let Some(parent) = parent.and_then(|p| self.bones.get_mut(&p)) {
            if !parent.children.contains(&id) {
                parent.children.push(id);
            }
        }
        let children = self
            .bones
            .get(&id)
            .map(|bone| bone.children.clone())
            .unwrap_or_default();
        self.bones.insert(
            id,
            SkeletonBone {
                name: name.to_string(),
                parent,
                children,
                rest,
            },
        );
        self.name_to_id.insert(name.to_string(), id);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<BoneId> {
        self.name_to_id.get(name).copied()
    }

    pub fn bone(&self, id: &BoneId) -> Option<&SkeletonBone> {
        self.bones.get(id)
    }

    pub fn bone_ids(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.bones.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.bones
            .iter()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(id, _)| *id)
    }

    /// Names of every bone matching `pattern`, in skeleton order.
    pub fn bones_matching(&self, pattern: &Regex) -> Vec<String> {
        self.bones
            .values()
            .filter(|bone| pattern.is_match(&bone.name))
            .map(|bone| bone.name.clone())
            .collect()
    }

    /// Pose holding every bone at its rest transform.
    pub fn rest_pose(&self) -> Pose {
        Pose::from_transforms(self.bones.iter().map(|(id, bone)| (*id, bone.rest)))
    }

    fn indent(f: &mut std::fmt::Formatter<'_>, level: u32) -> std::fmt::Result {
        if level == 0 {
            return Ok(());
        }
        for _ in 0..(level - 1) {
            write!(f, "┃ ")?;
        }
        write!(f, "┣━")?;
        Ok(())
    }

    fn fmt_level(&self, f: &mut std::fmt::Formatter<'_>, level: u32, id: BoneId) -> std::fmt::Result {
        let Some(bone) = self.bones.get(&id) else {
            return Ok(());
        };
        Self::indent(f, level)?;
        writeln!(f, "🦴 {:?} [{:?}]", bone.name, id)?;
        for child in bone.children.iter() {
            self.fmt_level(f, level + 1, *child)?;
        }
        Ok(())
    }
}

impl SkeletonProvider for Skeleton {
    fn has_bone(&self, bone: &BoneId) -> bool {
        self.bones.contains_key(bone)
    }

    fn bone_parent(&self, bone: &BoneId) -> Option<BoneId> {
        self.bones.get(bone).and_then(|b| b.parent)
    }

    fn bone_children(&self, bone: &BoneId) -> Vec<BoneId> {
        self.bones
            .get(bone)
            .map(|b| b.children.clone())
            .unwrap_or_default()
    }

    fn rest_transform(&self, bone: &BoneId) -> Option<Transform> {
        self.bones.get(bone).map(|b| b.rest)
    }

    fn bone_name(&self, bone: &BoneId) -> Option<&str> {
        self.bones.get(bone).map(|b| b.name.as_str())
    }

    fn bone_count(&self) -> usize {
        self.bones.len()
    }
}

impl Debug for Skeleton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Skeleton hierarchy:")?;
        for root in self.roots() {
            self.fmt_level(f, 0, root)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg() -> Skeleton {
        let mut skeleton = Skeleton::default();
        skeleton.add_root("hip", Transform::from_xyz(0., 1., 0.));
        skeleton
            .add_bone("thigh", Some("hip"), Transform::from_xyz(0., -0.1, 0.))
            .unwrap();
        skeleton
            .add_bone("shin", Some("thigh"), Transform::from_xyz(0., -0.4, 0.))
            .unwrap();
        skeleton
    }

    #[test]
    fn hierarchy_queries() {
        let skeleton = leg();
        let hip = BoneId::from_name("hip");
        let thigh = BoneId::from_name("thigh");

        assert_eq!(skeleton.bone_parent(&thigh), Some(hip));
        assert_eq!(skeleton.bone_parent(&hip), None);
        assert_eq!(skeleton.bone_children(&hip), vec![thigh]);
        assert_eq!(skeleton.bone_name(&thigh), Some("thigh"));
        assert_eq!(skeleton.bone_ids().count(), 3);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut skeleton = leg();
        let result = skeleton.add_bone("foot", Some("ankle"), Transform::IDENTITY);
        assert_eq!(result, Err(GraphError::MissingBone("ankle".into())));
    }

    #[test]
    fn reparenting_under_descendant_is_rejected() {
        let mut skeleton = leg();
        let result = skeleton.add_bone("thigh", Some("shin"), Transform::IDENTITY);
        assert_eq!(
            result,
            Err(GraphError::InvalidBoneParent {
                bone: "thigh".into(),
                parent: "shin".into()
            })
        );
        let result = skeleton.add_bone("shin", Some("shin"), Transform::IDENTITY);
        assert!(result.is_err());
        assert_eq!(
            skeleton.bone_parent(&BoneId::from_name("thigh")),
            Some(BoneId::from_name("hip"))
        );
    }

    #[test]
    fn reparenting_moves_bone_between_children() {
        let mut skeleton = leg();
        let hip = BoneId::from_name("hip");
        let thigh = BoneId::from_name("thigh");
        let shin = BoneId::from_name("shin");

        skeleton.add_bone("shin", Some("hip"), Transform::IDENTITY).unwrap();
        assert_eq!(skeleton.bone_parent(&shin), Some(hip));
        assert_eq!(skeleton.bone_children(&hip), vec![thigh, shin]);
        assert!(skeleton.bone_children(&thigh).is_empty());

        skeleton.add_root("shin", Transform::IDENTITY);
        assert_eq!(skeleton.bone_children(&hip), vec![thigh]);
        assert_eq!(skeleton.roots().count(), 2);
    }

    #[test]
    fn rest_pose_has_every_bone() {
        let skeleton = leg();
        let pose = skeleton.rest_pose();
        assert_eq!(pose.len(), 3);
        assert_eq!(
            pose.bone_translation(&BoneId::from_name("shin"), &Pose::default()),
            bevy::math::Vec3::new(0., -0.4, 0.)
        );
    }

    #[test]
    fn debug_prints_tree() {
        let text = format!("{:?}", leg());
        assert!(text.contains("shin"));
    }
}
