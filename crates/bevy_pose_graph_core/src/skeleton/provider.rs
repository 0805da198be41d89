use bevy::transform::components::Transform;

use crate::pose::BoneId;

/// Read access to a bone hierarchy. Nodes that need to walk bone chains receive one of these
/// explicitly during evaluation.
pub trait SkeletonProvider {
    fn has_bone(&self, bone: &BoneId) -> bool;
    fn bone_parent(&self, bone: &BoneId) -> Option<BoneId>;
    fn bone_children(&self, bone: &BoneId) -> Vec<BoneId>;
    /// Local rest transform of the bone, relative to its parent
    fn rest_transform(&self, bone: &BoneId) -> Option<Transform>;
    fn bone_name(&self, bone: &BoneId) -> Option<&str>;
    fn bone_count(&self) -> usize;
}
