use bevy::{
    animation::AnimationTargetId,
    prelude::Name,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Stable identifier of a bone, derived from the bone name.
#[derive(
    Reflect, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord, Debug,
)]
#[reflect(Default)]
pub struct BoneId {
    id: Uuid,
}

impl Hash for BoneId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (hi, lo) = self.id.as_u64_pair();
        state.write_u64(hi ^ lo);
    }
}

impl BoneId {
    pub fn from_name(name: &str) -> Self {
        AnimationTargetId::from_name(&Name::new(name.to_string())).into()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl From<AnimationTargetId> for BoneId {
    fn from(value: AnimationTargetId) -> Self {
        Self { id: value.0 }
    }
}

impl From<&str> for BoneId {
    fn from(value: &str) -> Self {
        Self::from_name(value)
    }
}

impl From<&String> for BoneId {
    fn from(value: &String) -> Self {
        Self::from_name(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_id() {
        assert_eq!(BoneId::from_name("hip"), BoneId::from("hip"));
        assert_ne!(BoneId::from_name("hip"), BoneId::from_name("spine"));
    }
}
