use bevy::{
    platform::collections::HashMap,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{pose::BoneId, skeleton::Skeleton};

/// Per-bone weighting applied by blending, layering and inertialization.
#[derive(Reflect, Clone, Debug, PartialEq)]
#[reflect(Default)]
pub struct BoneMask {
    names: HashMap<BoneId, String>,
    weights: HashMap<BoneId, f32>,
    base: BoneMaskType,
}

impl Default for BoneMask {
    fn default() -> Self {
        Self::all()
    }
}

impl BoneMask {
    pub fn bone_weight(&self, bone_id: &BoneId) -> f32 {
        let default = match self.base {
            BoneMaskType::Positive => 0.,
            BoneMaskType::Negative => 1.,
        };
        self.weights.get(bone_id).copied().unwrap_or(default)
    }

    pub fn contains(&self, bone_id: &BoneId) -> bool {
        self.bone_weight(bone_id) > 0.
    }

    pub fn base(&self) -> BoneMaskType {
        self.base
    }

    pub fn all() -> Self {
        Self {
            names: Default::default(),
            weights: Default::default(),
            base: BoneMaskType::Negative,
        }
    }

    pub fn none() -> Self {
        Self {
            names: Default::default(),
            weights: Default::default(),
            base: BoneMaskType::Positive,
        }
    }

    /// Only the named bones, at full weight.
    pub fn only<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        let mut mask = Self::none();
        for name in names {
            mask.set_weight(name.as_ref(), 1.);
        }
        mask
    }

    /// Every bone except the named ones.
    pub fn except<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        let mut mask = Self::all();
        for name in names {
            mask.set_weight(name.as_ref(), 0.);
        }
        mask
    }

    /// Skeleton bones whose name matches `pattern`, at full weight.
    pub fn matching(pattern: &Regex, skeleton: &Skeleton) -> Self {
        Self::only(skeleton.bones_matching(pattern))
    }

    pub fn set_weight(&mut self, name: &str, weight: f32) {
        let id = BoneId::from_name(name);
        self.names.insert(id, name.to_string());
        self.weights.insert(id, weight);
    }

    pub fn with_weight(mut self, name: &str, weight: f32) -> Self {
        self.set_weight(name, weight);
        self
    }
}

#[derive(Reflect, Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[reflect(Default)]
pub enum BoneMaskType {
    /// Listed bones get their weight, every other bone gets zero
    #[default]
    Positive,
    /// Listed bones get their weight, every other bone gets one
    Negative,
}

#[derive(Serialize, Deserialize)]
pub struct BoneMaskSerial {
    pub weights: HashMap<String, f32>,
    pub base: BoneMaskType,
}

impl BoneMaskSerial {
    pub fn from_value(value: &BoneMask) -> Self {
        Self {
            weights: value
                .weights
                .iter()
                .filter_map(|(bone_id, weight)| Some((value.names.get(bone_id)?.clone(), *weight)))
                .collect(),
            base: value.base,
        }
    }

    pub fn to_value(&self) -> BoneMask {
        let mut mask = BoneMask {
            names: Default::default(),
            weights: Default::default(),
            base: self.base,
        };
        for (name, weight) in &self.weights {
            mask.set_weight(name, *weight);
        }
        mask
    }
}

impl Serialize for BoneMask {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        BoneMaskSerial::from_value(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoneMask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(BoneMaskSerial::deserialize(deserializer)?.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::transform::components::Transform;

    #[test]
    fn all_and_none() {
        let hip = BoneId::from_name("hip");
        assert!(BoneMask::all().contains(&hip));
        assert!(!BoneMask::none().contains(&hip));
        assert_eq!(BoneMask::default(), BoneMask::all());
    }

    #[test]
    fn only_and_except() {
        let hip = BoneId::from_name("hip");
        let spine = BoneId::from_name("spine");

        let only = BoneMask::only(["hip"]);
        assert!(only.contains(&hip));
        assert!(!only.contains(&spine));

        let except = BoneMask::except(["hip"]);
        assert!(!except.contains(&hip));
        assert!(except.contains(&spine));
    }

    #[test]
    fn partial_weight() {
        let mask = BoneMask::none().with_weight("arm", 0.25);
        assert_eq!(mask.bone_weight(&BoneId::from_name("arm")), 0.25);
    }

    #[test]
    fn matching_skeleton_bones() {
        let mut skeleton = Skeleton::default();
        skeleton.add_root("hip", Transform::IDENTITY);
        skeleton
            .add_bone("left_leg", Some("hip"), Transform::IDENTITY)
            .unwrap();
        skeleton
            .add_bone("right_leg", Some("hip"), Transform::IDENTITY)
            .unwrap();

        let mask = BoneMask::matching(&Regex::new("_leg$").unwrap(), &skeleton);
        assert!(mask.contains(&BoneId::from_name("left_leg")));
        assert!(mask.contains(&BoneId::from_name("right_leg")));
        assert!(!mask.contains(&BoneId::from_name("hip")));
    }

    #[test]
    fn serializes_by_name() {
        let mask = BoneMask::except(["hip"]);
        let text = ron::to_string(&mask).unwrap();
        assert!(text.contains("hip"));
        let back: BoneMask = ron::from_str(&text).unwrap();
        assert_eq!(back, mask);
    }
}
