use bevy::{
    math::{Quat, Vec3},
    platform::collections::HashMap,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use bevy_pose_graph_core::{
    errors::GraphResult,
    pose::{BoneId, Pose},
    space_conversion::SpaceConversion,
    springs::critical_spring_damper_exact_vec3,
};

use crate::graph::{NodeLike, PassContext};

#[derive(Reflect, Clone, Copy, Debug, Default)]
struct BoneSpring {
    position: Vec3,
    velocity: Vec3,
}

/// Makes bones lag behind their animation when the character accelerates. Each soft bone is
/// aimed at a spring that follows its first child's animated position.
///
/// The spring is off by default. Until `spring_enabled` is set the node passes its input through
/// unchanged.
#[derive(Reflect, Clone, Debug)]
#[reflect(Default)]
pub struct SoftnessNode {
    bone_softness: Vec<(String, f32)>,
    pub influence: f32,
    pub spring_enabled: bool,
    character_velocity: Vec3,
    prev_character_velocity: Vec3,
    springs: HashMap<String, BoneSpring>,
}

impl Default for SoftnessNode {
    fn default() -> Self {
        Self {
            bone_softness: Vec::new(),
            influence: 1.,
            spring_enabled: false,
            character_velocity: Vec3::ZERO,
            prev_character_velocity: Vec3::ZERO,
            springs: HashMap::default(),
        }
    }
}

impl SoftnessNode {
    /// Sets the softness of a bone. A softness of zero makes the bone rigid again.
    pub fn set_bone_softness(&mut self, bone: impl Into<String>, softness: f32) {
        let bone = bone.into();
        self.springs.remove(&bone);
        self.bone_softness.retain(|(name, _)| *name != bone);
        if softness != 0. {
            self.bone_softness.push((bone, softness));
        }
    }

    pub fn bone_softness(&self, bone: &str) -> f32 {
        self.bone_softness
            .iter()
            .find(|(name, _)| name == bone)
            .map(|(_, softness)| *softness)
            .unwrap_or(0.)
    }

    pub fn set_character_velocity(&mut self, velocity: Vec3) {
        self.character_velocity = velocity;
    }

    /// Forgets spring state so bones snap back to their animation.
    pub fn reset(&mut self) {
        self.springs.clear();
        self.prev_character_velocity = self.character_velocity;
    }
}

impl NodeLike for SoftnessNode {
    fn input_count(&self) -> usize {
        1
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        ctx.process_input(0, target)?;

        let delta = ctx.delta();
        if !self.spring_enabled || self.influence == 0. || delta <= 0. {
            return Ok(());
        }
        let Some(skeleton) = ctx.skeleton() else {
            return Ok(());
        };
        let base = ctx.base_pose();

        let acceleration = ((self.character_velocity - self.prev_character_velocity) / delta)
            .length()
            .min(1.);
        self.prev_character_velocity = self.character_velocity;

        for (name, softness) in &self.bone_softness {
            let bone = BoneId::from_name(name);
            if !skeleton.has_bone(&bone) {
                continue;
            }
            let Some(child) = skeleton.bone_children(&bone).first().copied() else {
                continue;
            };

            let (bone_global, child_position, parent_rotation) = {
                let conversion = SpaceConversion::new(target, base, skeleton);
                (
                    conversion.skeleton_transform_of_bone(bone),
                    conversion.skeleton_transform_of_bone(child).translation,
                    conversion.parent_skeleton_transform(bone).rotation,
                )
            };

            let spring = self.springs.entry(name.clone()).or_insert(BoneSpring {
                position: child_position,
                velocity: Vec3::ZERO,
            });
            critical_spring_damper_exact_vec3(
                &mut spring.position,
                &mut spring.velocity,
                child_position,
                softness * self.influence * acceleration,
                delta,
            );

            let animated = (child_position - bone_global.translation).normalize_or_zero();
            let lagging = (spring.position - bone_global.translation).normalize_or_zero();
            if animated == Vec3::ZERO || lagging == Vec3::ZERO {
                continue;
            }

            let offset = Quat::from_rotation_arc(animated, lagging);
            let rotation = parent_rotation.inverse() * (offset * bone_global.rotation);
            target.set_bone_rotation(bone, rotation.normalize());
        }

        Ok(())
    }

    fn display_name(&self) -> String {
        "~ Softness".into()
    }
}
