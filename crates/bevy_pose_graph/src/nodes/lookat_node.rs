use bevy::{
    math::{Quat, Vec3},
    reflect::{Reflect, std_traits::ReflectDefault},
};
use bevy_pose_graph_core::{
    errors::GraphResult,
    pose::{BoneId, Pose},
    space_conversion::SpaceConversion,
    springs::simple_spring_damper_exact_quat,
};

use crate::graph::{NodeLike, PassContext};

#[derive(Reflect, Clone, Copy, Debug, Default)]
struct RotationSpring {
    rotation: Quat,
    velocity: Vec3,
}

/// Turns a bone so that its forward axis faces a point in skeleton space, keeping it upright
/// about `rotation_axis`.
#[derive(Reflect, Clone, Debug)]
#[reflect(Default)]
pub struct LookAtNode {
    pub bone_name: String,
    /// Skeleton space direction the bone faces in the base pose
    pub skeleton_forward: Vec3,
    /// Skeleton space up axis the bone is kept aligned with
    pub rotation_axis: Vec3,
    pub target_position: Vec3,
    pub max_angle_degrees: f32,
    pub spring_halflife: f32,
    pub influence: f32,
    spring: Option<RotationSpring>,
}

impl Default for LookAtNode {
    fn default() -> Self {
        Self {
            bone_name: String::new(),
            skeleton_forward: Vec3::Z,
            rotation_axis: Vec3::Y,
            target_position: Vec3::ZERO,
            max_angle_degrees: 90.,
            spring_halflife: 0.1,
            influence: 1.,
            spring: None,
        }
    }
}

impl LookAtNode {
    pub fn new(bone_name: impl Into<String>) -> Self {
        Self {
            bone_name: bone_name.into(),
            ..Default::default()
        }
    }

    /// Drops the spring state, so the next pass starts from the animated rotation.
    pub fn reset(&mut self) {
        self.spring = None;
    }
}

impl NodeLike for LookAtNode {
    fn input_count(&self) -> usize {
        1
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        ctx.process_input(0, target)?;

        if self.influence == 0. {
            return Ok(());
        }
        let Some(skeleton) = ctx.skeleton() else {
            return Ok(());
        };
        let bone = BoneId::from_name(&self.bone_name);
        if !skeleton.has_bone(&bone) {
            return Ok(());
        }
        let base = ctx.base_pose();

        let base_rotation = SpaceConversion::new(base, base, skeleton)
            .skeleton_transform_of_bone(bone)
            .rotation;
        let bone_forward = base_rotation.inverse() * self.skeleton_forward;
        let bone_up = base_rotation.inverse() * self.rotation_axis;

        let (current, parent_rotation) = {
            let conversion = SpaceConversion::new(target, base, skeleton);
            (
                conversion.skeleton_transform_of_bone(bone),
                conversion.parent_skeleton_transform(bone).rotation,
            )
        };

        let Some(target_direction) = (self.target_position - current.translation).try_normalize()
        else {
            return Ok(());
        };
        let Some(current_forward) = (current.rotation * bone_forward).try_normalize() else {
            return Ok(());
        };

        let mut look_rotation =
            Quat::from_rotation_arc(current_forward, target_direction) * current.rotation;
        if let (Some(up), Some(axis)) = (
            (look_rotation * bone_up).try_normalize(),
            self.rotation_axis.try_normalize(),
        ) {
            look_rotation = Quat::from_rotation_arc(up, axis) * look_rotation;
        }
        look_rotation = look_rotation.normalize();

        let angle = current.rotation.angle_between(look_rotation);
        let max_angle = self.max_angle_degrees.to_radians();
        if angle > max_angle && angle > 0. {
            look_rotation = current.rotation.slerp(look_rotation, max_angle / angle);
        }

        let spring = self.spring.get_or_insert(RotationSpring {
            rotation: current.rotation,
            velocity: Vec3::ZERO,
        });
        simple_spring_damper_exact_quat(
            &mut spring.rotation,
            &mut spring.velocity,
            look_rotation,
            self.spring_halflife,
            ctx.delta(),
        );

        let rotation = current.rotation.slerp(spring.rotation, self.influence);
        target.set_bone_rotation(bone, (parent_rotation.inverse() * rotation).normalize());

        Ok(())
    }

    fn display_name(&self) -> String {
        "◉ Look At".into()
    }
}
