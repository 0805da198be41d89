use bevy::{
    log::warn,
    math::{FloatExt, Vec3},
    reflect::{Reflect, std_traits::ReflectDefault},
};
use bevy_pose_graph_core::{
    animation::{Animation, InterpolationMethod},
    edge_data::bone_mask::BoneMask,
    errors::{GraphError, GraphResult},
    pose::{BoneId, Pose},
};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::graph::{NodeLike, PassContext};

pub const LEFT_FOOT_GROUNDED_CURVE: &str = "left_ik_grounded";
pub const RIGHT_FOOT_GROUNDED_CURVE: &str = "right_ik_grounded";

/// Curve values at or above this count as a locked foot
const FOOT_LOCK_THRESHOLD: f32 = 0.999;

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[reflect(Default)]
pub enum LocomotionSetType {
    /// Sampled by the wheel's rotation, so playback follows the distance travelled
    #[default]
    Wheel,
    /// Sampled by elapsed time
    ConstantVelocity,
}

/// One animation the locomotion node can blend to, placed at `x_pos` on the blend axis.
#[derive(Reflect, Clone, Debug, Default)]
#[reflect(Default)]
pub struct LocomotionSet {
    pub x_pos: f32,
    /// Distance covered by one step
    pub step_length: f32,
    pub animation: Animation,
    pub set_type: LocomotionSetType,
    pub bounce_height: f32,
}

/// Procedural locomotion driven by a virtual surveyor wheel. The wheel rolls with the character's
/// velocity and its rotation picks the point in the step cycle, so feet don't slide when the
/// speed changes.
#[derive(Reflect, Clone, Debug)]
#[reflect(Default)]
pub struct WheelLocomotionNode {
    locomotion_sets: Vec<LocomotionSet>,
    x_blend: f32,
    pub linear_velocity: Vec3,
    /// Bone that receives the vertical bounce
    pub root_bone: Option<String>,
    pub interpolation: InterpolationMethod,
    time: f32,
    wheel_angle: f32,
    current_step_length: f32,
    foot_grounded: [f32; 2],
}

impl Default for WheelLocomotionNode {
    fn default() -> Self {
        Self {
            locomotion_sets: Vec::new(),
            x_blend: 0.,
            linear_velocity: Vec3::ZERO,
            root_bone: None,
            interpolation: InterpolationMethod::Linear,
            time: 0.,
            wheel_angle: 0.,
            current_step_length: 0.,
            foot_grounded: [0.; 2],
        }
    }
}

/// The sets contributing to a pass and the weight of the second one
struct SetSelection<'a> {
    first: &'a LocomotionSet,
    second: Option<&'a LocomotionSet>,
    weight: f32,
}

impl<'a> SetSelection<'a> {
    fn single(set: &'a LocomotionSet) -> Self {
        Self {
            first: set,
            second: None,
            weight: 0.,
        }
    }

    fn lerp(&self, f: impl Fn(&LocomotionSet) -> f32) -> f32 {
        match self.second {
            Some(second) => f(self.first).lerp(f(second), self.weight),
            None => f(self.first),
        }
    }
}

impl WheelLocomotionNode {
    /// Registers a set, keeping sets ordered by their position on the blend axis.
    pub fn add_locomotion_set(&mut self, set: LocomotionSet) -> GraphResult<()> {
        if !(0. ..=1.).contains(&set.x_pos) {
            return Err(GraphError::LocomotionPositionOutOfRange(set.x_pos));
        }
        let index = self
            .locomotion_sets
            .partition_point(|s| s.x_pos <= set.x_pos);
        self.locomotion_sets.insert(index, set);
        Ok(())
    }

    pub fn locomotion_sets(&self) -> &[LocomotionSet] {
        &self.locomotion_sets
    }

    pub fn set_x_blend(&mut self, x_blend: f32) -> GraphResult<()> {
        if !(0. ..=1.).contains(&x_blend) {
            return Err(GraphError::LocomotionPositionOutOfRange(x_blend));
        }
        self.x_blend = x_blend;
        Ok(())
    }

    pub fn x_blend(&self) -> f32 {
        self.x_blend
    }

    pub fn wheel_angle(&self) -> f32 {
        self.wheel_angle
    }

    /// Position in the step cycle, in [0, 1). One cycle covers half a wheel revolution.
    pub fn cycle(&self) -> f32 {
        (self.wheel_angle % PI) / PI
    }

    pub fn current_step_length(&self) -> f32 {
        self.current_step_length
    }

    /// Left and right foot ground contact from the last pass
    pub fn foot_grounded(&self) -> [f32; 2] {
        self.foot_grounded
    }

    pub fn foot_locked(&self) -> [bool; 2] {
        self.foot_grounded.map(|g| g >= FOOT_LOCK_THRESHOLD)
    }

    fn select_sets(&self) -> Option<SetSelection<'_>> {
        let first = self.locomotion_sets.first()?;
        let last = self.locomotion_sets.last()?;

        if self.locomotion_sets.len() == 1 || self.x_blend <= first.x_pos {
            return Some(SetSelection::single(first));
        }
        if self.x_blend >= last.x_pos {
            return Some(SetSelection::single(last));
        }

        let index = self
            .locomotion_sets
            .partition_point(|s| s.x_pos <= self.x_blend)
            .saturating_sub(1);
        let first = &self.locomotion_sets[index];
        let second = self.locomotion_sets.get(index + 1)?;
        let span = second.x_pos - first.x_pos;
        let weight = if span > 0. {
            (self.x_blend - first.x_pos) / span
        } else {
            0.
        };
        Some(SetSelection {
            first,
            second: Some(second),
            weight,
        })
    }

    fn sample_time(&self, set: &LocomotionSet) -> f32 {
        let length = set.animation.length();
        match set.set_type {
            LocomotionSetType::Wheel => self.cycle() * length,
            LocomotionSetType::ConstantVelocity if length > 0. => self.time % length,
            LocomotionSetType::ConstantVelocity => 0.,
        }
    }

    fn sample_set(&self, set: &LocomotionSet, base: &Pose, target: &mut Pose) {
        if set.animation.keyframe_count() == 0 {
            warn!("Locomotion set at {} has no animation", set.x_pos);
            return;
        }
        set.animation
            .interpolate(self.sample_time(set), base, target, self.interpolation);
    }

    fn sample_grounded(&self, selection: &SetSelection, curve: &str) -> f32 {
        selection
            .lerp(|set| set.animation.sample_curve(curve, self.sample_time(set)))
            .min(1.)
    }
}

impl NodeLike for WheelLocomotionNode {
    fn input_count(&self) -> usize {
        0
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        let delta = ctx.delta();
        self.time += delta;

        let (step_length, bounce_height) = match self.select_sets() {
            Some(selection) => (
                selection.lerp(|s| s.step_length),
                selection.lerp(|s| s.bounce_height),
            ),
            None => return Ok(()),
        };
        self.current_step_length = step_length;

        let circumference = step_length * 4.;
        if circumference > 0. {
            let travelled = self.linear_velocity.length() * delta;
            self.wheel_angle += travelled / circumference * TAU;
        }

        let base = ctx.base_pose();
        let Some(selection) = self.select_sets() else {
            return Ok(());
        };

        self.sample_set(selection.first, base, target);
        if let Some(second) = selection.second {
            let mut second_pose = Pose::default();
            self.sample_set(second, base, &mut second_pose);
            *target = target.blend(&second_pose, base, selection.weight, &BoneMask::all());
        }

        let foot_grounded = [
            self.sample_grounded(&selection, LEFT_FOOT_GROUNDED_CURVE),
            self.sample_grounded(&selection, RIGHT_FOOT_GROUNDED_CURVE),
        ];
        self.foot_grounded = foot_grounded;

        if let Some(root_bone) = &self.root_bone {
            let bone = BoneId::from_name(root_bone);
            let bounce = ((TAU * 2. * self.cycle() + 3. * PI / 2.).sin() + 1.) / 2. * bounce_height;
            let mut translation = target.bone_translation(&bone, base);
            translation.y += bounce;
            target.set_bone_translation(bone, translation);
        }

        Ok(())
    }

    fn display_name(&self) -> String {
        "◎ Wheel Locomotion".into()
    }
}
