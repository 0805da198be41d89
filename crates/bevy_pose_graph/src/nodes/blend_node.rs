use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use bevy_pose_graph_core::{edge_data::bone_mask::BoneMask, errors::GraphResult, pose::Pose};

use crate::graph::{NodeLike, PassContext};

/// Linear mix of two inputs. Both inputs are evaluated every pass so that they stay in sync, even
/// while the blend amount is 0.
#[derive(Reflect, Clone, Debug, Default)]
#[reflect(Default)]
pub struct BlendNode {
    pub blend_amount: f32,
    pub bone_mask: BoneMask,
}

impl BlendNode {
    pub const IN_POSE_A: usize = 0;
    pub const IN_POSE_B: usize = 1;

    pub fn new(blend_amount: f32) -> Self {
        Self {
            blend_amount,
            ..Default::default()
        }
    }

    pub fn with_bone_mask(mut self, bone_mask: BoneMask) -> Self {
        self.bone_mask = bone_mask;
        self
    }
}

impl NodeLike for BlendNode {
    fn input_count(&self) -> usize {
        2
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        ctx.process_input(Self::IN_POSE_A, target)?;
        let mut second = Pose::default();
        ctx.process_input(Self::IN_POSE_B, &mut second)?;

        *target = target.blend(&second, ctx.base_pose(), self.blend_amount, &self.bone_mask);
        Ok(())
    }

    fn display_name(&self) -> String {
        "∑ Blend".into()
    }
}
