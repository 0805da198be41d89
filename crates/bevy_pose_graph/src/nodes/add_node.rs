use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use bevy_pose_graph_core::{edge_data::bone_mask::BoneMask, errors::GraphResult, pose::Pose};

use crate::graph::{NodeLike, PassContext};

/// Layers an additive pose on top of a base input.
#[derive(Reflect, Clone, Debug, Default)]
#[reflect(Default)]
pub struct AddNode {
    pub add_amount: f32,
    pub bone_mask: BoneMask,
}

impl AddNode {
    pub const IN_BASE: usize = 0;
    pub const IN_ADDITIVE: usize = 1;

    pub fn new(add_amount: f32) -> Self {
        Self {
            add_amount,
            ..Default::default()
        }
    }

    pub fn with_bone_mask(mut self, bone_mask: BoneMask) -> Self {
        self.bone_mask = bone_mask;
        self
    }
}

impl NodeLike for AddNode {
    fn input_count(&self) -> usize {
        2
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        ctx.process_input(Self::IN_BASE, target)?;
        if self.add_amount == 0. {
            return Ok(());
        }

        let mut additive = Pose::default();
        ctx.process_input(Self::IN_ADDITIVE, &mut additive)?;
        target.add(&additive, ctx.base_pose(), self.add_amount, &self.bone_mask);
        Ok(())
    }

    fn display_name(&self) -> String {
        "+ Add".into()
    }
}
