use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use bevy_pose_graph_core::{errors::GraphResult, pose::Pose};

use crate::graph::{NodeLike, PassContext};

/// Entry point of a graph. Forwards its single input.
#[derive(Reflect, Clone, Copy, Debug, Default)]
#[reflect(Default)]
pub struct RootNode;

impl NodeLike for RootNode {
    fn input_count(&self) -> usize {
        1
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        ctx.process_input(0, target)
    }

    fn display_name(&self) -> String {
        "Root".into()
    }
}
