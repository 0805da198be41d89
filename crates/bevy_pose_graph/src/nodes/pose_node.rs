use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use bevy_pose_graph_core::{errors::GraphResult, pose::Pose};

use crate::graph::{NodeLike, PassContext};

/// Writes a fixed pose. Only the channels present in the pose are written.
#[derive(Reflect, Clone, Debug, Default)]
#[reflect(Default)]
pub struct PoseNode {
    pub pose: Pose,
}

impl PoseNode {
    pub fn new(pose: Pose) -> Self {
        Self { pose }
    }
}

impl NodeLike for PoseNode {
    fn input_count(&self) -> usize {
        0
    }

    fn process(&mut self, _ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        target.overwrite_from(&self.pose);
        Ok(())
    }

    fn display_name(&self) -> String {
        "Pose".into()
    }
}
