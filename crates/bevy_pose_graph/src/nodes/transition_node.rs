use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use bevy_pose_graph_core::{
    errors::{GraphError, GraphResult},
    pose::Pose,
};

use crate::graph::{NodeLike, PassContext};

/// Forwards exactly one of its inputs. Switching inputs is a hard cut, smoothing it out is left to
/// an inertialization node placed above this one.
#[derive(Reflect, Clone, Debug, Default)]
#[reflect(Default)]
pub struct TransitionNode {
    transition_count: usize,
    current: usize,
}

impl TransitionNode {
    pub fn new(transition_count: usize) -> Self {
        Self {
            transition_count,
            current: 0,
        }
    }

    pub fn transition_count(&self) -> usize {
        self.transition_count
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Selects input `index`. Returns whether the selection changed.
    pub fn transition_to(&mut self, index: usize) -> GraphResult<bool> {
        if index >= self.transition_count {
            return Err(GraphError::InputOutOfRange {
                node: self.display_name(),
                input: index,
                count: self.transition_count,
            });
        }
        let changed = self.current != index;
        self.current = index;
        Ok(changed)
    }
}

impl NodeLike for TransitionNode {
    fn input_count(&self) -> usize {
        self.transition_count
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        if self.current >= ctx.input_count() {
            return Ok(());
        }
        ctx.process_input(self.current, target)
    }

    fn set_input_count(&mut self, count: usize) -> bool {
        self.transition_count = count;
        self.current = self.current.min(count.saturating_sub(1));
        true
    }

    fn display_name(&self) -> String {
        "⇆ Transition".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{GraphResources, PoseGraph},
        nodes::PoseNode,
    };
    use bevy::transform::components::Transform;
    use bevy_pose_graph_core::{
        config::GraphConfig, edge_data::events::EventQueue, pose::BoneId,
    };

    fn pose(x: f32) -> Pose {
        Pose::from_transforms([(BoneId::from_name("hip"), Transform::from_xyz(x, 0., 0.))])
    }

    fn evaluate(graph: &mut PoseGraph) -> Pose {
        let base = pose(0.);
        let config = GraphConfig::default();
        let mut target = Pose::default();
        graph
            .evaluate(
                GraphResources::new(&base, None, &config),
                &mut EventQueue::default(),
                &mut target,
                1. / 60.,
            )
            .unwrap();
        target
    }

    #[test]
    fn selects_exactly_one_input() {
        let mut graph = PoseGraph::new();
        let transition = graph
            .connect_node_to_root(TransitionNode::new(3), "transition")
            .unwrap();
        for i in 0..3 {
            graph
                .connect_node(PoseNode::new(pose(i as f32)), transition, format!("pose_{i}"), i)
                .unwrap();
        }

        for i in [2, 0, 1] {
            let changed = graph
                .node_mut::<TransitionNode>(transition)
                .unwrap()
                .transition_to(i)
                .unwrap();
            assert!(changed);

            let mut alone = PoseGraph::new();
            alone
                .connect_node_to_root(PoseNode::new(pose(i as f32)), "pose")
                .unwrap();
            assert_eq!(evaluate(&mut graph), evaluate(&mut alone));
        }
    }

    #[test]
    fn transition_to_reports_changes() {
        let mut node = TransitionNode::new(2);
        assert_eq!(node.transition_to(0), Ok(false));
        assert_eq!(node.transition_to(1), Ok(true));
        assert_eq!(node.transition_to(1), Ok(false));
        assert!(matches!(
            node.transition_to(2),
            Err(GraphError::InputOutOfRange { input: 2, count: 2, .. })
        ));
        assert_eq!(node.current(), 1);
    }

    #[test]
    fn unconnected_input_leaves_target() {
        let mut graph = PoseGraph::new();
        graph
            .connect_node_to_root(TransitionNode::new(2), "transition")
            .unwrap();
        assert!(evaluate(&mut graph).is_empty());
    }
}
