use bevy_pose_graph_core::{
    config::GraphConfig,
    edge_data::events::{EventQueue, GraphEvent},
    errors::{GraphError, GraphResult},
    pose::Pose,
    skeleton::SkeletonProvider,
};

use super::node::{AnimationNode, NodeId};

/// Read-only data shared by every node during a pass.
// Implements Copy because it's just immutable references
#[derive(Clone, Copy)]
pub struct GraphResources<'a> {
    pub base_pose: &'a Pose,
    pub skeleton: Option<&'a dyn SkeletonProvider>,
    pub config: &'a GraphConfig,
}

impl<'a> GraphResources<'a> {
    pub fn new(
        base_pose: &'a Pose,
        skeleton: Option<&'a dyn SkeletonProvider>,
        config: &'a GraphConfig,
    ) -> Self {
        Self {
            base_pose,
            skeleton,
            config,
        }
    }
}

/// What a node sees while it is being processed: its own inputs, the shared resources and the
/// rest of the arena, through which inputs are evaluated.
pub struct PassContext<'a> {
    arena: &'a mut [Option<AnimationNode>],
    inputs: &'a [Option<NodeId>],
    node_name: &'a str,
    resources: GraphResources<'a>,
    events: &'a mut EventQueue,
    delta: f32,
}

impl<'a> PassContext<'a> {
    /// Evaluates input `slot` into `target` with this pass's delta.
    pub fn process_input(&mut self, slot: usize, target: &mut Pose) -> GraphResult<()> {
        self.process_input_with_delta(slot, target, self.delta)
    }

    /// Evaluates input `slot` into `target`. An unconnected slot leaves `target` untouched.
    pub fn process_input_with_delta(
        &mut self,
        slot: usize,
        target: &mut Pose,
        delta: f32,
    ) -> GraphResult<()> {
        let input = *self
            .inputs
            .get(slot)
            .ok_or_else(|| GraphError::InputOutOfRange {
                node: self.node_name.to_string(),
                input: slot,
                count: self.inputs.len(),
            })?;

        let Some(child) = input else {
            return Ok(());
        };

        process_node(
            &mut *self.arena,
            child,
            self.resources,
            &mut *self.events,
            target,
            delta,
        )
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_input_connected(&self, slot: usize) -> bool {
        self.inputs.get(slot).is_some_and(Option::is_some)
    }

    pub fn node_name(&self) -> &str {
        self.node_name
    }

    pub fn base_pose(&self) -> &'a Pose {
        self.resources.base_pose
    }

    pub fn skeleton(&self) -> Option<&'a dyn SkeletonProvider> {
        self.resources.skeleton
    }

    pub fn config(&self) -> &'a GraphConfig {
        self.resources.config
    }

    pub fn resources(&self) -> GraphResources<'a> {
        self.resources
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn emit(&mut self, event: GraphEvent) {
        self.events.push(event);
    }
}

/// Runs node `id` and, through it, its inputs. The node is taken out of the arena while it runs,
/// so reaching it again before it returns means the graph has a cycle.
pub(crate) fn process_node(
    arena: &mut [Option<AnimationNode>],
    id: NodeId,
    resources: GraphResources,
    events: &mut EventQueue,
    target: &mut Pose,
    delta: f32,
) -> GraphResult<()> {
    let mut node = arena
        .get_mut(id.0)
        .ok_or(GraphError::MissingNodeId(id.0))?
        .take()
        .ok_or(GraphError::CycleDetected(id.0))?;

    let result = {
        let AnimationNode { name, inputs, node } = &mut node;
        let mut ctx = PassContext {
            arena: &mut *arena,
            inputs: inputs.as_slice(),
            node_name: name.as_str(),
            resources,
            events,
            delta,
        };
        node.map_mut(|n| n.process(&mut ctx, target))
    };

    arena[id.0] = Some(node);
    result
}
