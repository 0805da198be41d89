use bevy::{platform::collections::HashMap, reflect::prelude::*};
use bevy_pose_graph_core::{
    edge_data::events::EventQueue,
    errors::{GraphError, GraphResult},
    pose::Pose,
};
use std::any::type_name;

use super::{
    context::{GraphResources, process_node},
    node::{AnimationNode, AnimationNodeType, NodeId, NodeLike},
};
use crate::nodes::RootNode;

/// Arena of uniquely named nodes. Every node feeds at most one input slot, so the graph is a tree
/// hanging from the root node.
#[derive(Reflect, Clone, Debug)]
#[reflect(Default)]
pub struct PoseGraph {
    nodes: Vec<Option<AnimationNode>>,
    names: HashMap<String, NodeId>,
    root: NodeId,
}

impl Default for PoseGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseGraph {
    pub const ROOT: &'static str = "root";

    pub fn new() -> Self {
        let mut names = HashMap::default();
        names.insert(Self::ROOT.to_string(), NodeId(0));
        Self {
            nodes: vec![Some(AnimationNode::new(Self::ROOT, RootNode))],
            names,
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        node: impl Into<AnimationNodeType>,
    ) -> GraphResult<NodeId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(GraphError::DuplicateNodeName(name));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(AnimationNode::new(name.clone(), node)));
        self.names.insert(name, id);
        Ok(id)
    }

    /// Feeds the output of `from` into input slot `input` of `to`.
    pub fn connect(&mut self, from: NodeId, to: NodeId, input: usize) -> GraphResult<()> {
        self.check_free_slot(to, input)?;
        let from_node = self.get_node(from)?;
        if self.is_connected(from) {
            return Err(GraphError::NodeAlreadyConnected(from_node.name.clone()));
        }
        self.get_node_mut(to)?.inputs[input] = Some(from);
        Ok(())
    }

    /// Adds `node` under `name` and connects it to input slot `input` of `to`. Nothing is added
    /// when the slot cannot take it.
    pub fn connect_node(
        &mut self,
        node: impl Into<AnimationNodeType>,
        to: NodeId,
        name: impl Into<String>,
        input: usize,
    ) -> GraphResult<NodeId> {
        self.check_free_slot(to, input)?;
        let id = self.add_node(name, node)?;
        self.connect(id, to, input)?;
        Ok(id)
    }

    pub fn connect_node_to_root(
        &mut self,
        node: impl Into<AnimationNodeType>,
        name: impl Into<String>,
    ) -> GraphResult<NodeId> {
        self.connect_node(node, self.root, name, 0)
    }

    /// Resizes the inputs of a node that accepts it. Only allowed while none of its inputs are
    /// connected.
    pub fn set_input_count(&mut self, id: NodeId, count: usize) -> GraphResult<()> {
        let node = self.get_node_mut(id)?;
        if node.inputs.iter().any(Option::is_some) {
            return Err(GraphError::InputsConnected(node.name.clone()));
        }
        if !node.node.map_mut(|n| n.set_input_count(count)) {
            return Err(GraphError::FixedInputCount(node.name.clone()));
        }
        node.inputs = vec![None; count];
        Ok(())
    }

    pub fn node_id(&self, name: &str) -> GraphResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::MissingNodeName(name.to_string()))
    }

    pub fn get_node(&self, id: NodeId) -> GraphResult<&AnimationNode> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(GraphError::MissingNodeId(id.0))
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> GraphResult<&mut AnimationNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(GraphError::MissingNodeId(id.0))
    }

    pub fn node<T: NodeLike>(&self, id: NodeId) -> GraphResult<&T> {
        let node = self.get_node(id)?;
        node.node
            .inner_reflect()
            .downcast_ref::<T>()
            .ok_or_else(|| mismatched::<T>(node))
    }

    pub fn node_mut<T: NodeLike>(&mut self, id: NodeId) -> GraphResult<&mut T> {
        let node = self.get_node_mut(id)?;
        if node.node.inner_reflect().downcast_ref::<T>().is_none() {
            return Err(mismatched::<T>(node));
        }
        node.node
            .inner_reflect_mut()
            .downcast_mut::<T>()
            .ok_or(GraphError::MissingNodeId(id.0))
    }

    pub fn inputs(&self, id: NodeId) -> GraphResult<&[Option<NodeId>]> {
        Ok(&self.get_node(id)?.inputs)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &AnimationNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    /// Evaluates the graph from its root into `target`.
    pub fn evaluate(
        &mut self,
        resources: GraphResources,
        events: &mut EventQueue,
        target: &mut Pose,
        delta: f32,
    ) -> GraphResult<()> {
        process_node(&mut self.nodes, self.root, resources, events, target, delta)
    }

    fn is_connected(&self, id: NodeId) -> bool {
        self.iter()
            .any(|(_, node)| node.inputs.iter().any(|input| *input == Some(id)))
    }

    fn check_free_slot(&self, to: NodeId, input: usize) -> GraphResult<()> {
        let to_node = self.get_node(to)?;
        match to_node.inputs.get(input) {
            None => Err(GraphError::InputOutOfRange {
                node: to_node.name.clone(),
                input,
                count: to_node.inputs.len(),
            }),
            Some(Some(_)) => Err(GraphError::InputAlreadyConnected {
                node: to_node.name.clone(),
                input,
            }),
            Some(None) => Ok(()),
        }
    }
}

fn mismatched<T>(node: &AnimationNode) -> GraphError {
    GraphError::MismatchedNodeType(
        type_name::<T>().to_string(),
        node.node.map(|n| n.display_name()),
    )
}
