use bevy::{
    ecs::prelude::*,
    log::debug,
    platform::collections::{HashMap, HashSet},
    reflect::prelude::*,
    transform::components::Transform,
};
use bevy_pose_graph_core::{
    config::{GraphConfig, PlaybackProcessMode},
    edge_data::{
        bone_mask::BoneMask,
        events::{EventQueue, GraphEvent},
    },
    errors::{GraphError, GraphResult},
    pose::{BoneId, Pose},
    skeleton::{Skeleton, SkeletonProvider},
};

use crate::{
    graph::{AnimationNodeType, GraphResources, NodeId, NodeLike, PoseGraph},
    nodes::{InertializationNode, TransitionNode},
};

/// Drives a pose graph for one character
#[derive(Component, Default, Reflect)]
#[reflect(Component, Default)]
pub struct PoseGraphController {
    graph: PoseGraph,
    skeleton: Option<Skeleton>,
    /// Rest pose of `skeleton`, used to resolve channels the graph leaves unset
    base_pose: Pose,
    output: Pose,
    config: GraphConfig,
    ignored_bones: HashSet<BoneId>,
    events: EventQueue,
    /// Entities whose `Transform` receives the output of each bone
    bone_entities: HashMap<BoneId, Entity>,
    /// Error that ocurred during graph evaluation in the last frame
    #[reflect(ignore)]
    error: Option<GraphError>,
}

impl PoseGraphController {
    pub fn new(graph: PoseGraph, config: GraphConfig) -> Self {
        Self {
            graph,
            config,
            ..Default::default()
        }
    }

    pub fn with_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.set_skeleton(skeleton);
        self
    }

    /// Replaces the skeleton and rebuilds the base pose from its rest transforms.
    pub fn set_skeleton(&mut self, skeleton: Skeleton) {
        self.base_pose = skeleton.rest_pose();
        self.skeleton = Some(skeleton);
    }

    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    pub fn graph(&self) -> &PoseGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut PoseGraph {
        &mut self.graph
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GraphConfig {
        &mut self.config
    }

    pub fn playback_process_mode(&self) -> PlaybackProcessMode {
        self.config.playback_process_mode
    }

    pub fn base_pose(&self) -> &Pose {
        &self.base_pose
    }

    pub fn output_pose(&self) -> &Pose {
        &self.output
    }

    /// Evaluates the graph into the output pose. Does nothing until a skeleton is set.
    pub fn advance(&mut self, delta: f32) -> GraphResult<()> {
        let Some(skeleton) = &self.skeleton else {
            return Ok(());
        };

        self.output.clear();
        let resources = GraphResources::new(
            &self.base_pose,
            Some(skeleton as &dyn SkeletonProvider),
            &self.config,
        );
        let result = self
            .graph
            .evaluate(resources, &mut self.events, &mut self.output, delta);
        self.error = result.as_ref().err().cloned();
        result
    }

    /// Local transform of every skeleton bone that is not ignored, with channels missing from the
    /// output taken from the base pose.
    pub fn bone_transforms(&self) -> Vec<(BoneId, Transform)> {
        let Some(skeleton) = &self.skeleton else {
            return Vec::new();
        };
        skeleton
            .bone_ids()
            .filter(|bone| !self.ignored_bones.contains(bone))
            .map(|bone| (bone, self.output.bone_transform(&bone, &self.base_pose)))
            .collect()
    }

    pub fn connect_node_to_root(
        &mut self,
        node: impl Into<AnimationNodeType>,
        name: impl Into<String>,
    ) -> GraphResult<NodeId> {
        self.graph.connect_node_to_root(node, name)
    }

    /// Adds `node` and feeds it into input `input` of the node named `to`.
    pub fn connect_node(
        &mut self,
        node: impl Into<AnimationNodeType>,
        to: &str,
        name: impl Into<String>,
        input: usize,
    ) -> GraphResult<NodeId> {
        let to = self.graph.node_id(to)?;
        self.graph.connect_node(node, to, name, input)
    }

    pub fn node_id(&self, name: &str) -> GraphResult<NodeId> {
        self.graph.node_id(name)
    }

    pub fn node<T: NodeLike>(&self, name: &str) -> GraphResult<&T> {
        self.graph.node(self.graph.node_id(name)?)
    }

    pub fn node_mut<T: NodeLike>(&mut self, name: &str) -> GraphResult<&mut T> {
        let id = self.graph.node_id(name)?;
        self.graph.node_mut(id)
    }

    /// Switches the transition node `name` to `index`. Returns whether the active input changed.
    pub fn transition_to(&mut self, name: &str, index: usize) -> GraphResult<bool> {
        let node = self.node_mut::<TransitionNode>(name)?;
        let from = node.current();
        if !node.transition_to(index)? {
            return Ok(false);
        }

        if self.config.log_transitions {
            debug!("Transition {name:?} switched from input {from} to {index}");
        }
        self.events.push(GraphEvent::Transitioned {
            node: name.to_string(),
            from,
            to: index,
        });
        Ok(true)
    }

    /// Requests an inertialization on the node `name`. Without a duration the configured default
    /// is used.
    pub fn inertialize(
        &mut self,
        name: &str,
        duration: Option<f32>,
        bone_mask: BoneMask,
    ) -> GraphResult<()> {
        let node = self.node_mut::<InertializationNode>(name)?;
        match duration {
            Some(duration) => node.inertialize(duration, bone_mask),
            None => node.inertialize_default(bone_mask),
        }
        Ok(())
    }

    /// Leaves these bones out of [`Self::bone_transforms`].
    pub fn ignore_bones<S: AsRef<str>>(&mut self, names: impl IntoIterator<Item = S>) {
        self.ignored_bones
            .extend(names.into_iter().map(|name| BoneId::from_name(name.as_ref())));
    }

    pub fn clear_ignored_bones(&mut self) {
        self.ignored_bones.clear();
    }

    pub fn is_bone_ignored(&self, name: &str) -> bool {
        self.ignored_bones.contains(&BoneId::from_name(name))
    }

    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        self.events.drain().collect()
    }

    pub fn set_bone_entity(&mut self, bone: &str, entity: Entity) {
        self.bone_entities.insert(BoneId::from_name(bone), entity);
    }

    pub fn bone_entity(&self, bone: &BoneId) -> Option<Entity> {
        self.bone_entities.get(bone).copied()
    }

    /// If graph evaluation produced an error in the last frame return the error, otherwise return
    /// `None`.
    pub fn get_error(&self) -> Option<GraphError> {
        self.error.clone()
    }
}
