use bevy::reflect::prelude::*;
use bevy_pose_graph_core::{errors::GraphResult, pose::Pose};

use super::context::PassContext;
use crate::nodes::{
    AddNode, BlendNode, ClipNode, IkNode, InertializationNode, LookAtNode, OneShotNode, PoseNode,
    RootNode, SoftnessNode, TransitionNode, WheelLocomotionNode,
};

/// Index of a node in its graph's arena
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[reflect(Default)]
pub struct NodeId(pub usize);

pub trait NodeLike: Send + Sync + Reflect {
    /// Number of input slots a freshly added node gets.
    fn input_count(&self) -> usize;

    /// Writes this node's output into `target`. Inputs are pulled through `ctx`.
    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()>;

    /// Called when the graph resizes this node's inputs. Nodes with a fixed arity return false.
    fn set_input_count(&mut self, _count: usize) -> bool {
        false
    }

    /// The name of this node.
    fn display_name(&self) -> String;
}

#[derive(Reflect, Clone, Debug, Default)]
pub struct AnimationNode {
    pub name: String,
    pub inputs: Vec<Option<NodeId>>,
    pub node: AnimationNodeType,
}

impl AnimationNode {
    pub fn new(name: impl Into<String>, node: impl Into<AnimationNodeType>) -> Self {
        let node = node.into();
        let inputs = vec![None; node.map(|n| n.input_count())];
        Self {
            name: name.into(),
            inputs,
            node,
        }
    }

    pub fn is_input_connected(&self, input: usize) -> bool {
        self.inputs.get(input).is_some_and(Option::is_some)
    }
}

#[derive(Reflect, Clone, Debug)]
#[reflect(Default)]
pub enum AnimationNodeType {
    Root(RootNode),

    // --- Pose sources
    // ------------------------------------------------
    Pose(PoseNode),
    Clip(ClipNode),
    OneShot(OneShotNode),
    WheelLocomotion(WheelLocomotionNode),
    // ------------------------------------------------

    // --- Composition
    // ------------------------------------------------
    Blend(BlendNode),
    Add(AddNode),
    Transition(TransitionNode),
    Inertialization(InertializationNode),
    // ------------------------------------------------

    // --- Procedural adjustments
    // ------------------------------------------------
    Ik(IkNode),
    Softness(SoftnessNode),
    LookAt(LookAtNode),
    // ------------------------------------------------
}

impl Default for AnimationNodeType {
    fn default() -> Self {
        Self::Root(RootNode)
    }
}

impl AnimationNodeType {
    pub fn map<O, F>(&self, f: F) -> O
    where
        F: FnOnce(&dyn NodeLike) -> O,
    {
        match self {
            AnimationNodeType::Root(n) => f(n),
            AnimationNodeType::Pose(n) => f(n),
            AnimationNodeType::Clip(n) => f(n),
            AnimationNodeType::OneShot(n) => f(n),
            AnimationNodeType::WheelLocomotion(n) => f(n),
            AnimationNodeType::Blend(n) => f(n),
            AnimationNodeType::Add(n) => f(n),
            AnimationNodeType::Transition(n) => f(n),
            AnimationNodeType::Inertialization(n) => f(n),
            AnimationNodeType::Ik(n) => f(n),
            AnimationNodeType::Softness(n) => f(n),
            AnimationNodeType::LookAt(n) => f(n),
        }
    }

    pub fn map_mut<O, F>(&mut self, f: F) -> O
    where
        F: FnOnce(&mut dyn NodeLike) -> O,
    {
        match self {
            AnimationNodeType::Root(n) => f(n),
            AnimationNodeType::Pose(n) => f(n),
            AnimationNodeType::Clip(n) => f(n),
            AnimationNodeType::OneShot(n) => f(n),
            AnimationNodeType::WheelLocomotion(n) => f(n),
            AnimationNodeType::Blend(n) => f(n),
            AnimationNodeType::Add(n) => f(n),
            AnimationNodeType::Transition(n) => f(n),
            AnimationNodeType::Inertialization(n) => f(n),
            AnimationNodeType::Ik(n) => f(n),
            AnimationNodeType::Softness(n) => f(n),
            AnimationNodeType::LookAt(n) => f(n),
        }
    }

    pub fn inner_reflect(&self) -> &dyn Reflect {
        match self {
            AnimationNodeType::Root(n) => n,
            AnimationNodeType::Pose(n) => n,
            AnimationNodeType::Clip(n) => n,
            AnimationNodeType::OneShot(n) => n,
            AnimationNodeType::WheelLocomotion(n) => n,
            AnimationNodeType::Blend(n) => n,
            AnimationNodeType::Add(n) => n,
            AnimationNodeType::Transition(n) => n,
            AnimationNodeType::Inertialization(n) => n,
            AnimationNodeType::Ik(n) => n,
            AnimationNodeType::Softness(n) => n,
            AnimationNodeType::LookAt(n) => n,
        }
    }

    pub fn inner_reflect_mut(&mut self) -> &mut dyn Reflect {
        match self {
            AnimationNodeType::Root(n) => n,
            AnimationNodeType::Pose(n) => n,
            AnimationNodeType::Clip(n) => n,
            AnimationNodeType::OneShot(n) => n,
            AnimationNodeType::WheelLocomotion(n) => n,
            AnimationNodeType::Blend(n) => n,
            AnimationNodeType::Add(n) => n,
            AnimationNodeType::Transition(n) => n,
            AnimationNodeType::Inertialization(n) => n,
            AnimationNodeType::Ik(n) => n,
            AnimationNodeType::Softness(n) => n,
            AnimationNodeType::LookAt(n) => n,
        }
    }
}

macro_rules! impl_from_node {
    ($($variant:ident => $node:ty),* $(,)?) => {
        $(
            impl From<$node> for AnimationNodeType {
                fn from(node: $node) -> Self {
                    AnimationNodeType::$variant(node)
                }
            }
        )*
    };
}

impl_from_node! {
    Root => RootNode,
    Pose => PoseNode,
    Clip => ClipNode,
    OneShot => OneShotNode,
    WheelLocomotion => WheelLocomotionNode,
    Blend => BlendNode,
    Add => AddNode,
    Transition => TransitionNode,
    Inertialization => InertializationNode,
    Ik => IkNode,
    Softness => SoftnessNode,
    LookAt => LookAtNode,
}
