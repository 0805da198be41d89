//! # Bevy Pose Graph
//!
//! **Bevy Pose Graph** evaluates a tree of pose nodes once per frame for
//! [Bevy](https://bevyengine.org/) characters.
//!
//! ## Introduction
//!
//! A [`PoseGraph`] is an arena of uniquely named nodes hanging from a root node. Each node writes
//! a sparse [`Pose`] and may pull poses from its inputs. Bones and channels that no node writes
//! resolve through the base pose, which is the rest pose of the character's skeleton.
//!
//! A [`PoseGraphController`] component owns a graph together with a skeleton and a
//! [`GraphConfig`]. Add [`PoseGraphPlugin`] to advance controllers automatically and write the
//! resulting local transforms to the bone entities registered with
//! [`PoseGraphController::set_bone_entity`].
//!
//! ```ignore
//! let mut controller = PoseGraphController::new(PoseGraph::new(), GraphConfig::default())
//!     .with_skeleton(skeleton);
//! controller.connect_node_to_root(InertializationNode::default(), "smooth")?;
//! controller.connect_node(TransitionNode::new(2), "smooth", "locomotion", 0)?;
//! controller.connect_node(ClipNode::new(idle), "locomotion", "idle", 0)?;
//! controller.connect_node(ClipNode::new(walk), "locomotion", "walk", 1)?;
//!
//! // Later, when the character starts walking
//! if controller.transition_to("locomotion", 1)? {
//!     controller.inertialize("smooth", None, BoneMask::all())?;
//! }
//! ```
//!
//! ## Nodes
//!
//! - [`PoseNode`]: Outputs a fixed pose.
//! - [`ClipNode`]: Plays back a keyframed animation, looping or once.
//! - [`OneShotNode`]: Plays an animation once each time it is triggered.
//! - [`WheelLocomotionNode`]: Synthesizes locomotion from animation sets sampled by a virtual
//!   wheel that rolls with the character's velocity.
//! - [`BlendNode`]: Blends two inputs linearly.
//! - [`AddNode`]: Layers an additive input on top of a base input.
//! - [`TransitionNode`]: Forwards one of several inputs.
//! - [`InertializationNode`]: Hides the pop of a transition by decaying the offset between the
//!   old and new poses.
//! - [`IkNode`]: Three bone FABRIK inverse kinematics with an optional pole target.
//! - [`SoftnessNode`]: Lets bones lag behind their animation when the character accelerates.
//! - [`LookAtNode`]: Turns a bone to face a point, with a spring and an angle limit.

pub mod controller;
pub mod graph;
pub mod nodes;
pub mod plugin;

pub mod prelude {
    pub use super::controller::PoseGraphController;
    pub use super::graph::{
        AnimationNode, AnimationNodeType, GraphResources, NodeId, NodeLike, PassContext, PoseGraph,
    };
    pub use super::nodes::*;
    pub use super::plugin::{PoseGraphPlugin, PoseGraphSet};
    pub use bevy_pose_graph_core::{
        animation::{Animation, FloatCurve, InterpolationMethod, Keyframe},
        config::{GraphConfig, PlaybackProcessMode},
        edge_data::{
            bone_mask::BoneMask,
            events::{EventQueue, GraphEvent},
        },
        errors::{GraphError, GraphResult},
        pose::{BoneId, BonePose, Pose},
        skeleton::{Skeleton, SkeletonProvider},
    };
}

#[cfg(doc)]
use prelude::*;
