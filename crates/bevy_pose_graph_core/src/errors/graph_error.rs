use bevy::prelude::*;
use thiserror::Error;

/// Possible errors that can be produced while building or evaluating a pose graph
#[non_exhaustive]
#[derive(Debug, Error, Reflect, Clone, PartialEq)]
pub enum GraphError {
    #[error("Input slot {input} is out of range for node {node:?} with {count} inputs")]
    InputOutOfRange {
        node: String,
        input: usize,
        count: usize,
    },
    #[error("Input slot {input} of node {node:?} is already connected")]
    InputAlreadyConnected { node: String, input: usize },
    #[error("Node {0:?} already feeds another input")]
    NodeAlreadyConnected(String),
    #[error("Cannot resize the inputs of node {0:?} while any of them is connected")]
    InputsConnected(String),
    #[error("Node {0:?} has a fixed number of inputs")]
    FixedInputCount(String),
    #[error("No node with id {0}")]
    MissingNodeId(usize),
    #[error("No node named {0:?}")]
    MissingNodeName(String),
    #[error("A node named {0:?} already exists")]
    DuplicateNodeName(String),
    #[error("Tried to access node as incorrect type: expected {0}, got {1}")]
    MismatchedNodeType(String, String),
    #[error("Node with id {0} was re-entered during evaluation")]
    CycleDetected(usize),
    #[error("Inertialization requires three poses, missing {0}")]
    MissingInertializationPose(String),
    #[error("Locomotion blend position {0} is outside of [0, 1]")]
    LocomotionPositionOutOfRange(f32),
    #[error("Bone {0:?} is not part of the skeleton")]
    MissingBone(String),
    #[error("Bone {bone:?} cannot be parented to {parent:?}, which is itself or one of its descendants")]
    InvalidBoneParent { bone: String, parent: String },
}

pub type GraphResult<T> = Result<T, GraphError>;
