pub mod context;
pub mod node;
pub mod pose_graph;

pub use context::{GraphResources, PassContext};
pub use node::*;
pub use pose_graph::PoseGraph;
