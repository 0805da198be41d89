mod add_node;
mod blend_node;
mod clip_node;
mod ik_node;
mod inertialization_node;
mod lookat_node;
mod oneshot_node;
mod pose_node;
mod root_node;
mod softness_node;
mod transition_node;
mod wheel_locomotion_node;

pub use add_node::*;
pub use blend_node::*;
pub use clip_node::*;
pub use ik_node::*;
pub use inertialization_node::*;
pub use lookat_node::*;
pub use oneshot_node::*;
pub use pose_node::*;
pub use root_node::*;
pub use softness_node::*;
pub use transition_node::*;
pub use wheel_locomotion_node::*;
