mod pose;
mod position;
mod rotation;

pub use pose::*;
pub use position::*;
pub use rotation::*;
