mod clip;
mod curve;

pub use clip::*;
pub use curve::*;
