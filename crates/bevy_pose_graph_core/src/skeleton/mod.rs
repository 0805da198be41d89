mod provider;
#[allow(clippy::module_inception)]
mod skeleton;

pub use provider::*;
pub use skeleton::*;
