pub mod bone_mask;
pub mod events;

pub use bone_mask::*;
pub use events::*;
