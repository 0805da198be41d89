pub mod cubic;
pub mod linear;

pub use cubic::*;
pub use linear::*;
