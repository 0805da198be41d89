pub mod fabrik;

pub use fabrik::*;
