mod config_error;
mod graph_error;

pub use config_error::*;
pub use graph_error::*;
