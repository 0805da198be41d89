pub mod animation;
pub mod config;
pub mod decay;
pub mod edge_data;
pub mod errors;
pub mod id;
pub mod ik;
pub mod inertialization;
pub mod interpolation;
pub mod pose;
pub mod skeleton;
pub mod space_conversion;
pub mod springs;
