use bevy::{
    log::debug,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ConfigError;

/// When a controller advances its graph.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[reflect(Default)]
pub enum PlaybackProcessMode {
    /// Every rendered frame
    #[default]
    Idle,
    /// Every fixed physics step
    Physics,
    /// Only when advanced explicitly
    Manual,
}

/// Tunables shared by every node of a graph.
#[derive(Reflect, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[reflect(Default)]
#[serde(default)]
pub struct GraphConfig {
    /// Seconds, used when an inertialization is requested without a duration
    pub default_inertialization_duration: f32,
    /// Iteration budget of the IK solver
    pub ik_iterations: usize,
    /// Rotations closer than this are not inertialized
    pub rotation_inertialization_min_angle_deg: f32,
    pub log_transitions: bool,
    pub playback_process_mode: PlaybackProcessMode,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_inertialization_duration: 0.25,
            ik_iterations: 10,
            rotation_inertialization_min_angle_deg: 0.05,
            log_transitions: false,
            playback_process_mode: PlaybackProcessMode::Idle,
        }
    }
}

impl GraphConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::de::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&text)?;
        debug!("Loaded graph config from {}", path.display());
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn rotation_inertialization_min_angle(&self) -> f32 {
        self.rotation_inertialization_min_angle_deg.to_radians()
    }
}
