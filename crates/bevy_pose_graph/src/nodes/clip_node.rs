use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use bevy_pose_graph_core::{
    animation::{Animation, InterpolationMethod},
    edge_data::events::GraphEvent,
    errors::GraphResult,
    pose::Pose,
};
use serde::{Deserialize, Serialize};

use crate::graph::{NodeLike, PassContext};

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[reflect(Default)]
pub enum ClipPlaybackMode {
    /// Time advances with every pass
    #[default]
    Automatic,
    /// Time only changes through [`ClipNode::seek`]
    Manual,
}

/// Plays back a keyframed animation.
#[derive(Reflect, Clone, Debug)]
#[reflect(Default)]
pub struct ClipNode {
    pub animation: Animation,
    pub playback_mode: ClipPlaybackMode,
    pub interpolation: InterpolationMethod,
    pub looping: bool,
    time: f32,
    finished: bool,
}

impl Default for ClipNode {
    fn default() -> Self {
        Self {
            animation: Animation::default(),
            playback_mode: ClipPlaybackMode::Automatic,
            interpolation: InterpolationMethod::Linear,
            looping: true,
            time: 0.,
            finished: false,
        }
    }
}

impl ClipNode {
    pub fn new(animation: Animation) -> Self {
        Self {
            animation,
            ..Default::default()
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_playback_mode(mut self, playback_mode: ClipPlaybackMode) -> Self {
        self.playback_mode = playback_mode;
        self
    }

    pub fn with_interpolation(mut self, interpolation: InterpolationMethod) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn seek(&mut self, time: f32) {
        self.time = time;
        self.finished = false;
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

impl NodeLike for ClipNode {
    fn input_count(&self) -> usize {
        0
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        if self.animation.keyframe_count() == 0 {
            return Ok(());
        }

        if self.playback_mode == ClipPlaybackMode::Automatic {
            self.time += ctx.delta();
        }

        let length = self.animation.length();
        if self.looping {
            self.time = if length > 0. {
                self.time.rem_euclid(length)
            } else {
                0.
            };
        } else {
            self.time = self.time.clamp(0., length);
            if self.time >= length && !self.finished {
                self.finished = true;
                ctx.emit(GraphEvent::PlaybackFinished {
                    node: ctx.node_name().to_string(),
                });
            }
        }

        self.animation
            .interpolate(self.time, ctx.base_pose(), target, self.interpolation);
        Ok(())
    }

    fn display_name(&self) -> String {
        "⏵ Clip".into()
    }
}
