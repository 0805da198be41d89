use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use bevy_pose_graph_core::{
    animation::{Animation, InterpolationMethod},
    edge_data::events::GraphEvent,
    errors::GraphResult,
    pose::Pose,
};

use crate::graph::{NodeLike, PassContext};

/// Plays an animation once every time [`OneShotNode::play`] is called. Writes nothing while
/// stopped.
#[derive(Reflect, Clone, Debug, Default)]
#[reflect(Default)]
pub struct OneShotNode {
    pub animation: Animation,
    pub interpolation: InterpolationMethod,
    time: f32,
    playing: bool,
}

impl OneShotNode {
    pub fn new(animation: Animation) -> Self {
        Self {
            animation,
            ..Default::default()
        }
    }

    /// Restarts playback from the beginning.
    pub fn play(&mut self) {
        self.time = 0.;
        self.playing = true;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

impl NodeLike for OneShotNode {
    fn input_count(&self) -> usize {
        0
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        if !self.playing {
            return Ok(());
        }

        let length = self.animation.length();
        self.time += ctx.delta();
        self.animation.interpolate(
            self.time.min(length),
            ctx.base_pose(),
            target,
            self.interpolation,
        );

        if self.time >= length {
            self.playing = false;
            ctx.emit(GraphEvent::PlaybackFinished {
                node: ctx.node_name().to_string(),
            });
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        "⏵ One Shot".into()
    }
}
