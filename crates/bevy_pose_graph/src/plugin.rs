use bevy::{
    app::{App, FixedUpdate, Plugin, Update},
    ecs::{prelude::*, schedule::SystemSet},
    log::warn,
    time::Time,
    transform::components::Transform,
};
use bevy_pose_graph_core::{
    animation::{Animation, FloatCurve, InterpolationMethod, Keyframe},
    config::{GraphConfig, PlaybackProcessMode},
    edge_data::{
        bone_mask::BoneMask,
        events::{EventQueue, GraphEvent},
    },
    pose::{BoneId, BonePose, Pose},
    skeleton::Skeleton,
};

use crate::{
    controller::PoseGraphController,
    graph::{AnimationNode, AnimationNodeType, NodeId, PoseGraph},
    nodes::{ClipPlaybackMode, LocomotionSet, LocomotionSetType},
};

/// Advances every [`PoseGraphController`] and writes its bone transforms to the mapped entities
pub struct PoseGraphPlugin;

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, SystemSet)]
pub enum PoseGraphSet {
    /// Runs in `Update` for controllers in [`PlaybackProcessMode::Idle`]
    Idle,
    /// Runs in `FixedUpdate` for controllers in [`PlaybackProcessMode::Physics`]
    Physics,
}

impl Plugin for PoseGraphPlugin {
    fn build(&self, app: &mut App) {
        self.register_types(app);

        app.add_systems(Update, advance_idle_controllers.in_set(PoseGraphSet::Idle));
        app.add_systems(
            FixedUpdate,
            advance_physics_controllers.in_set(PoseGraphSet::Physics),
        );
    }
}

impl PoseGraphPlugin {
    fn register_types(&self, app: &mut App) {
        app //
            .register_type::<PoseGraphController>()
            .register_type::<PoseGraph>()
            .register_type::<AnimationNode>()
            .register_type::<AnimationNodeType>()
            .register_type::<NodeId>()
            .register_type::<Pose>()
            .register_type::<BonePose>()
            .register_type::<BoneId>()
            .register_type::<BoneMask>()
            .register_type::<Skeleton>()
            .register_type::<Animation>()
            .register_type::<Keyframe>()
            .register_type::<FloatCurve>()
            .register_type::<InterpolationMethod>()
            .register_type::<ClipPlaybackMode>()
            .register_type::<LocomotionSet>()
            .register_type::<LocomotionSetType>()
            .register_type::<GraphConfig>()
            .register_type::<PlaybackProcessMode>()
            .register_type::<GraphEvent>()
            .register_type::<EventQueue>();
    }
}

pub fn advance_idle_controllers(
    time: Res<Time>,
    controllers: Query<&mut PoseGraphController>,
    transforms: Query<&mut Transform, Without<PoseGraphController>>,
) {
    run_controllers(
        PlaybackProcessMode::Idle,
        time.delta_secs(),
        controllers,
        transforms,
    );
}

/// `Time` is the fixed clock inside `FixedUpdate`
pub fn advance_physics_controllers(
    time: Res<Time>,
    controllers: Query<&mut PoseGraphController>,
    transforms: Query<&mut Transform, Without<PoseGraphController>>,
) {
    run_controllers(
        PlaybackProcessMode::Physics,
        time.delta_secs(),
        controllers,
        transforms,
    );
}

fn run_controllers(
    mode: PlaybackProcessMode,
    delta: f32,
    mut controllers: Query<&mut PoseGraphController>,
    mut transforms: Query<&mut Transform, Without<PoseGraphController>>,
) {
    for mut controller in &mut controllers {
        if controller.playback_process_mode() != mode {
            continue;
        }

        if let Err(error) = controller.advance(delta) {
            warn!("Pose graph evaluation failed: {error}");
            continue;
        }

        for (bone, bone_transform) in controller.bone_transforms() {
            let Some(entity) = controller.bone_entity(&bone) else {
                continue;
            };
            if let Ok(mut transform) = transforms.get_mut(entity) {
                *transform = bone_transform;
            }
        }
    }
}
