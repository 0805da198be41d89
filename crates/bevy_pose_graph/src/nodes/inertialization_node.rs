use bevy::{
    log::debug,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use bevy_pose_graph_core::{
    edge_data::bone_mask::BoneMask,
    errors::GraphResult,
    inertialization::{InertializationPoses, PoseInertializer},
    pose::Pose,
};

use crate::graph::{NodeLike, PassContext};

#[derive(Reflect, Clone, Debug, Default)]
#[reflect(Default)]
struct InertializationRequest {
    /// Seconds, or the configured default when `None`
    duration: Option<f32>,
    bone_mask: BoneMask,
}

/// Smooths out discontinuities in its input. After [`InertializationNode::inertialize`] is called,
/// the jump between the last output and the next input is decayed over the requested duration
/// instead of showing up as a pop.
#[derive(Reflect, Clone, Debug, Default)]
#[reflect(Default)]
pub struct InertializationNode {
    request: Option<InertializationRequest>,
    inertializer: Option<PoseInertializer>,
    last_frame_pose: Option<Pose>,
    last_last_frame_pose: Option<Pose>,
}

impl InertializationNode {
    /// Starts an inertialization on the next pass, replacing any that is in progress.
    pub fn inertialize(&mut self, duration: f32, bone_mask: BoneMask) {
        self.request = Some(InertializationRequest {
            duration: Some(duration),
            bone_mask,
        });
    }

    /// Like [`InertializationNode::inertialize`], with the graph's default duration.
    pub fn inertialize_default(&mut self, bone_mask: BoneMask) {
        self.request = Some(InertializationRequest {
            duration: None,
            bone_mask,
        });
    }

    pub fn is_inertializing(&self) -> bool {
        self.request.is_some() || self.inertializer.is_some()
    }

    pub fn inertializer(&self) -> Option<&PoseInertializer> {
        self.inertializer.as_ref()
    }
}

impl NodeLike for InertializationNode {
    fn input_count(&self) -> usize {
        1
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        ctx.process_input(0, target)?;

        let history_ready = self.last_frame_pose.is_some() && self.last_last_frame_pose.is_some();

        match self.request.take() {
            Some(request) if history_ready => {
                let config = ctx.config();
                let duration = request
                    .duration
                    .unwrap_or(config.default_inertialization_duration);
                let mut inertializer = PoseInertializer::create_with_threshold(
                    InertializationPoses {
                        prev_prev: self.last_last_frame_pose.as_ref(),
                        prev: self.last_frame_pose.as_ref(),
                        target: Some(&*target),
                    },
                    ctx.base_pose(),
                    duration,
                    ctx.delta(),
                    &request.bone_mask,
                    config.rotation_inertialization_min_angle(),
                )?;
                if config.log_transitions {
                    debug!(
                        "{}: inertializing {} channels over {duration}s",
                        ctx.node_name(),
                        inertializer.channel_count()
                    );
                }
                let done = inertializer.advance(target, ctx.base_pose(), 0.);
                self.inertializer = (!done).then_some(inertializer);
            }
            request => {
                // A request without enough history stays queued
                self.request = request;
                let finished = self
                    .inertializer
                    .as_mut()
                    .is_some_and(|i| i.advance(target, ctx.base_pose(), ctx.delta()));
                if finished {
                    if ctx.config().log_transitions {
                        debug!("{}: inertialization finished", ctx.node_name());
                    }
                    self.inertializer = None;
                }
            }
        }

        self.last_last_frame_pose = self.last_frame_pose.take();
        self.last_frame_pose = Some(target.clone());
        Ok(())
    }

    fn display_name(&self) -> String {
        "≈ Inertialization".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{GraphResources, NodeId, PoseGraph},
        nodes::{PoseNode, TransitionNode},
    };
    use bevy::{math::Vec3, transform::components::Transform};
    use bevy_pose_graph_core::{config::GraphConfig, edge_data::events::EventQueue, pose::BoneId};

    const DELTA: f32 = 1. / 60.;

    fn hip() -> BoneId {
        BoneId::from_name("hip")
    }

    fn base() -> Pose {
        Pose::from_transforms([(hip(), Transform::IDENTITY)])
    }

    fn pose(x: f32) -> Pose {
        Pose::from_transforms([(hip(), Transform::from_xyz(x, 0., 0.))])
    }

    /// inertialization <- transition <- (pose 0, pose 1)
    fn graph() -> (PoseGraph, NodeId, NodeId) {
        let mut graph = PoseGraph::new();
        let inertialization = graph
            .connect_node_to_root(InertializationNode::default(), "inertialization")
            .unwrap();
        let transition = graph
            .connect_node(TransitionNode::new(2), inertialization, "transition", 0)
            .unwrap();
        graph
            .connect_node(PoseNode::new(pose(0.)), transition, "idle", 0)
            .unwrap();
        graph
            .connect_node(PoseNode::new(pose(1.)), transition, "run", 1)
            .unwrap();
        (graph, inertialization, transition)
    }

    fn step(graph: &mut PoseGraph) -> f32 {
        let base = base();
        let config = GraphConfig::default();
        let mut target = Pose::default();
        graph
            .evaluate(
                GraphResources::new(&base, None, &config),
                &mut EventQueue::default(),
                &mut target,
                DELTA,
            )
            .unwrap();
        target.bone_translation(&hip(), &base).x
    }

    fn switch(graph: &mut PoseGraph, inertialization: NodeId, transition: NodeId) {
        graph
            .node_mut::<TransitionNode>(transition)
            .unwrap()
            .transition_to(1)
            .unwrap();
        graph
            .node_mut::<InertializationNode>(inertialization)
            .unwrap()
            .inertialize(0.25, BoneMask::all());
    }

    #[test]
    fn passes_through_when_idle() {
        let (mut graph, inertialization, _) = graph();
        assert_eq!(step(&mut graph), 0.);
        assert!(
            !graph
                .node::<InertializationNode>(inertialization)
                .unwrap()
                .is_inertializing()
        );
    }

    #[test]
    fn smooths_a_transition() {
        let (mut graph, inertialization, transition) = graph();
        step(&mut graph);
        step(&mut graph);
        switch(&mut graph, inertialization, transition);

        // The first frame after the switch still shows the previous pose
        let first = step(&mut graph);
        assert!(first.abs() < 1e-5);
        assert!(
            graph
                .node::<InertializationNode>(inertialization)
                .unwrap()
                .is_inertializing()
        );

        let mut last = first;
        let mut frames = 0;
        while graph
            .node::<InertializationNode>(inertialization)
            .unwrap()
            .is_inertializing()
        {
            let x = step(&mut graph);
            assert!(x >= last - 1e-5 && x <= 1. + 1e-5);
            last = x;
            frames += 1;
            assert!(frames <= 20);
        }
        assert_eq!(last, 1.);
        assert_eq!(step(&mut graph), 1.);
    }

    #[test]
    fn restart_mid_inertialization_is_continuous() {
        let (mut graph, inertialization, transition) = graph();
        step(&mut graph);
        step(&mut graph);
        switch(&mut graph, inertialization, transition);

        let mut last = 0.;
        for _ in 0..4 {
            last = step(&mut graph);
        }
        assert!(last > 0. && last < 1.);

        graph
            .node_mut::<TransitionNode>(transition)
            .unwrap()
            .transition_to(0)
            .unwrap();
        graph
            .node_mut::<InertializationNode>(inertialization)
            .unwrap()
            .inertialize(0.25, BoneMask::all());

        let restarted = step(&mut graph);
        assert!((restarted - last).abs() < 1e-4, "{last} -> {restarted}");

        last = restarted;
        let mut frames = 0;
        while graph
            .node::<InertializationNode>(inertialization)
            .unwrap()
            .is_inertializing()
        {
            let x = step(&mut graph);
            assert!((x - last).abs() < 0.1, "{last} -> {x}");
            last = x;
            frames += 1;
            assert!(frames <= 20);
        }
        assert_eq!(step(&mut graph), 0.);
    }

    #[test]
    fn request_waits_for_history() {
        let (mut graph, inertialization, transition) = graph();
        switch(&mut graph, inertialization, transition);

        // No history on the first pass, the cut goes through
        assert_eq!(step(&mut graph), 1.);
        assert!(
            graph
                .node::<InertializationNode>(inertialization)
                .unwrap()
                .is_inertializing()
        );
        assert_eq!(step(&mut graph), 1.);
        // Both history poses are the target now, so nothing is left to decay
        assert_eq!(step(&mut graph), 1.);
        assert!(
            !graph
                .node::<InertializationNode>(inertialization)
                .unwrap()
                .is_inertializing()
        );
    }

    #[test]
    fn default_duration_comes_from_config() {
        let (mut graph, inertialization, transition) = graph();
        step(&mut graph);
        step(&mut graph);
        graph
            .node_mut::<TransitionNode>(transition)
            .unwrap()
            .transition_to(1)
            .unwrap();
        graph
            .node_mut::<InertializationNode>(inertialization)
            .unwrap()
            .inertialize_default(BoneMask::all());
        step(&mut graph);

        let node = graph.node::<InertializationNode>(inertialization).unwrap();
        let position = node.inertializer().unwrap().bones()[0]
            .position
            .as_ref()
            .unwrap();
        assert_eq!(position.offset(), Vec3::new(-1., 0., 0.));
        assert!((position.duration() - 0.25).abs() < 1e-6);
    }
}
