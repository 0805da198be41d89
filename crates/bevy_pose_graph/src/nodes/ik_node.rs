use bevy::{
    log::warn,
    math::{Quat, Vec2, Vec3},
    reflect::{Reflect, std_traits::ReflectDefault},
    transform::components::Transform,
};
use bevy_pose_graph_core::{
    errors::GraphResult,
    ik::FabrikSolver,
    pose::{BoneId, Pose},
    skeleton::SkeletonProvider,
    space_conversion::SpaceConversion,
};

use crate::graph::{NodeLike, PassContext};

/// Three bone limb IK ending at `ik_end`. The end bone, its parent and its grandparent are solved
/// with FABRIK towards `target_transform`, which is given in skeleton space.
#[derive(Reflect, Clone, Debug)]
#[reflect(Default)]
pub struct IkNode {
    pub ik_influence: f32,
    pub target_transform: Transform,
    /// Bends the limb towards `magnet_position`, in skeleton space
    pub use_magnet: bool,
    pub magnet_position: Vec3,
    pub ik_end: String,
    /// Also rotates the end bone to match the target's rotation
    pub match_target_rotation: bool,
    solver: FabrikSolver,
    /// Bone name and segment lengths the solver distances were computed for
    cached_chain: Option<(String, Vec2)>,
}

impl Default for IkNode {
    fn default() -> Self {
        Self {
            ik_influence: 1.,
            target_transform: Transform::IDENTITY,
            use_magnet: false,
            magnet_position: Vec3::ZERO,
            ik_end: String::new(),
            match_target_rotation: false,
            solver: FabrikSolver::limb(),
            cached_chain: None,
        }
    }
}

const LENGTH_EPSILON: f32 = 1e-5;

struct Chain {
    root: BoneId,
    middle: BoneId,
    end: BoneId,
}

impl IkNode {
    pub fn new(ik_end: impl Into<String>) -> Self {
        Self {
            ik_end: ik_end.into(),
            ..Default::default()
        }
    }

    pub fn set_target_transform(&mut self, target_transform: Transform) {
        self.target_transform = target_transform;
    }

    pub fn set_magnet_position(&mut self, magnet_position: Vec3) {
        self.magnet_position = magnet_position;
    }

    pub fn solver(&self) -> &FabrikSolver {
        &self.solver
    }

    fn find_chain(&self, skeleton: &dyn SkeletonProvider) -> Option<Chain> {
        let end = BoneId::from_name(&self.ik_end);
        if !skeleton.has_bone(&end) {
            warn!("IK end bone {:?} is not part of the skeleton", self.ik_end);
            return None;
        }
        let Some(middle) = skeleton.bone_parent(&end) else {
            warn!("IK end bone {:?} has no parent", self.ik_end);
            return None;
        };
        let Some(root) = skeleton.bone_parent(&middle) else {
            warn!("IK end bone {:?} has no grandparent", self.ik_end);
            return None;
        };
        Some(Chain { root, middle, end })
    }

    /// Recomputes the solver's rest distances when the chain or its segment lengths changed.
    fn refresh_distances(&mut self, lengths: Vec2) {
        let stale = match &self.cached_chain {
            Some((end, cached)) => {
                *end != self.ik_end || !cached.abs_diff_eq(lengths, LENGTH_EPSILON)
            }
            None => true,
        };
        if stale {
            self.solver.calculate_distances();
            self.cached_chain = Some((self.ik_end.clone(), lengths));
        }
    }
}

impl NodeLike for IkNode {
    fn input_count(&self) -> usize {
        1
    }

    fn process(&mut self, ctx: &mut PassContext, target: &mut Pose) -> GraphResult<()> {
        ctx.process_input(0, target)?;

        let Some(skeleton) = ctx.skeleton() else {
            return Ok(());
        };
        if self.ik_influence == 0. {
            return Ok(());
        }
        let Some(chain) = self.find_chain(skeleton) else {
            return Ok(());
        };
        let base = ctx.base_pose();

        let (chain_base, locals) = {
            let conversion = SpaceConversion::new(target, base, skeleton);
            (
                conversion.parent_skeleton_transform(chain.root),
                [chain.root, chain.middle, chain.end].map(|bone| conversion.local_transform(bone)),
            )
        };

        for (i, local) in locals.iter().enumerate() {
            self.solver.set_joint_transform(i, *local);
        }
        self.refresh_distances(Vec2::new(
            locals[1].translation.length(),
            locals[2].translation.length(),
        ));

        let to_chain = Transform::from_matrix(chain_base.to_matrix().inverse());
        self.solver.target_position = to_chain.transform_point(self.target_transform.translation);
        self.solver.pole_position = to_chain.transform_point(self.magnet_position);
        self.solver.use_pole_constraint = self.use_magnet;
        self.solver.solve(ctx.config().ik_iterations);

        for (i, bone) in [chain.root, chain.middle].into_iter().enumerate() {
            let Some(solved) = self.solver.joint_transform(i) else {
                continue;
            };
            let rotation = locals[i].rotation.slerp(solved.rotation, self.ik_influence);
            target.set_bone_rotation(bone, rotation);
        }

        if self.match_target_rotation {
            let parent_rotation = SpaceConversion::new(target, base, skeleton)
                .skeleton_transform_of_bone(chain.middle)
                .rotation;
            let matched: Quat = parent_rotation.inverse() * self.target_transform.rotation;
            let rotation = locals[2].rotation.slerp(matched, self.ik_influence);
            target.set_bone_rotation(chain.end, rotation);
        }

        Ok(())
    }

    fn display_name(&self) -> String {
        "⤡ FABRIK IK".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{GraphResources, NodeId, PoseGraph},
        nodes::PoseNode,
    };
    use bevy_pose_graph_core::{
        config::GraphConfig, edge_data::events::EventQueue, skeleton::Skeleton,
        space_conversion::bone_global_transform,
    };
    use std::f32::consts::FRAC_PI_2;

    fn arm() -> Skeleton {
        let mut skeleton = Skeleton::default();
        skeleton.add_root("root", Transform::IDENTITY);
        skeleton
            .add_bone("upper", Some("root"), Transform::IDENTITY)
            .unwrap();
        skeleton
            .add_bone("lower", Some("upper"), Transform::from_xyz(0., 1., 0.))
            .unwrap();
        skeleton
            .add_bone("hand", Some("lower"), Transform::from_xyz(0., 1., 0.))
            .unwrap();
        skeleton
    }

    fn ik_graph(node: IkNode) -> (PoseGraph, NodeId) {
        let mut graph = PoseGraph::new();
        let ik = graph.connect_node_to_root(node, "ik").unwrap();
        graph
            .connect_node(PoseNode::default(), ik, "input", 0)
            .unwrap();
        (graph, ik)
    }

    fn evaluate(graph: &mut PoseGraph, skeleton: Option<&Skeleton>) -> Pose {
        let base = arm().rest_pose();
        let config = GraphConfig::default();
        let mut target = Pose::default();
        graph
            .evaluate(
                GraphResources::new(
                    &base,
                    skeleton.map(|s| s as &dyn SkeletonProvider),
                    &config,
                ),
                &mut EventQueue::default(),
                &mut target,
                1. / 60.,
            )
            .unwrap();
        target
    }

    fn hand_position(pose: &Pose) -> Vec3 {
        let skeleton = arm();
        bone_global_transform(
            pose,
            &skeleton.rest_pose(),
            &skeleton,
            BoneId::from_name("hand"),
        )
        .translation
    }

    fn reaching_node() -> IkNode {
        let mut node = IkNode::new("hand");
        node.set_target_transform(Transform::from_xyz(1., 1., 0.));
        node
    }

    #[test]
    fn reaches_target() {
        let (mut graph, _) = ik_graph(reaching_node());
        let output = evaluate(&mut graph, Some(&arm()));
        assert!(hand_position(&output).abs_diff_eq(Vec3::new(1., 1., 0.), 1e-3));
    }

    #[test]
    fn matches_target_rotation() {
        let mut node = reaching_node();
        node.target_transform.rotation = Quat::from_rotation_z(FRAC_PI_2);
        node.match_target_rotation = true;
        let (mut graph, _) = ik_graph(node);
        let skeleton = arm();
        let output = evaluate(&mut graph, Some(&skeleton));

        let hand = bone_global_transform(
            &output,
            &skeleton.rest_pose(),
            &skeleton,
            BoneId::from_name("hand"),
        );
        assert!(
            hand.rotation
                .abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2), 1e-4)
                || hand
                    .rotation
                    .abs_diff_eq(-Quat::from_rotation_z(FRAC_PI_2), 1e-4)
        );
    }

    #[test]
    fn zero_influence_passes_through() {
        let mut node = reaching_node();
        node.ik_influence = 0.;
        let (mut graph, _) = ik_graph(node);
        assert!(evaluate(&mut graph, Some(&arm())).is_empty());
    }

    #[test]
    fn missing_skeleton_or_bone_passes_through() {
        let (mut graph, _) = ik_graph(reaching_node());
        assert!(evaluate(&mut graph, None).is_empty());

        let (mut graph, _) = ik_graph(IkNode::new("tail"));
        assert!(evaluate(&mut graph, Some(&arm())).is_empty());
    }

    #[test]
    fn distances_follow_end_bone() {
        let (mut graph, ik) = ik_graph(reaching_node());
        evaluate(&mut graph, Some(&arm()));
        assert!((graph.node::<IkNode>(ik).unwrap().solver().full_chain_distance() - 2.).abs() < 1e-6);

        graph.node_mut::<IkNode>(ik).unwrap().ik_end = "lower".into();
        evaluate(&mut graph, Some(&arm()));
        assert!((graph.node::<IkNode>(ik).unwrap().solver().full_chain_distance() - 1.).abs() < 1e-6);
    }
}
