use bevy::{
    log::warn_once,
    math::{EulerRot, Quat, Vec3},
    reflect::{Reflect, std_traits::ReflectDefault},
    transform::components::Transform,
};
use std::f32::consts::PI;

/// Squared-distance tolerance uses this value squared.
pub const DIST_EPS: f32 = 1e-4;

#[derive(Reflect, Clone, Copy, Debug, PartialEq)]
#[reflect(Default)]
pub struct FabrikJoint {
    /// Transform relative to the previous joint. The first joint is relative to the chain base.
    pub transform: Transform,
    pub global_transform: Transform,
    pub working_position: Vec3,
    pub distance_to_parent: f32,
    pub enable_hinge: bool,
    pub hinge_axis: Vec3,
    /// Clamps the joint's local Euler angles. Unreliable, it can fight the position passes.
    pub rotation_limit_enabled: bool,
    pub min_rotation: Vec3,
    pub max_rotation: Vec3,
}

impl Default for FabrikJoint {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            global_transform: Transform::IDENTITY,
            working_position: Vec3::ZERO,
            distance_to_parent: 0.,
            enable_hinge: false,
            hinge_axis: Vec3::X,
            rotation_limit_enabled: false,
            min_rotation: Vec3::splat(-PI),
            max_rotation: Vec3::splat(PI),
        }
    }
}

/// Forward and backward reaching inverse kinematics over a short joint chain, with an optional
/// pole target that controls the bend direction.
#[derive(Reflect, Clone, Debug, Default, PartialEq)]
#[reflect(Default)]
pub struct FabrikSolver {
    joints: Vec<FabrikJoint>,
    pub pole_position: Vec3,
    pub target_position: Vec3,
    pub use_pole_constraint: bool,
    full_chain_distance: f32,
}

fn direction_to(from: Vec3, to: Vec3) -> Vec3 {
    (to - from).normalize_or_zero()
}

fn inverse(transform: &Transform) -> Transform {
    Transform::from_matrix(transform.to_matrix().inverse())
}

impl FabrikSolver {
    pub fn new(joint_count: usize) -> Self {
        Self {
            joints: vec![FabrikJoint::default(); joint_count],
            ..Default::default()
        }
    }

    /// Three joint chain with a hinged middle joint and the pole constraint enabled.
    pub fn limb() -> Self {
        let mut solver = Self::new(3);
        solver.joints[1].enable_hinge = true;
        solver.use_pole_constraint = true;
        solver
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn set_joint_count(&mut self, count: usize) {
        self.joints.resize(count, FabrikJoint::default());
    }

    pub fn joint(&self, index: usize) -> Option<&FabrikJoint> {
        self.joints.get(index)
    }

    pub fn joint_mut(&mut self, index: usize) -> Option<&mut FabrikJoint> {
        self.joints.get_mut(index)
    }

    pub fn joints(&self) -> &[FabrikJoint] {
        &self.joints
    }

    pub fn set_joint_transform(&mut self, index: usize, transform: Transform) {
        if let Some(joint) = self.joints.get_mut(index) {
            joint.transform = transform;
        }
    }

    pub fn joint_transform(&self, index: usize) -> Option<Transform> {
        self.joints.get(index).map(|j| j.transform)
    }

    pub fn full_chain_distance(&self) -> f32 {
        self.full_chain_distance
    }

    /// Caches each joint's rest distance to its parent. Must be called again whenever the joint
    /// translations change.
    pub fn calculate_distances(&mut self) {
        self.full_chain_distance = 0.;
        for joint in self.joints.iter_mut().skip(1) {
            joint.distance_to_parent = joint.transform.translation.length();
            self.full_chain_distance += joint.distance_to_parent;
        }
    }

    /// Chain base relative transform of joint `index`, accumulated from the local transforms.
    pub fn global_transform(&self, index: usize) -> Transform {
        self.joints
            .iter()
            .take(index + 1)
            .fold(Transform::IDENTITY, |acc, joint| acc * joint.transform)
    }

    fn local_to_global(&mut self) {
        let mut prev_global = Transform::IDENTITY;
        for joint in self.joints.iter_mut() {
            joint.global_transform = prev_global * joint.transform;
            prev_global = joint.global_transform;
        }
    }

    fn solve_backwards(&mut self) {
        let Some(last) = self.joints.len().checked_sub(1) else {
            return;
        };
        self.joints[last].working_position = self.target_position;
        for i in (0..last).rev() {
            let next = self.joints[i + 1];
            let dir = direction_to(next.working_position, self.joints[i].working_position);
            self.joints[i].working_position = next.working_position + dir * next.distance_to_parent;
        }
    }

    fn solve_forwards(&mut self, base: Vec3) {
        let Some(first) = self.joints.first_mut() else {
            return;
        };
        first.working_position = base;
        for i in 1..self.joints.len() {
            let parent = self.joints[i - 1].working_position;
            let joint = &mut self.joints[i];
            let dir = direction_to(parent, joint.working_position);
            joint.working_position = parent + dir * joint.distance_to_parent;
        }
    }

    /// Aims the chain at the target, then swings it around the base so that its middle joint
    /// points towards the pole.
    fn process_pole_vector(&mut self) {
        if self.joints.len() < 3 {
            return;
        }
        let last = self.joints.len() - 1;

        self.local_to_global();
        let start = self.joints[0].global_transform.translation;
        let end = self.joints[last].global_transform.translation;
        let curr_dir = (end - start).normalize_or_zero();
        let new_dir = (self.target_position - start).normalize_or_zero();
        if curr_dir == Vec3::ZERO || new_dir == Vec3::ZERO {
            return;
        }
        // The first joint has no parent, so its local and global rotations coincide
        self.joints[0].transform.rotation =
            Quat::from_rotation_arc(curr_dir, new_dir) * self.joints[0].transform.rotation;

        self.local_to_global();
        let origin = self.joints[0].global_transform.translation;
        let plane_normal = self.joints[last].global_transform.translation - origin;
        let Some(plane_normal) = plane_normal.try_normalize() else {
            return;
        };

        let project = |point: Vec3| point - plane_normal * (point - origin).dot(plane_normal);
        let middle = self.joints.len() / 2;
        let pole_proj = project(self.pole_position);
        let middle_proj = project(self.joints[middle].global_transform.translation);
        let diff_pole = (pole_proj - origin).normalize_or_zero();
        let diff_middle = (middle_proj - origin).normalize_or_zero();
        if diff_pole == Vec3::ZERO || diff_middle == Vec3::ZERO {
            return;
        }
        if diff_middle.angle_between(diff_pole).abs() < 1e-5 {
            return;
        }
        self.joints[0].transform.rotation = Quat::from_rotation_arc(diff_middle, diff_pole)
            * self.joints[0].global_transform.rotation;
    }

    /// Turns working positions back into joint rotations.
    fn apply(&mut self) {
        let mut prev_global = Transform::IDENTITY;
        for i in 0..self.joints.len().saturating_sub(1) {
            let next = self.joints[i + 1];
            let parent_hinge_axis = i.checked_sub(1).map(|p| self.joints[p].hinge_axis);
            let child_bone = self
                .joints
                .get(i + 2)
                .map(|grandchild| direction_to(next.working_position, grandchild.working_position));
            let joint = &mut self.joints[i];

            let joint_global = prev_global * joint.transform;
            let joint_global_next = joint_global * next.transform;
            let pos = joint_global.translation;

            let from = direction_to(pos, joint_global_next.translation);
            let to = direction_to(pos, next.working_position);

            joint.global_transform = joint_global;
            if from != Vec3::ZERO && to != Vec3::ZERO {
                joint.global_transform.rotation =
                    (Quat::from_rotation_arc(from, to) * joint_global.rotation).normalize();
            }

            if joint.rotation_limit_enabled {
                warn_once!("FABRIK joint rotation limits are unreliable and may fight the solver");
                let local_rotation = prev_global.rotation.inverse() * joint.global_transform.rotation;
                let (y, x, z) = local_rotation.to_euler(EulerRot::YXZ);
                let euler = Vec3::new(x, y, z).clamp(joint.min_rotation, joint.max_rotation);
                let local_rotation = Quat::from_euler(EulerRot::YXZ, euler.y, euler.x, euler.z);
                joint.global_transform.rotation = prev_global.rotation * local_rotation;
            }

            let bone_dir = if to != Vec3::ZERO { to } else { from };

            // Roll the parent of a hinge about its own bone so that its hinge axis is the normal
            // of the bend plane. The child bone then bends about that axis.
            if next.enable_hinge
                && let Some(child_bone) = child_bone
                && let Some(normal) = bone_dir.cross(child_bone).try_normalize()
                && let Some(current) = (joint.global_transform.rotation * joint.hinge_axis)
                    .reject_from(bone_dir)
                    .try_normalize()
            {
                let wanted = if current.dot(normal) < 0. { -normal } else { normal };
                let angle = current
                    .cross(wanted)
                    .dot(bone_dir)
                    .atan2(current.dot(wanted));
                joint.global_transform.rotation =
                    (Quat::from_axis_angle(bone_dir, angle) * joint.global_transform.rotation)
                        .normalize();
            }

            if joint.enable_hinge
                && let Some(parent_hinge_axis) = parent_hinge_axis
            {
                let parent_hinge = (prev_global.rotation * parent_hinge_axis).normalize_or_zero();
                let current_hinge =
                    (joint.global_transform.rotation * joint.hinge_axis).normalize_or_zero();
                if parent_hinge != Vec3::ZERO && current_hinge != Vec3::ZERO {
                    joint.global_transform.rotation = (Quat::from_rotation_arc(
                        current_hinge,
                        parent_hinge,
                    ) * joint.global_transform.rotation)
                        .normalize();
                }
            }

            joint.transform = inverse(&prev_global) * joint.global_transform;
            prev_global = joint.global_transform;
        }
        self.local_to_global();
    }

    /// Moves the chain so that its last joint reaches `target_position`. Targets beyond the chain
    /// length fully extend the chain towards them.
    pub fn solve(&mut self, iterations: usize) {
        if self.joints.is_empty() {
            return;
        }
        let last = self.joints.len() - 1;
        let dist_eps_squared = DIST_EPS * DIST_EPS;

        if self.use_pole_constraint {
            self.process_pole_vector();
        }

        self.local_to_global();
        for joint in self.joints.iter_mut() {
            joint.working_position = joint.global_transform.translation;
        }

        if self.joints[last]
            .working_position
            .distance_squared(self.target_position)
            < dist_eps_squared
        {
            return;
        }

        let base = self.joints[0].working_position;

        if base.distance(self.target_position) > self.full_chain_distance {
            for i in 1..self.joints.len() {
                let parent = self.joints[i - 1].working_position;
                let joint = &mut self.joints[i];
                joint.working_position =
                    parent + direction_to(parent, self.target_position) * joint.distance_to_parent;
            }
            self.apply();
            return;
        }

        for _ in 0..iterations {
            if self.joints[last]
                .working_position
                .distance_squared(self.target_position)
                < dist_eps_squared
            {
                break;
            }
            self.solve_backwards();
            self.solve_forwards(base);
            self.apply();
        }
        self.apply();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bent_chain(mut solver: FabrikSolver) -> FabrikSolver {
        solver.set_joint_transform(0, Transform::IDENTITY);
        solver.set_joint_transform(1, Transform::from_xyz(0., 1., 0.));
        solver.set_joint_transform(2, Transform::from_xyz(1., 0., 0.));
        solver.calculate_distances();
        solver
    }

    /// Limb whose hinge axes are the normal of the rest bend plane.
    fn hinged_limb() -> FabrikSolver {
        let mut solver = FabrikSolver::limb();
        for i in 0..2 {
            if let Some(joint) = solver.joint_mut(i) {
                joint.hinge_axis = Vec3::Z;
            }
        }
        bent_chain(solver)
    }

    fn hinge_alignment(solver: &FabrikSolver) -> f32 {
        let parent = solver.global_transform(0).rotation * Vec3::Z;
        let hinge = solver.global_transform(1).rotation * Vec3::Z;
        parent.dot(hinge)
    }

    fn end_position(solver: &FabrikSolver) -> Vec3 {
        solver.global_transform(2).translation
    }

    #[test]
    fn distances_from_translations() {
        let solver = bent_chain(FabrikSolver::new(3));
        assert_eq!(solver.full_chain_distance(), 2.);
        assert_eq!(solver.joint(0).map(|j| j.distance_to_parent), Some(0.));
        assert_eq!(solver.joint(2).map(|j| j.distance_to_parent), Some(1.));
    }

    #[test]
    fn reaches_target_within_range() {
        for mut solver in [bent_chain(FabrikSolver::new(3)), hinged_limb()] {
            let target = Vec3::new(1.2, 0.8, 0.3);
            solver.target_position = target;
            solver.solve(20);

            assert!(
                end_position(&solver).distance(target) < 1e-3,
                "end at {:?}",
                end_position(&solver)
            );
            let mid = solver.global_transform(1).translation;
            assert!((mid.length() - 1.).abs() < 1e-3);
            assert!((end_position(&solver).distance(mid) - 1.).abs() < 1e-3);
        }
    }

    #[test]
    fn overextended_target_straightens_chain() {
        let mut solver = hinged_limb();
        let target = Vec3::new(3., 3., 0.);
        solver.target_position = target;
        solver.solve(20);

        let end = end_position(&solver);
        let mid = solver.global_transform(1).translation;
        let dir = target.normalize();
        assert!((end.length() - 2.).abs() < 1e-3);
        assert!(end.normalize().abs_diff_eq(dir, 1e-3));
        assert!(mid.normalize().abs_diff_eq(dir, 1e-3));
    }

    #[test]
    fn pole_bends_chain_towards_it() {
        let mut solver = hinged_limb();
        solver.pole_position = Vec3::new(0., 0., 5.);
        solver.target_position = Vec3::new(1., 1., 0.);
        solver.solve(20);

        assert!(end_position(&solver).distance(solver.target_position) < 1e-3);
        assert!(solver.global_transform(1).translation.z > 0.);
    }

    #[test]
    fn hinge_axis_follows_parent() {
        for target in [
            Vec3::new(0.5, 1.2, 0.7),
            Vec3::new(-0.3, 0.9, -1.0),
            Vec3::new(1.0, 0.5, 0.2),
            Vec3::new(3., 3., 0.),
        ] {
            let mut solver = hinged_limb();
            solver.use_pole_constraint = false;
            solver.target_position = target;
            solver.solve(20);

            assert!(
                hinge_alignment(&solver) > 0.999,
                "hinge misaligned by {} for {target:?}",
                hinge_alignment(&solver)
            );
            if target.length() < 2. {
                assert!(end_position(&solver).distance(target) < 1e-3);
            }
        }
    }

    #[test]
    fn rotation_limits_clamp_local_angles() {
        let target = Vec3::new(-1.5, 0.5, 0.);
        let roll = |solver: &FabrikSolver| {
            let (_, _, z) = solver.global_transform(0).rotation.to_euler(EulerRot::YXZ);
            z
        };

        let mut free = bent_chain(FabrikSolver::new(3));
        free.target_position = target;
        free.solve(20);
        assert!(roll(&free) > 0.5);

        let mut limited = bent_chain(FabrikSolver::new(3));
        if let Some(joint) = limited.joint_mut(0) {
            joint.rotation_limit_enabled = true;
            joint.min_rotation = Vec3::new(-PI, -PI, -0.2);
            joint.max_rotation = Vec3::new(PI, PI, 0.2);
        }
        limited.target_position = target;
        limited.solve(20);
        assert!((roll(&limited) - 0.2).abs() < 1e-3, "roll {}", roll(&limited));
    }

    #[test]
    fn empty_chain_is_noop() {
        let mut solver = FabrikSolver::new(0);
        solver.target_position = Vec3::ONE;
        solver.solve(10);
        assert_eq!(solver.joint_count(), 0);
    }

    #[test]
    fn already_at_target_keeps_transforms() {
        let mut solver = bent_chain(FabrikSolver::new(3));
        solver.target_position = Vec3::new(1., 1., 0.);
        solver.solve(10);
        assert_eq!(solver.joint_transform(1), Some(Transform::from_xyz(0., 1., 0.)));
    }
}
