//! Exact critically damped springs, stepped by an arbitrary time delta.

use bevy::math::{Quat, Vec3};

const LN_2: f32 = std::f32::consts::LN_2;

/// Approximation of `exp(-x)` that is accurate enough for spring damping.
pub fn fast_negexp(x: f32) -> f32 {
    1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x)
}

/// Damping for a spring that covers half the distance to its goal in `halflife` seconds.
pub fn halflife_to_damping(halflife: f32) -> f32 {
    (4.0 * LN_2) / (halflife + 1e-5)
}

pub fn critical_spring_damper_exact(
    x: &mut f32,
    v: &mut f32,
    x_goal: f32,
    halflife: f32,
    dt: f32,
) {
    let y = halflife_to_damping(halflife) / 2.0;
    let j0 = *x - x_goal;
    let j1 = *v + j0 * y;
    let eydt = fast_negexp(y * dt);

    *x = eydt * (j0 + j1 * dt) + x_goal;
    *v = eydt * (*v - j1 * y * dt);
}

pub fn critical_spring_damper_exact_vec3(
    x: &mut Vec3,
    v: &mut Vec3,
    x_goal: Vec3,
    halflife: f32,
    dt: f32,
) {
    critical_spring_damper_exact(&mut x.x, &mut v.x, x_goal.x, halflife, dt);
    critical_spring_damper_exact(&mut x.y, &mut v.y, x_goal.y, halflife, dt);
    critical_spring_damper_exact(&mut x.z, &mut v.z, x_goal.z, halflife, dt);
}

/// Rotation spring. `v` is an angular velocity in scaled angle-axis form.
pub fn simple_spring_damper_exact_quat(
    x: &mut Quat,
    v: &mut Vec3,
    x_goal: Quat,
    halflife: f32,
    dt: f32,
) {
    let y = halflife_to_damping(halflife) / 2.0;

    let goal = if x_goal.dot(*x) < 0. { -x_goal } else { x_goal };

    let j0 = (goal.inverse() * *x).to_scaled_axis();
    let j1 = *v + j0 * y;
    let eydt = fast_negexp(y * dt);

    *x = (goal * Quat::from_scaled_axis(eydt * (j0 + j1 * dt))).normalize();
    *v = eydt * (*v - j1 * y * dt);
}
