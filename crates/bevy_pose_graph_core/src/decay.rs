use bevy::reflect::{Reflect, std_traits::ReflectDefault};

/// Quintic decay of a scalar offset towards zero.
///
/// The curve starts at `x0` with velocity `v0` and reaches zero with zero velocity and zero
/// acceleration at the end of its duration. When `v0` would carry the offset across zero before the
/// requested duration, the duration is shortened to the crossing time so that the curve never
/// overshoots. The output magnitude is clamped to `[0, |x0|]` and is exactly zero once the decay is
/// done.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq)]
#[reflect(Default)]
pub struct QuinticDecay {
    x0: f32,
    v0: f32,
    duration: f32,
    elapsed: f32,
    /// Magnitude polynomial in normalized time `t / duration`, lowest power first
    coefficients: [f64; 6],
}

impl QuinticDecay {
    pub fn new(x0: f32, v0: f32, duration: f32) -> Self {
        // Solved in magnitude space, the sign of the offset is restored on output
        let v0 = if x0 < 0. { -v0 } else { v0 };
        let x0_abs = x0.abs();
        let duration = effective_duration(x0_abs, v0, duration);
        let coefficients = if duration > 0. {
            coefficients(x0_abs, v0, duration)
        } else {
            [0.; 6]
        };

        Self {
            x0,
            v0,
            duration,
            elapsed: 0.,
            coefficients,
        }
    }

    /// Signed initial offset
    pub fn initial_offset(&self) -> f32 {
        self.x0
    }

    /// Initial velocity, expressed in magnitude space
    pub fn initial_velocity(&self) -> f32 {
        self.v0
    }

    /// Effective duration, possibly shorter than the requested one
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Moves time forward and returns the offset at the new time.
    pub fn advance(&mut self, delta: f32) -> f32 {
        self.elapsed = (self.elapsed + delta.max(0.)).min(self.duration);
        self.value_at(self.elapsed)
    }

    /// Offset at time `t`, clamped to the decay duration.
    pub fn value_at(&self, t: f32) -> f32 {
        if t >= self.duration {
            return 0.;
        }
        let s = f64::from(t.max(0.)) / f64::from(self.duration);
        let value = self
            .coefficients
            .iter()
            .rev()
            .fold(0., |acc, c| acc * s + c);

        (value as f32).clamp(0., self.x0.abs()).copysign(self.x0)
    }

    /// Unclamped time derivative of the offset polynomial at `t`, in magnitude space.
    pub fn velocity_at(&self, t: f32) -> f32 {
        if self.duration <= 0. {
            return self.v0;
        }
        let duration = f64::from(self.duration);
        let s = f64::from(t.clamp(0., self.duration)) / duration;
        let derivative = self
            .coefficients
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0., |acc, (power, c)| acc * s + power as f64 * c);

        (derivative / duration) as f32
    }
}

fn effective_duration(x0: f32, v0: f32, duration: f32) -> f32 {
    let duration = duration.max(0.);
    if v0 != 0. {
        let crossing = -5. * x0 / v0;
        if crossing > 0. {
            return crossing.min(duration);
        }
    }
    duration
}

/// Coefficients of `x0 + v0 T s + accel T^2 s^2 / 2 + C s^3 + B s^4 + A s^5` with `s = t / T`.
/// The curve reaches zero with zero velocity and acceleration at `s = 1`.
fn coefficients(x0: f32, v0: f32, duration: f32) -> [f64; 6] {
    let x0 = f64::from(x0);
    let vt = f64::from(v0) * f64::from(duration);

    let at2 = (-8. * vt - 20. * x0).max(0.);
    let a = -(at2 + 6. * vt + 12. * x0) / 2.;
    let b = (3. * at2 + 16. * vt + 30. * x0) / 2.;
    let c = -(3. * at2 + 12. * vt + 20. * x0) / 2.;

    [x0, vt, at2 / 2., c, b, a]
}

/// Stateless evaluation of the decay curve at time `t`.
pub fn inertialize(x0: f32, v0: f32, duration: f32, t: f32) -> f32 {
    QuinticDecay::new(x0, v0, duration).value_at(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASES: [(f32, f32, f32); 6] = [
        (1., 0., 0.5),
        (1., -1., 0.5),
        (0.5, -4., 0.25),
        (2., -0.5, 1.),
        (-1., 1., 0.5),
        (0.3, 0., 0.2),
    ];

    #[test]
    fn boundary_conditions() {
        for (x0, v0, duration) in CASES {
            let decay = QuinticDecay::new(x0, v0, duration);
            let end = decay.duration();

            assert!((decay.value_at(0.) - x0).abs() < 1e-4, "f(0) for {x0} {v0}");
            assert_eq!(decay.value_at(end), 0.);
            assert!(decay.velocity_at(end).abs() < 1e-4, "f'(T) for {x0} {v0}");
            assert!((decay.velocity_at(0.) - decay.initial_velocity()).abs() < 1e-4);
        }
    }

    #[test]
    fn duration_shortened_to_crossing_time() {
        // -5 * 0.5 / -4 = 0.625 is longer than the request
        assert_eq!(QuinticDecay::new(0.5, -4., 0.25).duration(), 0.25);
        // -5 * 1 / -20 = 0.25 is shorter than the request
        let decay = QuinticDecay::new(1., -20., 0.5);
        assert!((decay.duration() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn advance_completes_and_clamps_time() {
        for (x0, v0, duration) in CASES {
            let mut decay = QuinticDecay::new(x0, v0, duration);
            let mut total = 0.;
            while total < duration {
                decay.advance(1. / 60.);
                total += 1. / 60.;
                assert!(decay.elapsed() <= decay.duration());
            }
            assert!(decay.is_done());
            assert_eq!(decay.advance(1.), 0.);
            assert_eq!(decay.elapsed(), decay.duration());
        }
    }

    #[test]
    fn never_overshoots() {
        for (x0, v0, duration) in CASES {
            let decay = QuinticDecay::new(x0, v0, duration);
            for i in 0..=100 {
                let t = decay.duration() * i as f32 / 100.;
                let value = decay.value_at(t);
                assert!(value.abs() <= x0.abs());
                assert!(value == 0. || value.signum() == x0.signum());
            }
        }
    }

    /// Offsets, velocities and durations over a grid, including ones that shorten the duration.
    fn sweep() -> impl Iterator<Item = (f32, f32, f32)> {
        let offsets = [-2., -1.7, -0.3, -0.01, 0.01, 0.5, 1.7, 2.];
        let velocities = [-8., -2.5, -0.5, -0.05, 0., 0.05, 0.5, 2.5, 8.];
        let durations = [0.05, 0.1, 0.25, 0.5, 1.];
        offsets.into_iter().flat_map(move |x0| {
            velocities
                .into_iter()
                .flat_map(move |v0| durations.into_iter().map(move |d| (x0, v0, d)))
        })
    }

    #[test]
    fn sweep_holds_end_conditions() {
        for (x0, v0, duration) in sweep() {
            let decay = QuinticDecay::new(x0, v0, duration);
            let end = decay.duration();

            assert!(end > 0. && end <= duration);
            assert_eq!(decay.value_at(0.), x0);
            assert_eq!(decay.value_at(end), 0.);
            let terminal = decay.velocity_at(end);
            assert!(terminal.abs() < 1e-5, "f'(T) = {terminal} for {x0} {v0} {duration}");
            for i in 0..=50 {
                let value = decay.value_at(end * i as f32 / 50.);
                assert!(value.abs() <= x0.abs());
                assert!(value == 0. || value.signum() == x0.signum());
            }
        }
    }

    #[test]
    fn zero_duration_is_done_immediately() {
        let decay = QuinticDecay::new(1., 0., 0.);
        assert!(decay.is_done());
        assert_eq!(decay.value_at(0.), 0.);
        assert_eq!(inertialize(1., 0., 0., 0.), 0.);
    }
}
