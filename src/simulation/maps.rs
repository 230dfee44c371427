//! Engine lookup surfaces
//!
//! `TorqueMap` maps (throttle, relative rpm) to a relative torque
//! fraction; `ConsumptionMap` maps (relative rpm, relative torque) to a
//! relative fuel-consumption multiplier. Both clamp their inputs to the
//! map domain so a lookup can never produce NaN.

/// One piecewise-linear torque curve over relative rpm, valid for a
/// fixed throttle position.
#[derive(Debug, Clone)]
struct ThrottleRamp {
    throttle: f64,
    /// (relative rpm, relative torque) breakpoints, ascending in rpm
    points: Vec<(f64, f64)>,
}

/// Interpolation surface (throttle, rel rpm) -> rel torque in [0, 1]
#[derive(Debug, Clone)]
pub struct TorqueMap {
    ramps: Vec<ThrottleRamp>,
}

impl Default for TorqueMap {
    fn default() -> Self {
        // Gasoline-engine shape: torque peaks a little past mid rpm and
        // tails off toward the rev limit.
        Self {
            ramps: vec![
                ThrottleRamp {
                    throttle: 0.0,
                    points: vec![(0.0, 0.0), (1.0, 0.0)],
                },
                ThrottleRamp {
                    throttle: 0.2,
                    points: vec![
                        (0.0, 0.10),
                        (0.2, 0.16),
                        (0.5, 0.18),
                        (0.8, 0.14),
                        (1.0, 0.10),
                    ],
                },
                ThrottleRamp {
                    throttle: 0.5,
                    points: vec![
                        (0.0, 0.25),
                        (0.2, 0.40),
                        (0.5, 0.48),
                        (0.8, 0.42),
                        (1.0, 0.33),
                    ],
                },
                ThrottleRamp {
                    throttle: 0.8,
                    points: vec![
                        (0.0, 0.38),
                        (0.2, 0.66),
                        (0.5, 0.80),
                        (0.8, 0.72),
                        (1.0, 0.58),
                    ],
                },
                ThrottleRamp {
                    throttle: 1.0,
                    points: vec![
                        (0.0, 0.45),
                        (0.2, 0.82),
                        (0.55, 1.0),
                        (0.8, 0.92),
                        (1.0, 0.75),
                    ],
                },
            ],
        }
    }
}

impl TorqueMap {
    /// Relative torque for the given throttle and relative rpm.
    pub fn torque(&self, throttle: f64, rel_rpm: f64) -> f64 {
        let throttle = throttle.clamp(0.0, 1.0);
        let rel_rpm = rel_rpm.clamp(0.0, 1.0);

        let mut lower = &self.ramps[0];
        let mut upper = &self.ramps[self.ramps.len() - 1];
        for window in self.ramps.windows(2) {
            if throttle >= window[0].throttle && throttle <= window[1].throttle {
                lower = &window[0];
                upper = &window[1];
                break;
            }
        }

        let lo = lerp_curve(&lower.points, rel_rpm);
        let hi = lerp_curve(&upper.points, rel_rpm);
        let span = upper.throttle - lower.throttle;
        if span <= 0.0 {
            return lo;
        }
        let t = (throttle - lower.throttle) / span;
        lo + (hi - lo) * t
    }
}

/// Elliptical BSFC-style surface around the engine's sweet spot.
///
/// The multiplier is 1.0 at the sweet spot and grows with the
/// normalized elliptical distance from it.
#[derive(Debug, Clone)]
pub struct ConsumptionMap {
    pub sweet_rel_rpm: f64,
    pub sweet_rel_torque: f64,
    pub rpm_radius: f64,
    pub torque_radius: f64,
    pub growth: f64,
}

impl Default for ConsumptionMap {
    fn default() -> Self {
        Self {
            sweet_rel_rpm: 0.35,
            sweet_rel_torque: 0.8,
            rpm_radius: 0.65,
            torque_radius: 0.8,
            growth: 1.5,
        }
    }
}

impl ConsumptionMap {
    /// Relative consumption multiplier, always >= 1.0.
    pub fn rel_consumption(&self, rel_rpm: f64, rel_torque: f64) -> f64 {
        let r = rel_rpm.clamp(0.0, 1.0);
        let t = rel_torque.clamp(0.0, 1.0);
        let dr = (r - self.sweet_rel_rpm) / self.rpm_radius;
        let dt = (t - self.sweet_rel_torque) / self.torque_radius;
        1.0 + self.growth * (dr * dr + dt * dt).sqrt()
    }
}

/// Linear interpolation along a breakpoint curve; clamps outside the
/// breakpoint range.
fn lerp_curve(points: &[(f64, f64)], x: f64) -> f64 {
    match points.first() {
        Some(&(first_x, first_y)) => {
            if x <= first_x {
                return first_y;
            }
        }
        None => return 0.0,
    }
    for window in points.windows(2) {
        let (x0, y0) = window[0];
        let (x1, y1) = window[1];
        if x <= x1 {
            if x1 - x0 <= 0.0 {
                return y1;
            }
            let t = (x - x0) / (x1 - x0);
            return y0 + (y1 - y0) * t;
        }
    }
    points.last().map(|&(_, y)| y).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torque_zero_at_closed_throttle() {
        let map = TorqueMap::default();
        assert_eq!(map.torque(0.0, 0.0), 0.0);
        assert_eq!(map.torque(0.0, 0.7), 0.0);
    }

    #[test]
    fn torque_peaks_at_full_throttle_mid_rpm() {
        let map = TorqueMap::default();
        let peak = map.torque(1.0, 0.55);
        assert!((peak - 1.0).abs() < 1e-9);
        assert!(map.torque(1.0, 0.1) < peak);
        assert!(map.torque(1.0, 1.0) < peak);
    }

    #[test]
    fn torque_monotonic_in_throttle() {
        let map = TorqueMap::default();
        for rel_rpm in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let mut prev = -1.0;
            for throttle in [0.0, 0.2, 0.4, 0.6, 0.8, 1.0] {
                let t = map.torque(throttle, rel_rpm);
                assert!(t >= prev, "torque dropped with more throttle");
                prev = t;
            }
        }
    }

    #[test]
    fn torque_never_nan_on_wild_input() {
        let map = TorqueMap::default();
        for &(throttle, rel_rpm) in &[(-1.0, 0.5), (2.0, 0.5), (0.5, -3.0), (0.5, 9.0)] {
            assert!(map.torque(throttle, rel_rpm).is_finite());
        }
    }

    #[test]
    fn consumption_minimal_at_sweet_spot() {
        let map = ConsumptionMap::default();
        let best = map.rel_consumption(map.sweet_rel_rpm, map.sweet_rel_torque);
        assert!((best - 1.0).abs() < 1e-12);
        assert!(map.rel_consumption(1.0, 0.1) > best);
        assert!(map.rel_consumption(0.05, 0.9) > best);
    }
}
