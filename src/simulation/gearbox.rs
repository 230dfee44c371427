//! Gearbox and clutch
//!
//! The gear index is discrete; torque transfer is continuous through
//! the clutch engagement fraction, so a shift never steps the wheel
//! torque. `auto_clutch_control` is the control law bridging the two:
//! it ramps engagement toward lock while engine and wheel-implied rpm
//! converge and ramps it open when they diverge or the wheels would
//! drag the engine below stall.

use super::engine::Engine;

/// Lowest selectable gear (reverse)
pub const MIN_GEAR: i32 = -1;
/// Highest selectable gear
pub const MAX_GEAR: i32 = 5;
/// Gear selected after a reset
pub const START_GEAR: i32 = 1;

/// Wheel-implied engine rpm below which the clutch opens to protect
/// against stalling [1/min]
const STALL_RPM: f64 = 600.0;
/// Engine rpm at which the launch slip reaches its maximum [1/min]
const LAUNCH_RPM: f64 = 2000.0;
/// Maximum engagement while slipping off the line
const LAUNCH_MAX_FRACTION: f64 = 0.5;
/// Engine/wheel rpm mismatch that forces the clutch open [1/min]
const RPM_MISMATCH_DISENGAGE: f64 = 1500.0;
/// Engagement ramp rate [fraction/s]
const ENGAGE_RATE: f64 = 1.5;
/// Disengagement ramp rate [fraction/s]
const DISENGAGE_RATE: f64 = 3.0;

/// Clutch: a locked flag plus the continuous engagement fraction used
/// to blend engine and wheel angular velocities while slipping.
#[derive(Debug, Clone)]
pub struct Clutch {
    pub engaged: bool,
    /// Engagement in [0, 1]; 1 = locked
    pub fraction: f64,
}

impl Default for Clutch {
    fn default() -> Self {
        Self {
            engaged: false,
            fraction: 0.0,
        }
    }
}

impl Clutch {
    pub fn disengage(&mut self) {
        self.engaged = false;
        self.fraction = 0.0;
    }

    /// Move the engagement fraction toward `target` at `rate` per
    /// second, updating the locked flag.
    fn ramp_toward(&mut self, target: f64, rate: f64, dt: f64) {
        let step = rate * dt;
        if self.fraction < target {
            self.fraction = (self.fraction + step).min(target);
        } else {
            self.fraction = (self.fraction - step).max(target);
        }
        self.fraction = self.fraction.clamp(0.0, 1.0);
        self.engaged = self.fraction >= 1.0;
    }
}

#[derive(Debug, Clone)]
pub struct Gearbox {
    pub clutch: Clutch,
    /// Selected gear: -1 reverse, 0 neutral, 1..=5 forward
    gear: i32,
    pub gear_ratios: [f64; 5],
    pub reverse_ratio: f64,
    pub final_drive: f64,
    /// Wheel radius [m]
    pub wheel_radius: f64,
}

impl Default for Gearbox {
    fn default() -> Self {
        Self {
            clutch: Clutch::default(),
            gear: START_GEAR,
            gear_ratios: [3.91, 2.29, 1.55, 1.16, 0.94],
            reverse_ratio: -3.65,
            final_drive: 3.65,
            wheel_radius: 0.3,
        }
    }
}

impl Gearbox {
    pub fn gear(&self) -> i32 {
        self.gear
    }

    /// No-op at the top gear.
    pub fn gear_up(&mut self) {
        if self.gear < MAX_GEAR {
            self.gear += 1;
        }
    }

    /// No-op at reverse.
    pub fn gear_down(&mut self) {
        if self.gear > MIN_GEAR {
            self.gear -= 1;
        }
    }

    /// Select a gear directly (replay). Out-of-range input indicates a
    /// corrupt log; it is clamped defensively.
    pub fn set_gear(&mut self, gear: i32) {
        debug_assert!((MIN_GEAR..=MAX_GEAR).contains(&gear), "gear {gear} out of range");
        self.gear = gear.clamp(MIN_GEAR, MAX_GEAR);
    }

    /// Back to the starting gear with the clutch open.
    pub fn reset(&mut self) {
        self.gear = START_GEAR;
        self.clutch.disengage();
    }

    /// Overall crankshaft-to-wheel ratio, `None` in neutral.
    pub fn ratio(&self) -> Option<f64> {
        match self.gear {
            0 => None,
            g if g < 0 => Some(self.reverse_ratio * self.final_drive),
            g => Some(self.gear_ratios[(g - 1) as usize] * self.final_drive),
        }
    }

    /// Force at the wheels for the given engine output torque, scaled
    /// by the clutch engagement [N].
    pub fn wheel_force(&self, torque_out: f64) -> f64 {
        match self.ratio() {
            Some(ratio) => self.clutch.fraction * torque_out * ratio / self.wheel_radius,
            None => 0.0,
        }
    }

    /// Engine rpm implied by the wheel speed in the current gear,
    /// `None` in neutral.
    pub fn engine_rpm_for_speed(&self, speed: f64) -> Option<f64> {
        self.ratio().map(|ratio| {
            let wheel_omega = speed / self.wheel_radius;
            wheel_omega * ratio.abs() * 60.0 / (2.0 * std::f64::consts::PI)
        })
    }

    /// Auto-clutch control law, run once per active tick.
    pub fn auto_clutch_control(&mut self, engine: &Engine, speed: f64, dt: f64) {
        let road_rpm = match self.engine_rpm_for_speed(speed) {
            Some(rpm) => rpm,
            None => {
                // neutral transfers nothing
                self.clutch.ramp_toward(0.0, DISENGAGE_RATE, dt);
                return;
            }
        };

        if road_rpm < STALL_RPM {
            // Launch regime: slip proportional to the rpm overhead the
            // engine has built above idle.
            let overhead =
                (engine.rpm() - engine.idle_rpm) / (LAUNCH_RPM - engine.idle_rpm);
            let target = (overhead * LAUNCH_MAX_FRACTION).clamp(0.0, LAUNCH_MAX_FRACTION);
            self.clutch.ramp_toward(target, ENGAGE_RATE, dt);
        } else if (engine.rpm() - road_rpm).abs() > RPM_MISMATCH_DISENGAGE {
            // Sharp divergence, e.g. right after a shift
            self.clutch.ramp_toward(0.0, DISENGAGE_RATE, dt);
        } else {
            self.clutch.ramp_toward(1.0, ENGAGE_RATE, dt);
        }
    }
}

pub fn speed_to_kmh(speed: f64) -> f64 {
    speed * 3.6
}

pub fn kmh_to_speed(kmh: f64) -> f64 {
    kmh / 3.6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gear_changes_saturate_at_range_ends() {
        let mut gearbox = Gearbox::default();
        for _ in 0..10 {
            gearbox.gear_up();
        }
        assert_eq!(gearbox.gear(), MAX_GEAR);
        for _ in 0..10 {
            gearbox.gear_down();
        }
        assert_eq!(gearbox.gear(), MIN_GEAR);
    }

    #[test]
    fn neutral_transfers_no_force() {
        let mut gearbox = Gearbox::default();
        gearbox.set_gear(0);
        gearbox.clutch.fraction = 1.0;
        assert_eq!(gearbox.wheel_force(200.0), 0.0);
        assert!(gearbox.engine_rpm_for_speed(20.0).is_none());
    }

    #[test]
    fn wheel_force_scales_with_engagement() {
        let mut gearbox = Gearbox::default();
        gearbox.set_gear(1);
        gearbox.clutch.fraction = 1.0;
        let full = gearbox.wheel_force(100.0);
        gearbox.clutch.fraction = 0.5;
        let half = gearbox.wheel_force(100.0);
        assert!((half - 0.5 * full).abs() < 1e-9);
        gearbox.clutch.fraction = 0.0;
        assert_eq!(gearbox.wheel_force(100.0), 0.0);
    }

    #[test]
    fn engagement_ramp_is_continuous() {
        let mut gearbox = Gearbox::default();
        let mut engine = Engine::new(7000.0, 240.0);
        gearbox.set_gear(3);
        // 50 km/h in third gear sits well above the stall band; match
        // the engine to the wheel-implied rpm so the law ramps closed
        let speed = kmh_to_speed(50.0);
        engine
            .set_rpm(gearbox.engine_rpm_for_speed(speed).unwrap())
            .unwrap();
        let dt = 0.05;
        let mut prev = gearbox.clutch.fraction;
        let mut max_step: f64 = 0.0;
        for _ in 0..50 {
            gearbox.auto_clutch_control(&engine, speed, dt);
            max_step = max_step.max((gearbox.clutch.fraction - prev).abs());
            prev = gearbox.clutch.fraction;
        }
        assert!(gearbox.clutch.engaged, "clutch should lock eventually");
        assert!(max_step <= ENGAGE_RATE * dt + 1e-9, "engagement stepped");
    }

    #[test]
    fn clutch_opens_near_stall() {
        let mut gearbox = Gearbox::default();
        let mut engine = Engine::new(7000.0, 240.0);
        engine.set_rpm(700.0).unwrap();
        gearbox.set_gear(1);
        gearbox.clutch.fraction = 1.0;
        gearbox.clutch.engaged = true;
        // walking pace in first gear implies a sub-stall engine rpm
        for _ in 0..100 {
            gearbox.auto_clutch_control(&engine, 0.2, 0.05);
        }
        assert!(!gearbox.clutch.engaged);
        assert!(gearbox.clutch.fraction < 0.1);
    }

    #[test]
    fn reset_returns_to_start_gear_disengaged() {
        let mut gearbox = Gearbox::default();
        gearbox.set_gear(4);
        gearbox.clutch.fraction = 1.0;
        gearbox.clutch.engaged = true;
        gearbox.reset();
        assert_eq!(gearbox.gear(), START_GEAR);
        assert!(!gearbox.clutch.engaged);
        assert_eq!(gearbox.clutch.fraction, 0.0);
    }

    #[test]
    fn kmh_conversion_round_trip() {
        assert!((speed_to_kmh(kmh_to_speed(50.0)) - 50.0).abs() < 1e-12);
    }
}
