//! Engine model: rpm state, torque production, fuel consumption
//!
//! Torque comes from the torque map scaled by the rated maximum; engine
//! braking only ever subtracts from it. Consumption goes through the
//! BSFC-style consumption map and a fixed fuel density.

use anyhow::{bail, Result};

use super::maps::{ConsumptionMap, TorqueMap};

/// Fuel density used for g <-> L conversion [kg/L]
pub const FUEL_DENSITY: f64 = 0.75;

#[derive(Debug, Clone)]
pub struct Engine {
    pub torque_map: TorqueMap,
    pub consumption_map: ConsumptionMap,

    /// Rated maximum rpm [1/min]
    pub max_rpm: f64,
    /// Rated maximum torque [N*m]
    pub max_torque: f64,
    pub engine_braking_coefficient: f64,
    /// Constant engine-braking term [N*m]
    pub engine_braking_offset: f64,
    /// Base consumption factor [g/kWh]
    pub base_consumption: f64,
    /// Throttle floor below idle; keeps the engine fuelled instead of
    /// cutting off (tunable, see Schubabschaltung handling)
    pub min_throttle: f64,
    /// Idle rpm the engine settles to [1/min]
    pub idle_rpm: f64,
    /// Crankshaft inertia [kg*m^2]
    pub inertia: f64,

    /// Current crankshaft angular velocity [rad/s]
    pub angular_velocity: f64,
    /// Raw torque from the last update [N*m]
    pub torque: f64,
    /// Output torque after engine braking from the last update [N*m]
    pub torque_out: f64,
}

impl Engine {
    pub fn new(max_rpm: f64, max_torque: f64) -> Self {
        let mut engine = Self {
            torque_map: TorqueMap::default(),
            consumption_map: ConsumptionMap::default(),
            max_rpm,
            max_torque,
            engine_braking_coefficient: 0.9,
            engine_braking_offset: 0.0,
            base_consumption: 100.0,
            min_throttle: 0.07,
            idle_rpm: 700.0,
            inertia: 0.13,
            angular_velocity: 0.0,
            torque: 0.0,
            torque_out: 0.0,
        };
        engine.reset();
        engine
    }

    /// Snap the engine back to idle (new session, not replay).
    pub fn reset(&mut self) {
        self.angular_velocity = rpm_to_angular_velocity(self.idle_rpm);
        self.torque = 0.0;
        self.torque_out = 0.0;
    }

    /// Compute output torque for the given throttle position (0..1).
    ///
    /// Below idle the throttle is raised to `min_throttle` so the fuel
    /// feed is never fully cut. Engine braking only subtracts: the
    /// result never exceeds the raw map torque.
    pub fn update_torque(&mut self, throttle: f64) -> f64 {
        let mut throttle = throttle.clamp(0.0, 1.0);
        if throttle < self.min_throttle && self.rpm() < self.idle_rpm {
            throttle = self.min_throttle;
        }
        self.torque = self.max_torque * self.torque_map.torque(throttle, self.rel_rpm());
        let braking = self.engine_braking_coefficient
            * (self.rpm().max(0.0) / 60.0).powf(1.1)
            + self.engine_braking_offset;
        self.torque_out = self.torque - braking;
        debug_assert!(self.torque_out.is_finite());
        debug_assert!(self.torque_out <= self.torque);
        // release builds clamp instead of aborting
        self.torque_out = self.torque_out.min(self.torque);
        self.torque_out
    }

    /// Mechanical power output [kW]
    pub fn power_output(&self) -> f64 {
        self.angular_velocity * self.torque / 1000.0
    }

    /// Fuel consumption at the current operating point [g/h]
    pub fn consumption(&self) -> f64 {
        let rel = self
            .consumption_map
            .rel_consumption(self.rel_rpm(), self.torque / self.max_torque);
        rel * self.base_consumption * self.power_output().max(0.0)
    }

    /// Fuel consumption [L/s]
    pub fn consumption_l_s(&self) -> f64 {
        self.consumption() / 1000.0 / FUEL_DENSITY / 3600.0
    }

    /// Consumption per distance [L/100km]; 0 when (nearly) standing.
    pub fn l_100km(&self, speed: f64) -> f64 {
        if speed < 1e-3 {
            return 0.0;
        }
        let grams_per_second = self.consumption() / 3600.0;
        let liters_per_meter = grams_per_second / (speed * 1000.0) / FUEL_DENSITY;
        liters_per_meter * 100.0 * 1000.0
    }

    pub fn rpm(&self) -> f64 {
        angular_velocity_to_rpm(self.angular_velocity)
    }

    pub fn rel_rpm(&self) -> f64 {
        self.rpm() / self.max_rpm
    }

    /// Set engine speed in rpm; a non-finite value is a recoverable
    /// input error, not a crash.
    pub fn set_rpm(&mut self, rpm: f64) -> Result<()> {
        if !rpm.is_finite() {
            bail!("engine rpm must be finite, got {rpm}");
        }
        self.angular_velocity = rpm_to_angular_velocity(rpm);
        Ok(())
    }
}

pub fn rpm_to_angular_velocity(rpm: f64) -> f64 {
    rpm * 2.0 * std::f64::consts::PI / 60.0
}

pub fn angular_velocity_to_rpm(angular_velocity: f64) -> f64 {
    angular_velocity * 30.0 / std::f64::consts::PI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpm_round_trip() {
        let mut engine = Engine::new(7000.0, 240.0);
        engine.set_rpm(3000.0).unwrap();
        assert!((engine.rpm() - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn set_rpm_rejects_nan() {
        let mut engine = Engine::new(7000.0, 240.0);
        assert!(engine.set_rpm(f64::NAN).is_err());
        assert!(engine.set_rpm(f64::INFINITY).is_err());
        // state untouched after the error
        assert!((engine.rpm() - engine.idle_rpm).abs() < 1e-9);
    }

    #[test]
    fn output_torque_never_exceeds_raw_torque() {
        let mut engine = Engine::new(7000.0, 240.0);
        for rpm in [0.0, 700.0, 2000.0, 4500.0, 7000.0] {
            engine.set_rpm(rpm).unwrap();
            for throttle in [0.0, 0.1, 0.5, 1.0] {
                let out = engine.update_torque(throttle);
                assert!(out.is_finite());
                assert!(out <= engine.torque);
            }
        }
    }

    #[test]
    fn throttle_floor_below_idle() {
        let mut engine = Engine::new(7000.0, 240.0);
        engine.set_rpm(500.0).unwrap();
        engine.update_torque(0.0);
        // the floor keeps some fuel flowing: raw torque stays positive
        assert!(engine.torque > 0.0);
    }

    #[test]
    fn no_throttle_floor_above_idle() {
        let mut engine = Engine::new(7000.0, 240.0);
        engine.set_rpm(3000.0).unwrap();
        engine.update_torque(0.0);
        assert_eq!(engine.torque, 0.0);
        // pure engine braking
        assert!(engine.torque_out < 0.0);
    }

    #[test]
    fn consumption_guards_standstill() {
        let mut engine = Engine::new(7000.0, 240.0);
        engine.set_rpm(2000.0).unwrap();
        engine.update_torque(0.5);
        assert_eq!(engine.l_100km(0.0), 0.0);
        assert_eq!(engine.l_100km(0.0009), 0.0);
        assert!(engine.l_100km(10.0) > 0.0);
    }

    #[test]
    fn reset_snaps_to_idle() {
        let mut engine = Engine::new(7000.0, 240.0);
        engine.set_rpm(5000.0).unwrap();
        engine.reset();
        assert!((engine.rpm() - engine.idle_rpm).abs() < 1e-9);
    }
}
