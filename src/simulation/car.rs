//! Car integration: one tick combines engine torque, clutch transfer,
//! and road-load resistances into a new speed.

use anyhow::{bail, Result};

use super::engine::{rpm_to_angular_velocity, Engine};
use super::gearbox::Gearbox;
use super::resistances;

/// How fast a slipping clutch pulls the engine toward the wheel speed
/// [1/s at full engagement]
const CLUTCH_COUPLING_RATE: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct Car {
    /// Vehicle mass [kg]
    pub mass: f64,
    /// Forward speed [m/s], never negative
    pub speed: f64,
    /// Throttle input in [0, 1]
    pub throttle: f64,
    /// Brake input in [0, 1]
    pub braking: f64,
    /// Force at full brake input [N]
    pub max_braking_force: f64,
    pub drag_resistance_coefficient: f64,
    pub rolling_resistance_coefficient: f64,

    /// Sum of resistive forces from the last tick [N]
    pub current_resistance: f64,
    /// Acceleration from the last tick [m/s^2]
    pub current_acceleration: f64,

    pub engine: Engine,
    pub gearbox: Gearbox,
}

impl Default for Car {
    fn default() -> Self {
        Self::new()
    }
}

impl Car {
    pub fn new() -> Self {
        Self {
            mass: 1500.0,
            speed: 0.0,
            throttle: 0.0,
            braking: 0.0,
            max_braking_force: 20000.0,
            drag_resistance_coefficient: resistances::drag_coefficient(0.3, 2.0),
            rolling_resistance_coefficient: 0.015,
            current_resistance: 0.0,
            current_acceleration: 0.0,
            engine: Engine::new(7000.0, 240.0),
            gearbox: Gearbox::default(),
        }
    }

    /// Reset for a new run. Replay keeps the engine state because the
    /// log restores its own initial angular velocity.
    pub fn reset(&mut self, replay: bool) {
        if !replay {
            self.engine.reset();
        }
        self.gearbox.reset();
        self.speed = 0.0;
        self.throttle = 0.0;
        self.braking = 0.0;
        self.current_resistance = 0.0;
        self.current_acceleration = 0.0;
    }

    /// Run the auto-clutch control law for this tick.
    pub fn auto_clutch(&mut self, dt: f64) {
        let Self {
            engine,
            gearbox,
            speed,
            ..
        } = self;
        gearbox.auto_clutch_control(engine, *speed, dt);
    }

    /// Advance the car by `dt` seconds on a road with slope `alpha`
    /// [rad, uphill positive]. Returns the acceleration [m/s^2].
    ///
    /// Deterministic in (dt, alpha, prior state): the same inputs
    /// always reproduce the same acceleration.
    pub fn tick(&mut self, dt: f64, alpha: f64, _replay: bool) -> Result<f64> {
        if !dt.is_finite() || dt <= 0.0 {
            bail!("time step must be positive, got {dt}");
        }
        if !alpha.is_finite() {
            bail!("road slope must be finite, got {alpha}");
        }

        let torque_out = self.engine.update_torque(self.throttle);
        let wheel_force = self.gearbox.wheel_force(torque_out);

        // Drag, rolling resistance and the brake only oppose motion.
        let moving = self.speed > 0.0;
        let resistance = if moving {
            resistances::drag_force(self.drag_resistance_coefficient, self.speed)
                + resistances::rolling_force(
                    self.rolling_resistance_coefficient,
                    self.mass,
                    alpha,
                )
        } else {
            0.0
        };
        let brake_force = if moving {
            self.braking.clamp(0.0, 1.0) * self.max_braking_force
        } else {
            0.0
        };
        let slope = resistances::slope_force(self.mass, alpha);

        let force = wheel_force - resistance - brake_force - slope;
        let acceleration = force / self.mass;
        debug_assert!(acceleration.is_finite());

        self.speed = (self.speed + acceleration * dt).max(0.0);
        self.current_resistance = resistance + brake_force;
        self.current_acceleration = acceleration;

        self.update_engine_speed(dt);
        Ok(acceleration)
    }

    /// Blend the crankshaft speed between free revving and the
    /// wheel-implied speed according to the clutch engagement.
    fn update_engine_speed(&mut self, dt: f64) {
        let fraction = self.gearbox.clutch.fraction;
        let free_domega = self.engine.torque_out / self.engine.inertia * dt;
        let mut omega = self.engine.angular_velocity + (1.0 - fraction) * free_domega;

        if let Some(road_rpm) = self.gearbox.engine_rpm_for_speed(self.speed) {
            let road_omega = rpm_to_angular_velocity(road_rpm);
            if self.gearbox.clutch.engaged {
                omega = road_omega;
            } else if fraction > 0.0 {
                omega += fraction * (road_omega - omega) * (dt * CLUTCH_COUPLING_RATE).min(1.0);
            }
        }

        let idle_omega = rpm_to_angular_velocity(self.engine.idle_rpm);
        let max_omega = rpm_to_angular_velocity(self.engine.max_rpm);
        if !self.gearbox.clutch.engaged {
            // idle governor while the driveline cannot stall the engine
            omega = omega.max(idle_omega);
        }
        self.engine.angular_velocity = omega.clamp(0.0, max_omega);
    }
}
