//! Driving session: per-tick orchestration of car, consumption
//! accounting and sign observers over one track.
//!
//! The session is single-owner and synchronous: one `tick` advances
//! everything. It can be driven live (caller-supplied inputs, each
//! tick recorded) or in replay (inputs pulled from a recorded log);
//! both paths produce bit-identical speed values and violation events
//! for identical input sequences.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::car::Car;
use super::consumption::ConsumptionMonitor;
use super::log::DrivingLog;
use super::observers::{
    ObserverContext, SignObserver, SpeedObserver, StopSignObserver, TooSlowObserver,
    TrafficLightObserver,
};
use super::types::{
    Sign, SignKind, TelemetrySample, Track, TrafficEvent, TrafficEventKind, TrafficLightInfo,
};

/// Arc-length position the car starts at [m]
pub const INITIAL_POSITION: f64 = 40.0;

/// Per-tick control inputs supplied by the caller in live mode
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlInput {
    /// Throttle in [0, 1]
    pub throttle: f64,
    /// Brake in [0, 1]
    pub braking: f64,
    /// +1 shift up, -1 shift down, 0 keep gear
    pub gear_change: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// The car crossed the track end (or the replay log ran out)
    Finished,
}

pub struct DrivingSession {
    pub car: Car,
    pub track: Track,
    pub consumption_monitor: ConsumptionMonitor,
    observers: Vec<Box<dyn SignObserver>>,
    rng: StdRng,
    seed: u64,

    /// Car position along the track [m]
    pub position: f64,
    /// Time since the run started [s]
    pub time: f64,
    /// Latched once the driver first opens the throttle
    pub started: bool,
    pub finished: bool,
    pub replay: bool,
    replay_index: usize,

    /// Record of the current live run
    pub log: Option<DrivingLog>,
    /// Violations/advisories, appended in firing order
    pub events: Vec<TrafficEvent>,
    /// Pending samples for the external telemetry sink
    pub telemetry: Vec<TelemetrySample>,
}

impl DrivingSession {
    /// A session over the given track. `seed` drives the only source of
    /// randomness (traffic-light countdowns), so equal seeds mean
    /// reproducible runs.
    pub fn new(car: Car, track: Track, seed: u64) -> Self {
        let observers: Vec<Box<dyn SignObserver>> = vec![
            Box::new(SpeedObserver::new(&track)),
            Box::new(StopSignObserver::new(&track)),
            Box::new(TrafficLightObserver::new(&track)),
            Box::new(TooSlowObserver::new()),
        ];
        Self {
            car,
            track,
            consumption_monitor: ConsumptionMonitor::default(),
            observers,
            rng: StdRng::seed_from_u64(seed),
            seed,
            position: INITIAL_POSITION,
            time: 0.0,
            started: false,
            finished: false,
            replay: false,
            replay_index: 0,
            log: None,
            events: Vec::new(),
            telemetry: Vec::new(),
        }
    }

    /// A small session for console runs and tests: a 3 km track with
    /// one sign of every kind.
    pub fn create_test_session(seed: u64) -> Self {
        let track = Track::new(
            3000.0,
            vec![
                Sign::new(SignKind::SpeedLimit(50), 400.0),
                Sign::new(SignKind::Stop, 900.0),
                Sign::traffic_light(
                    1600.0,
                    TrafficLightInfo {
                        trigger_distance: 400.0,
                        time_range: (4000.0, 8000.0),
                    },
                ),
                Sign::new(SignKind::SpeedLimit(100), 2000.0),
            ],
        );
        Self::new(Car::new(), track, seed)
    }

    /// Reset for a fresh live run.
    pub fn reset(&mut self) {
        self.reset_shared();
        self.car.reset(false);
        self.log = None;
        self.replay = false;
        self.started = false;
    }

    /// Switch the session to replaying the given log. The car state is
    /// reset and the engine restored to the recorded initial speed.
    pub fn start_replay(&mut self, log: DrivingLog) -> Result<()> {
        if !log.initial_angular_velocity.is_finite() {
            bail!(
                "log carries a non-finite initial angular velocity: {}",
                log.initial_angular_velocity
            );
        }
        self.reset_shared();
        self.car.reset(true);
        self.car.engine.angular_velocity = log.initial_angular_velocity;
        self.log = Some(log);
        self.replay = true;
        self.replay_index = 0;
        // replay logs start at the first throttle tick
        self.started = true;
        info!("replay started ({} ticks)", self.log.as_ref().map_or(0, |l| l.items.len()));
        Ok(())
    }

    fn reset_shared(&mut self) {
        self.consumption_monitor.reset();
        for observer in &mut self.observers {
            observer.reset();
        }
        self.rng = StdRng::seed_from_u64(self.seed);
        self.position = INITIAL_POSITION;
        self.time = 0.0;
        self.finished = false;
        self.replay_index = 0;
        self.events.clear();
        self.telemetry.clear();
    }

    /// Advance one live tick. `alpha` is the road slope at the current
    /// position [rad], supplied by the caller together with `dt`.
    pub fn tick(&mut self, dt: f64, alpha: f64, input: &ControlInput) -> Result<TickOutcome> {
        if self.replay {
            bail!("session is replaying; use tick_replay");
        }
        if self.finished {
            return Ok(TickOutcome::Finished);
        }
        if !dt.is_finite() || dt <= 0.0 {
            bail!("time step must be positive, got {dt}");
        }

        self.car.throttle = input.throttle.clamp(0.0, 1.0);
        self.car.braking = input.braking.clamp(0.0, 1.0);
        if input.gear_change > 0 {
            self.car.gearbox.gear_up();
        } else if input.gear_change < 0 {
            self.car.gearbox.gear_down();
        }

        if !self.started {
            if self.car.throttle > 0.0 {
                self.started = true;
                self.log = Some(DrivingLog::new(self.car.engine.angular_velocity));
                debug!(
                    "run started at {:.0} rpm",
                    self.car.engine.rpm()
                );
            } else {
                // idling before the run; nothing moves, nothing is logged
                return Ok(TickOutcome::Running);
            }
        }

        let outcome = self.step(dt, alpha)?;

        let (throttle, braking, gear) = (self.car.throttle, self.car.braking, self.car.gearbox.gear());
        if let Some(log) = &mut self.log {
            log.add_item(throttle, braking, gear, dt, alpha);
        }

        if outcome == TickOutcome::Finished {
            let liters_used = self.consumption_monitor.liters_used;
            let elapsed = self.time;
            if let Some(log) = &mut self.log {
                log.elapsed_time = elapsed;
                log.liters_used = liters_used;
            }
            info!(
                "track finished: {:.1} s, {:.3} L used, {} violation(s)",
                elapsed,
                liters_used,
                self.violation_count()
            );
        }
        Ok(outcome)
    }

    /// Advance one replay tick, pulling dt and inputs from the log.
    pub fn tick_replay(&mut self) -> Result<TickOutcome> {
        if !self.replay {
            bail!("session is not replaying");
        }
        if self.finished {
            return Ok(TickOutcome::Finished);
        }
        let item = {
            let log = self.log.as_ref().context("replay without a log")?;
            match log.items.get(self.replay_index) {
                Some(item) => *item,
                None => {
                    self.finished = true;
                    return Ok(TickOutcome::Finished);
                }
            }
        };
        self.replay_index += 1;

        self.car.throttle = item.throttle;
        self.car.braking = item.braking;
        self.car.gearbox.set_gear(item.gear);

        self.step(item.dt, item.alpha)
    }

    /// The shared part of a live and a replay tick.
    fn step(&mut self, dt: f64, alpha: f64) -> Result<TickOutcome> {
        self.car.auto_clutch(dt);
        self.car.tick(dt, alpha, self.replay)?;

        self.consumption_monitor.tick(
            self.car.engine.consumption_l_s(),
            dt,
            self.car.speed,
            &mut self.telemetry,
        );

        self.position += self.car.speed * dt;
        self.time += dt;

        let mut ctx = ObserverContext {
            track: &self.track,
            position: self.position,
            speed: self.car.speed,
            t: self.time,
            dt,
            replay: self.replay,
            rng: &mut self.rng,
        };
        for observer in &mut self.observers {
            observer.tick(&mut ctx, &mut self.events);
        }

        if self.position >= self.track.length {
            self.finished = true;
            return Ok(TickOutcome::Finished);
        }
        if self.track.max_time > 0.0 && self.time >= self.track.max_time {
            warn!("time limit of {:.0} s reached", self.track.max_time);
            self.finished = true;
            return Ok(TickOutcome::Finished);
        }
        Ok(TickOutcome::Running)
    }

    /// Number of violations recorded so far (advisories excluded).
    pub fn violation_count(&self) -> usize {
        self.events.iter().filter(|e| e.kind.is_violation()).count()
    }

    /// Hand pending telemetry samples to the external sink.
    pub fn drain_telemetry(&mut self) -> Vec<TelemetrySample> {
        std::mem::take(&mut self.telemetry)
    }

    /// Hand recorded events to the display/audio/logging collaborator.
    pub fn drain_events(&mut self) -> Vec<TrafficEvent> {
        std::mem::take(&mut self.events)
    }

    /// Print a run summary to stdout.
    pub fn print_summary(&self) {
        println!("=== Driving Session Summary ===");
        println!("Time: {:.2}s", self.time);
        println!(
            "Position: {:.1}/{:.0} m{}",
            self.position,
            self.track.length,
            if self.finished { " (finished)" } else { "" }
        );
        println!(
            "Speed: {:.1} km/h, gear {}, {:.0} rpm",
            super::gearbox::speed_to_kmh(self.car.speed),
            self.car.gearbox.gear(),
            self.car.engine.rpm()
        );
        println!("Fuel used: {:.4} L", self.consumption_monitor.liters_used);
        for kind in [
            TrafficEventKind::Speeding,
            TrafficEventKind::StopSign,
            TrafficEventKind::TrafficLight,
            TrafficEventKind::TooSlow,
        ] {
            let count = self.events.iter().filter(|e| e.kind == kind).count();
            if count > 0 {
                println!("  {:?}: {}", kind, count);
            }
        }
    }
}
