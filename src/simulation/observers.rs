//! Sign observers
//!
//! Independent finite-state machines watching the car's position and
//! speed against the track's sign data. Each observer keeps its own
//! cursor into the (immutable) sign list and emits at most one event
//! per tick. All observers reset to their initial state and replay
//! deterministically for an identical (position, speed, dt) trace.

use rand::rngs::StdRng;
use rand::Rng;

use super::gearbox::speed_to_kmh;
use super::types::{
    SignKind, Track, TrafficEvent, TrafficEventKind, TrafficLightPhase, DEFAULT_SPEED_LIMIT_KMH,
};

/// Arc-length before a stop sign at which compliance checking begins [m]
pub const STOP_TRIGGER_DISTANCE: f64 = 50.0;
/// Below this the car counts as standing [m/s] (0.5 km/h)
pub const STOP_SPEED_EPSILON: f64 = 0.5 / 3.6;
/// How long the car must stand for a compliant stop [s]
pub const STOP_DWELL_TIME: f64 = 1.0;
/// Debounce band around the active speed limit [km/h]
pub const SPEED_TOLERANCE_KMH: f64 = 0.5;
/// Advisory threshold for crawling traffic [km/h]
pub const TOO_SLOW_KMH: f64 = 10.0;
/// Grace period before the too-slow advisory fires [s]
pub const TOO_SLOW_GRACE: f64 = 5.0;
/// Fixed yellow-phase duration [s]
const YELLOW_TIME: f64 = 1.0;

/// Per-tick view of the vehicle handed to every observer
pub struct ObserverContext<'a> {
    pub track: &'a Track,
    /// Car position along the track [m]
    pub position: f64,
    /// Car speed [m/s]
    pub speed: f64,
    /// Session time [s]
    pub t: f64,
    pub dt: f64,
    pub replay: bool,
    /// Caller-owned seeded generator; the only randomness source
    pub rng: &'a mut StdRng,
}

impl ObserverContext<'_> {
    fn event(&self, kind: TrafficEventKind) -> TrafficEvent {
        TrafficEvent {
            kind,
            time: self.t,
            position: self.position,
        }
    }
}

/// Shared capability of all sign observers.
pub trait SignObserver {
    fn reset(&mut self);
    fn tick(&mut self, ctx: &mut ObserverContext<'_>, events: &mut Vec<TrafficEvent>);
}

/// State of the stop-sign machine for the sign under the cursor
#[derive(Debug, Clone, Copy)]
enum StopState {
    Approaching,
    AwaitingStop { dwell: f64, satisfied: bool },
}

/// Watches stop signs in arc-length order. A compliant pass requires
/// standing (speed below epsilon) for the dwell time before the sign;
/// crossing the sign without it raises exactly one violation.
pub struct StopSignObserver {
    /// Stop sign positions, ascending
    stops: Vec<f64>,
    cursor: usize,
    state: StopState,
}

impl StopSignObserver {
    pub fn new(track: &Track) -> Self {
        let stops = track
            .signs()
            .iter()
            .filter(|s| s.kind == SignKind::Stop)
            .map(|s| s.at_length.into_inner())
            .collect();
        Self {
            stops,
            cursor: 0,
            state: StopState::Approaching,
        }
    }
}

impl SignObserver for StopSignObserver {
    fn reset(&mut self) {
        self.cursor = 0;
        self.state = StopState::Approaching;
    }

    fn tick(&mut self, ctx: &mut ObserverContext<'_>, events: &mut Vec<TrafficEvent>) {
        let sign_pos = match self.stops.get(self.cursor) {
            Some(&pos) => pos,
            None => return, // no stop sign ahead
        };

        if let StopState::Approaching = self.state {
            if ctx.position >= sign_pos - STOP_TRIGGER_DISTANCE {
                self.state = StopState::AwaitingStop {
                    dwell: 0.0,
                    satisfied: false,
                };
            }
        }

        if let StopState::AwaitingStop { dwell, satisfied } = &mut self.state {
            if ctx.speed < STOP_SPEED_EPSILON {
                *dwell += ctx.dt;
                if *dwell >= STOP_DWELL_TIME {
                    *satisfied = true;
                }
            } else {
                *dwell = 0.0;
            }

            if ctx.position >= sign_pos {
                if !*satisfied {
                    events.push(ctx.event(TrafficEventKind::StopSign));
                }
                self.cursor += 1;
                self.state = StopState::Approaching;
            }
        }
    }
}

#[derive(Debug, Clone)]
struct LightRecord {
    at_length: f64,
    trigger_distance: f64,
    /// Countdown sampling range [ms]
    time_range: (f64, f64),
    phase: TrafficLightPhase,
    /// Remaining time in a timed phase [s]
    countdown: f64,
}

/// One phase machine per light sign; lights evolve independently and
/// concurrently. A crossing while the light is not green raises one
/// violation.
pub struct TrafficLightObserver {
    lights: Vec<LightRecord>,
    cursor: usize,
}

impl TrafficLightObserver {
    pub fn new(track: &Track) -> Self {
        let lights = track
            .signs()
            .iter()
            .filter(|s| s.kind == SignKind::TrafficLight)
            .map(|s| LightRecord {
                at_length: s.at_length.into_inner(),
                trigger_distance: s.light.trigger_distance,
                time_range: s.light.time_range,
                phase: TrafficLightPhase::Red,
                countdown: 0.0,
            })
            .collect();
        Self { lights, cursor: 0 }
    }

    /// Current phase of the n-th light sign (for display/telemetry).
    pub fn phase(&self, index: usize) -> Option<TrafficLightPhase> {
        self.lights.get(index).map(|l| l.phase)
    }
}

impl SignObserver for TrafficLightObserver {
    fn reset(&mut self) {
        self.cursor = 0;
        for light in &mut self.lights {
            light.phase = TrafficLightPhase::Red;
            light.countdown = 0.0;
        }
    }

    fn tick(&mut self, ctx: &mut ObserverContext<'_>, events: &mut Vec<TrafficEvent>) {
        for light in &mut self.lights {
            match light.phase {
                TrafficLightPhase::Red => {
                    let triggered = ctx.position >= light.at_length - light.trigger_distance
                        && ctx.position < light.at_length;
                    if triggered {
                        let (lo, hi) = light.time_range;
                        light.countdown = ctx.rng.random_range(lo..=hi) / 1000.0;
                        light.phase = TrafficLightPhase::RedPending;
                    }
                }
                TrafficLightPhase::RedPending => {
                    light.countdown -= ctx.dt;
                    if light.countdown <= 0.0 {
                        light.phase = TrafficLightPhase::Yellow;
                        light.countdown = YELLOW_TIME;
                    }
                }
                TrafficLightPhase::Yellow => {
                    light.countdown -= ctx.dt;
                    if light.countdown <= 0.0 {
                        light.phase = TrafficLightPhase::Green;
                    }
                }
                TrafficLightPhase::Green => {}
            }
        }

        while let Some(light) = self.lights.get(self.cursor) {
            if ctx.position < light.at_length {
                break;
            }
            if light.phase != TrafficLightPhase::Green {
                events.push(ctx.event(TrafficEventKind::TrafficLight));
            }
            self.cursor += 1;
        }
    }
}

/// Compares vehicle speed against the limit of the last speed sign
/// passed, debounced so one excursion yields one event.
pub struct SpeedObserver {
    /// (position, limit in km/h) pairs, ascending
    limits: Vec<(f64, f64)>,
    cursor: usize,
    active_limit_kmh: f64,
    violating: bool,
}

impl SpeedObserver {
    pub fn new(track: &Track) -> Self {
        let limits = track
            .signs()
            .iter()
            .filter_map(|s| {
                s.speed_limit_kmh()
                    .map(|kmh| (s.at_length.into_inner(), kmh))
            })
            .collect();
        Self {
            limits,
            cursor: 0,
            active_limit_kmh: DEFAULT_SPEED_LIMIT_KMH,
            violating: false,
        }
    }

    pub fn active_limit_kmh(&self) -> f64 {
        self.active_limit_kmh
    }
}

impl SignObserver for SpeedObserver {
    fn reset(&mut self) {
        self.cursor = 0;
        self.active_limit_kmh = DEFAULT_SPEED_LIMIT_KMH;
        self.violating = false;
    }

    fn tick(&mut self, ctx: &mut ObserverContext<'_>, events: &mut Vec<TrafficEvent>) {
        while let Some(&(pos, kmh)) = self.limits.get(self.cursor) {
            if ctx.position < pos {
                break;
            }
            self.active_limit_kmh = kmh;
            self.cursor += 1;
        }

        let kmh = speed_to_kmh(ctx.speed);
        if !self.violating && kmh > self.active_limit_kmh + SPEED_TOLERANCE_KMH {
            self.violating = true;
            events.push(ctx.event(TrafficEventKind::Speeding));
        } else if self.violating && kmh < self.active_limit_kmh - SPEED_TOLERANCE_KMH {
            self.violating = false;
        }
    }
}

/// Advisory for crawling below the minimum speed past a grace period.
/// Policy: fires in live sessions only, never during replay.
pub struct TooSlowObserver {
    below_for: f64,
    fired: bool,
}

impl TooSlowObserver {
    pub fn new() -> Self {
        Self {
            below_for: 0.0,
            fired: false,
        }
    }
}

impl Default for TooSlowObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SignObserver for TooSlowObserver {
    fn reset(&mut self) {
        self.below_for = 0.0;
        self.fired = false;
    }

    fn tick(&mut self, ctx: &mut ObserverContext<'_>, events: &mut Vec<TrafficEvent>) {
        if ctx.replay {
            self.below_for = 0.0;
            return;
        }
        if speed_to_kmh(ctx.speed) < TOO_SLOW_KMH {
            self.below_for += ctx.dt;
            if self.below_for >= TOO_SLOW_GRACE && !self.fired {
                self.fired = true;
                events.push(ctx.event(TrafficEventKind::TooSlow));
            }
        } else {
            self.below_for = 0.0;
            self.fired = false;
        }
    }
}
