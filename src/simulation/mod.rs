//! Standalone driving simulation module
//!
//! This module contains the whole simulation core: vehicle physics,
//! fuel accounting, sign observers and the session driving them. It
//! runs headless and can be tested via console without any front-end.

mod car;
mod consumption;
mod engine;
mod gearbox;
mod log;
mod maps;
mod observers;
mod resistances;
mod session;
mod types;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use car::Car;
#[allow(unused_imports)]
pub use consumption::{l_100km_instantaneous, ConsumptionMonitor, CONSUMPTION_TICK};
#[allow(unused_imports)]
pub use engine::{angular_velocity_to_rpm, rpm_to_angular_velocity, Engine, FUEL_DENSITY};
#[allow(unused_imports)]
pub use gearbox::{
    kmh_to_speed, speed_to_kmh, Clutch, Gearbox, MAX_GEAR, MIN_GEAR, START_GEAR,
};
#[allow(unused_imports)]
pub use log::{DrivingLog, LogItem};
#[allow(unused_imports)]
pub use maps::{ConsumptionMap, TorqueMap};
#[allow(unused_imports)]
pub use observers::{
    ObserverContext, SignObserver, SpeedObserver, StopSignObserver, TooSlowObserver,
    TrafficLightObserver, SPEED_TOLERANCE_KMH, STOP_DWELL_TIME, STOP_TRIGGER_DISTANCE,
    TOO_SLOW_GRACE, TOO_SLOW_KMH,
};
#[allow(unused_imports)]
pub use session::{ControlInput, DrivingSession, TickOutcome, INITIAL_POSITION};
#[allow(unused_imports)]
pub use types::{
    Sign, SignKind, Track, TrafficEvent, TrafficEventKind, TrafficLightInfo, TrafficLightPhase,
    TelemetrySample, DEFAULT_SPEED_LIMIT_KMH, MIN_TRIGGER_CLEARANCE,
};
