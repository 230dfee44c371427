//! Session log record
//!
//! A plain data structure describing one driving run: the per-tick
//! control inputs plus run totals. Feeding the items back through
//! `DrivingSession::tick_replay` reproduces the run exactly; actual
//! persistence is left to an external serializer.

/// One recorded simulation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogItem {
    pub throttle: f64,
    pub braking: f64,
    pub gear: i32,
    /// Time step of this tick [s]
    pub dt: f64,
    /// Road slope during this tick [rad]
    pub alpha: f64,
}

/// Record of a full driving run
#[derive(Debug, Clone, Default)]
pub struct DrivingLog {
    pub items: Vec<LogItem>,
    /// Track time from start to finish [s]
    pub elapsed_time: f64,
    /// Total fuel used [L]
    pub liters_used: f64,
    /// Engine angular velocity when the run started [rad/s]
    pub initial_angular_velocity: f64,
}

impl DrivingLog {
    pub fn new(initial_angular_velocity: f64) -> Self {
        Self {
            initial_angular_velocity,
            ..Self::default()
        }
    }

    pub fn add_item(&mut self, throttle: f64, braking: f64, gear: i32, dt: f64, alpha: f64) {
        self.items.push(LogItem {
            throttle,
            braking,
            gear,
            dt,
            alpha,
        });
    }
}
