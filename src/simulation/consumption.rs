//! Fuel consumption accounting
//!
//! Integrates the engine's instantaneous fuel rate into cumulative
//! liters, keeps a rolling one-second window for an averaged L/100km
//! figure, and emits a telemetry sample every N milliliters consumed.

use super::types::TelemetrySample;

/// Telemetry label for the fixed-volume consumption tick
pub const CONSUMPTION_TICK: &str = "consumption_tick";

#[derive(Debug, Clone)]
pub struct ConsumptionMonitor {
    /// Fuel volume between telemetry samples [mL]
    pub ml_per_sample: f64,
    /// Counter toward the next telemetry sample [L]
    ml_counter: f64,
    /// Total fuel used this session [L]
    pub liters_used: f64,
    /// Rolling-window fuel counter [L]
    liter_counter: f64,
    /// Rolling-window time counter [s]
    t_counter: f64,
    /// Last instantaneous rate [L/s]
    pub liters_per_second: f64,
    /// Last instantaneous consumption [L/100km]
    pub liters_per_100km: f64,
}

impl Default for ConsumptionMonitor {
    fn default() -> Self {
        Self {
            ml_per_sample: 2.0,
            ml_counter: 0.0,
            liters_used: 0.0,
            liter_counter: 0.0,
            t_counter: 0.0,
            liters_per_second: 0.0,
            liters_per_100km: 0.0,
        }
    }
}

impl ConsumptionMonitor {
    /// Account one tick of fuel flow. Telemetry samples are pushed into
    /// `telemetry` (fire and forget); the threshold remainder carries
    /// forward so the cadence never drifts.
    pub fn tick(
        &mut self,
        liters_per_second: f64,
        dt: f64,
        speed: f64,
        telemetry: &mut Vec<TelemetrySample>,
    ) {
        let liters = liters_per_second * dt;
        self.liters_used += liters;
        self.liter_counter += liters;
        self.t_counter += dt;
        self.liters_per_second = liters_per_second;
        self.liters_per_100km = l_100km_instantaneous(liters_per_second, speed);

        self.ml_counter += liters;
        let threshold = self.ml_per_sample * 0.001;
        while self.ml_counter >= threshold {
            self.ml_counter -= threshold;
            telemetry.push(TelemetrySample {
                name: CONSUMPTION_TICK,
                value: self.liters_per_100km,
            });
        }
    }

    /// One-second averaged consumption [L/100km]. `Some` only once the
    /// window holds at least a full second, and the window resets on
    /// every `Some` return.
    pub fn l_100km_avg(&mut self, speed: f64) -> Option<f64> {
        if self.t_counter < 1.0 {
            return None;
        }
        let liters_per_second = self.liter_counter / self.t_counter;
        self.liter_counter = 0.0;
        self.t_counter = 0.0;
        Some(l_100km_instantaneous(liters_per_second, speed))
    }

    pub fn reset(&mut self) {
        self.ml_counter = 0.0;
        self.liters_used = 0.0;
        self.liter_counter = 0.0;
        self.t_counter = 0.0;
        self.liters_per_second = 0.0;
        self.liters_per_100km = 0.0;
    }
}

/// [L/s] at the given speed converted to [L/100km]; guarded against the
/// near-zero-speed division.
pub fn l_100km_instantaneous(liters_per_second: f64, speed: f64) -> f64 {
    if speed < 1e-3 {
        return 0.0;
    }
    liters_per_second / speed * 1000.0 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_exactly() {
        let mut monitor = ConsumptionMonitor::default();
        let mut telemetry = Vec::new();
        let rates = [0.0005, 0.001, 0.0015, 0.002];
        let mut expected = 0.0;
        for (i, &rate) in rates.iter().cycle().take(40).enumerate() {
            let dt = if i % 2 == 0 { 0.25 } else { 0.125 };
            monitor.tick(rate, dt, 15.0, &mut telemetry);
            expected += rate * dt;
        }
        assert!((monitor.liters_used - expected).abs() < 1e-12);
    }

    #[test]
    fn telemetry_cadence_carries_remainder() {
        let mut monitor = ConsumptionMonitor::default();
        let mut telemetry = Vec::new();
        // 1 mL per tick against a 2 mL threshold: a sample every 2 ticks
        for _ in 0..6 {
            monitor.tick(0.002, 0.5, 20.0, &mut telemetry);
        }
        assert_eq!(telemetry.len(), 3);
        assert!(telemetry.iter().all(|s| s.name == CONSUMPTION_TICK));
    }

    #[test]
    fn big_tick_emits_multiple_samples() {
        let mut monitor = ConsumptionMonitor::default();
        let mut telemetry = Vec::new();
        // 10 mL in one tick crosses the 2 mL threshold five times
        monitor.tick(0.01, 1.0, 20.0, &mut telemetry);
        assert_eq!(telemetry.len(), 5);
    }

    #[test]
    fn average_needs_a_full_second() {
        let mut monitor = ConsumptionMonitor::default();
        let mut telemetry = Vec::new();
        for _ in 0..3 {
            monitor.tick(0.001, 0.25, 10.0, &mut telemetry);
            assert!(monitor.l_100km_avg(10.0).is_none());
        }
        monitor.tick(0.001, 0.25, 10.0, &mut telemetry);
        let avg = monitor.l_100km_avg(10.0).expect("window is full");
        // 0.001 L/s at 10 m/s = 10 L/100km
        assert!((avg - 10.0).abs() < 1e-9);
        // window reset: the next call starts over
        assert!(monitor.l_100km_avg(10.0).is_none());
    }

    #[test]
    fn average_guards_standstill() {
        let mut monitor = ConsumptionMonitor::default();
        let mut telemetry = Vec::new();
        for _ in 0..5 {
            monitor.tick(0.001, 0.25, 0.0, &mut telemetry);
        }
        assert_eq!(monitor.l_100km_avg(0.0), Some(0.0));
        assert_eq!(monitor.liters_per_100km, 0.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut monitor = ConsumptionMonitor::default();
        let mut telemetry = Vec::new();
        monitor.tick(0.01, 1.0, 20.0, &mut telemetry);
        monitor.reset();
        assert_eq!(monitor.liters_used, 0.0);
        assert!(monitor.l_100km_avg(20.0).is_none());
    }
}
