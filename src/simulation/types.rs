//! Core types for the driving simulation
//!
//! Track geometry, sign data, and the event/telemetry records the
//! simulation core emits. Nothing here depends on any front-end.

use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use sorted_vec::SortedVec;

/// Speed limit assumed when no speed sign has been passed yet [km/h]
pub const DEFAULT_SPEED_LIMIT_KMH: f64 = 300.0;

/// Minimum clearance a traffic light keeps to the previous light [m]
pub const MIN_TRIGGER_CLEARANCE: f64 = 100.0;

/// Kind of sign placed along the track
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignKind {
    /// Stop sign: requires a full stop before the sign's arc length
    Stop,
    /// Speed limit sign with the limit in km/h (30..=130 in steps of 10)
    SpeedLimit(u16),
    /// Traffic light with its own phase state machine
    TrafficLight,
}

/// Phase of a traffic light
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficLightPhase {
    Red,
    /// Red with the change countdown running (triggered by an approaching car)
    RedPending,
    Yellow,
    Green,
}

/// Per-light trigger configuration
#[derive(Debug, Clone, Copy)]
pub struct TrafficLightInfo {
    /// Arc-length offset before the sign at which the countdown starts [m]
    pub trigger_distance: f64,
    /// Range the phase-change countdown is sampled from [ms]
    pub time_range: (f64, f64),
}

impl Default for TrafficLightInfo {
    fn default() -> Self {
        Self {
            trigger_distance: 500.0,
            time_range: (7000.0, 7000.0),
        }
    }
}

/// A sign placed on the track at a given arc length
#[derive(Debug, Clone, Copy)]
pub struct Sign {
    pub kind: SignKind,
    /// Position along the track [m of arc length]
    pub at_length: OrderedFloat<f64>,
    /// Only meaningful for traffic lights
    pub light: TrafficLightInfo,
}

impl Sign {
    pub fn new(kind: SignKind, at_length: f64) -> Self {
        Self {
            kind,
            at_length: OrderedFloat(at_length),
            light: TrafficLightInfo::default(),
        }
    }

    pub fn traffic_light(at_length: f64, info: TrafficLightInfo) -> Self {
        Self {
            kind: SignKind::TrafficLight,
            at_length: OrderedFloat(at_length),
            light: info,
        }
    }

    pub fn speed_limit_kmh(&self) -> Option<f64> {
        match self.kind {
            SignKind::SpeedLimit(kmh) => Some(kmh as f64),
            _ => None,
        }
    }
}

// Signs order by arc length; the kind only breaks ties so that the
// ordering stays total.
impl PartialEq for Sign {
    fn eq(&self, other: &Self) -> bool {
        self.at_length == other.at_length && self.kind == other.kind
    }
}

impl Eq for Sign {}

impl PartialOrd for Sign {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sign {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at_length
            .cmp(&other.at_length)
            .then(self.kind.cmp(&other.kind))
    }
}

/// Immutable track geometry fed to a session at start
///
/// Signs are kept in ascending arc-length order. Traffic-light trigger
/// distances are clamped against the previous light so a driver always
/// has runway to react.
#[derive(Debug, Clone)]
pub struct Track {
    signs: SortedVec<Sign>,
    /// Total arc length of the track [m]
    pub length: f64,
    /// Time the driver has to finish the track [s], 0 = unlimited
    pub max_time: f64,
}

impl Track {
    pub fn new(length: f64, mut signs: Vec<Sign>) -> Self {
        signs.sort();
        clamp_trigger_distances(&mut signs);
        Self {
            signs: SortedVec::from_unsorted(signs),
            length,
            max_time: 0.0,
        }
    }

    pub fn signs(&self) -> &[Sign] {
        &self.signs
    }

    /// Sign at the given index, `None` past track end
    pub fn sign(&self, index: usize) -> Option<&Sign> {
        self.signs.get(index)
    }

    /// Indices of all signs matching the predicate, in arc-length order
    pub fn sign_indices(&self, pred: impl Fn(&Sign) -> bool) -> Vec<usize> {
        self.signs
            .iter()
            .enumerate()
            .filter(|(_, s)| pred(s))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Clamp every light's trigger distance so the countdown never starts
/// before the previous light (50 m margin), with a hard floor.
fn clamp_trigger_distances(signs: &mut [Sign]) {
    let mut prev_light_pos = 0.0;
    for sign in signs.iter_mut() {
        if sign.kind != SignKind::TrafficLight {
            continue;
        }
        let at = sign.at_length.into_inner();
        let gap = at - prev_light_pos - 50.0;
        if gap < sign.light.trigger_distance {
            sign.light.trigger_distance = gap;
        }
        if sign.light.trigger_distance < MIN_TRIGGER_CLEARANCE {
            sign.light.trigger_distance = MIN_TRIGGER_CLEARANCE;
        }
        prev_light_pos = at;
    }
}

/// Kind of event raised by a sign observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficEventKind {
    Speeding,
    StopSign,
    TrafficLight,
    /// Advisory, not a violation: driving below the minimum speed
    TooSlow,
}

impl TrafficEventKind {
    /// Advisories are driver feedback only; violations are part of the
    /// replay-deterministic record.
    pub fn is_violation(&self) -> bool {
        !matches!(self, TrafficEventKind::TooSlow)
    }
}

/// A violation or advisory raised by an observer, consumed exactly once
/// by the logging/audio collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficEvent {
    pub kind: TrafficEventKind,
    /// Session time at which the event fired [s]
    pub time: f64,
    /// Car arc-length position at which the event fired [m]
    pub position: f64,
}

/// A labeled numeric sample for the external telemetry sink
/// (best-effort, unordered-safe, no acknowledgment).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub name: &'static str,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_sort_by_arc_length() {
        let track = Track::new(
            1000.0,
            vec![
                Sign::new(SignKind::SpeedLimit(50), 600.0),
                Sign::new(SignKind::Stop, 200.0),
                Sign::new(SignKind::SpeedLimit(80), 400.0),
            ],
        );
        let positions: Vec<f64> = track
            .signs()
            .iter()
            .map(|s| s.at_length.into_inner())
            .collect();
        assert_eq!(positions, vec![200.0, 400.0, 600.0]);
    }

    #[test]
    fn trigger_distance_clamped_between_lights() {
        let close = TrafficLightInfo {
            trigger_distance: 500.0,
            time_range: (3000.0, 3000.0),
        };
        let track = Track::new(
            2000.0,
            vec![
                Sign::traffic_light(400.0, close),
                Sign::traffic_light(700.0, close),
            ],
        );
        let lights: Vec<&Sign> = track
            .signs()
            .iter()
            .filter(|s| s.kind == SignKind::TrafficLight)
            .collect();
        // first light: 400 - 0 - 50 = 350 runway
        assert_eq!(lights[0].light.trigger_distance, 350.0);
        // second light: 700 - 400 - 50 = 250 runway
        assert_eq!(lights[1].light.trigger_distance, 250.0);
    }

    #[test]
    fn trigger_distance_floor() {
        let close = TrafficLightInfo {
            trigger_distance: 500.0,
            time_range: (3000.0, 3000.0),
        };
        let track = Track::new(
            1000.0,
            vec![
                Sign::traffic_light(300.0, close),
                Sign::traffic_light(380.0, close),
            ],
        );
        let second = &track.signs()[1];
        assert_eq!(second.light.trigger_distance, MIN_TRIGGER_CLEARANCE);
    }

    #[test]
    fn sign_query_past_track_end_is_none() {
        let track = Track::new(100.0, vec![Sign::new(SignKind::Stop, 50.0)]);
        assert!(track.sign(0).is_some());
        assert!(track.sign(1).is_none());
    }
}
