//! Driving Simulation Library
//!
//! A headless vehicle driving simulator: per-tick engine, gearbox and
//! road-load physics, fuel consumption accounting, and traffic-sign
//! observers that record violations. Runs deterministically, so a
//! recorded run can be replayed bit-exactly.

pub mod simulation;
