//! Glove-Simulation: synthetic glove captures
//!
//! Seeded tremor, tapping and stiffness captures with sensor noise, for
//! tests, benchmarks and demonstrations without the device.

pub mod capture_simulator;
pub mod motion_patterns;

pub use capture_simulator::*;
pub use motion_patterns::*;
