//! # Servo executable library.
//!
//! This library allows other crates in the workspace (and the tests) to
//! access items defined inside the servo executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Serial-chain kinematic model of the arm
pub mod arm_model;

/// Kinematic model and transform source capability interfaces
pub mod model;

/// Servo calculation core - converts streaming twist/jog commands into joint demands
pub mod servo_calcs;

/// Telecommand processor - routes incoming TCs to the servo core
pub mod tc_processor;
