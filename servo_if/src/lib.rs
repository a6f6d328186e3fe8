//! # Servo interface crate.
//!
//! Provides the common message and telecommand definitions for the arm servo
//! software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Streaming command and joint-state messages
pub mod cmd;

/// Servo status codes
pub mod status;

/// Telecommand definitions and parsing
pub mod tc;

/// Outgoing trajectory messages
pub mod traj;
