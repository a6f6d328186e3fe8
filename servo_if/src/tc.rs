//! # Servo telecommand module
//!
//! Telecommands are the instructions sent to the servo executable: streamed
//! operator commands (twist, jog, frame updates, collision scale) and
//! control-plane requests (axis mask changes, status reset, pause).
//!
//! The wire format is a JSON envelope of the form
//! `{"type": "<TYPE>", "payload": <payload>}`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Internal
use crate::cmd::{JointJogCmd, TwistCmd};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A mask over the six Cartesian axes, ordered (lin-x, lin-y, lin-z, ang-x,
/// ang-y, ang-z).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AxisMask {
    pub x_translation: bool,
    pub y_translation: bool,
    pub z_translation: bool,
    pub x_rotation: bool,
    pub y_rotation: bool,
    pub z_rotation: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A telecommand for the servo executable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ServoTc {
    /// No action required.
    None,

    /// A Cartesian twist command for the end effector.
    Twist(TwistCmd),

    /// A joint jog command.
    JointJog(JointJogCmd),

    /// Update of the planning frame name.
    PlanningFrame(String),

    /// Update of the command frame name.
    CommandFrame(String),

    /// Velocity scale published by the collision monitor, in [0, 1].
    CollisionVelocityScale(f64),

    /// Select which Cartesian axes are allowed to drift (true = drift).
    DriftDimensions(AxisMask),

    /// Select which Cartesian axes are controlled (false = forced to zero).
    ControlDimensions(AxisMask),

    /// Reset the servo status to no-warning, e.g. so the arm can move again
    /// after a collision halt.
    ResetStatus,

    /// Pause or resume the servo loop.
    Pause(bool),
}

/// Possible telecommand parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0} is expected to have a payload but it doesn't")]
    MissingPayload(String),

    #[error("TC of type {0} has an invalid payload: {1}")]
    InvalidPayload(String, serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AxisMask {
    /// Build a mask with every axis set to `value`.
    pub fn all(value: bool) -> Self {
        Self {
            x_translation: value,
            y_translation: value,
            z_translation: value,
            x_rotation: value,
            y_rotation: value,
            z_rotation: value,
        }
    }

    /// The mask as an array in axis order.
    pub fn as_array(&self) -> [bool; 6] {
        [
            self.x_translation,
            self.y_translation,
            self.z_translation,
            self.x_rotation,
            self.y_rotation,
            self.z_rotation,
        ]
    }
}

impl ServoTc {
    /// Parse a TC from a JSON envelope.
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value
        let val: Value = match serde_json::from_str(json_str) {
            Ok(v) => v,
            Err(e) => return Err(TcParseError::InvalidJson(e)),
        };

        // Get the type of the TC
        let tc_type = match val["type"].as_str() {
            Some(s) => s.to_string(),
            None => {
                return Err(TcParseError::InvalidType(String::from(
                    "Expected \"type\" to be a string",
                )))
            }
        };

        // Types without payloads are handled first
        match tc_type.as_str() {
            "NONE" => return Ok(ServoTc::None),
            "RESET_STATUS" => return Ok(ServoTc::ResetStatus),
            _ => (),
        }

        // All remaining types need a payload
        let payload = val["payload"].clone();
        if payload.is_null() {
            return Err(TcParseError::MissingPayload(tc_type));
        }

        // Deserialise the payload based on the type
        match tc_type.as_str() {
            "TWIST" => Self::payload(&tc_type, payload).map(ServoTc::Twist),
            "JOINT_JOG" => Self::payload(&tc_type, payload).map(ServoTc::JointJog),
            "PLANNING_FRAME" => Self::payload(&tc_type, payload).map(ServoTc::PlanningFrame),
            "COMMAND_FRAME" => Self::payload(&tc_type, payload).map(ServoTc::CommandFrame),
            "COLLISION_SCALE" => {
                Self::payload(&tc_type, payload).map(ServoTc::CollisionVelocityScale)
            }
            "DRIFT_DIMS" => Self::payload(&tc_type, payload).map(ServoTc::DriftDimensions),
            "CONTROL_DIMS" => Self::payload(&tc_type, payload).map(ServoTc::ControlDimensions),
            "PAUSE" => Self::payload(&tc_type, payload).map(ServoTc::Pause),
            _ => Err(TcParseError::InvalidType(format!(
                "{} is not a recognised TC type",
                tc_type
            ))),
        }
    }

    /// Deserialise a payload value into the expected type.
    fn payload<P: serde::de::DeserializeOwned>(
        tc_type: &str,
        payload: Value,
    ) -> Result<P, TcParseError> {
        serde_json::from_value(payload)
            .map_err(|e| TcParseError::InvalidPayload(tc_type.to_string(), e))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
