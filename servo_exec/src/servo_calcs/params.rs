//! Parameters structure for the servo core

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::ServoError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the servo core. Immutable after construction.
#[derive(Debug, Clone, Deserialize)]
pub struct ServoParams {
    /// Period between outgoing command publications.
    ///
    /// Units: seconds
    pub publish_period_s: f64,

    /// How incoming command values are interpreted.
    pub command_in_type: CommandInType,

    /// The shape of the outgoing command.
    pub command_out_type: CommandOutType,

    /// Max linear speed commanded by a full-scale unitless input.
    ///
    /// Units: meters/second
    pub linear_scale: f64,

    /// Max rotational speed commanded by a full-scale unitless input.
    ///
    /// Units: radians/second
    pub rotational_scale: f64,

    /// Max joint speed commanded by a full-scale unitless jog.
    ///
    /// Units: radians/second
    pub joint_scale: f64,

    /// Publish joint positions in the outgoing command.
    pub publish_joint_positions: bool,

    /// Publish joint velocities in the outgoing command.
    pub publish_joint_velocities: bool,

    /// Publish (all-zero) joint accelerations in the outgoing command.
    pub publish_joint_accelerations: bool,

    /// Smoothing constant shared by all per-joint position filters. Larger
    /// values filter more.
    pub low_pass_filter_coeff: f64,

    /// Jacobian condition number above which the arm starts decelerating.
    pub lower_singularity_threshold: f64,

    /// Jacobian condition number above which the arm is halted.
    pub hard_stop_singularity_threshold: f64,

    /// Margin to each joint position bound at which motion towards the bound
    /// is halted.
    ///
    /// Units: radians (or meters for prismatic joints)
    pub joint_limit_margin: f64,

    /// Age at which an incoming command is considered stale.
    ///
    /// Units: seconds
    pub incoming_command_timeout_s: f64,

    /// Number of consecutive all-zero commands to publish before suppressing
    /// publication. Zero means republish forever.
    pub num_outgoing_halt_msgs_to_publish: u32,

    /// Name of the movement group being servoed.
    pub move_group_name: String,

    /// Name of the frame differential IK is performed in.
    pub planning_frame: String,

    /// Name of the robot link incoming commands are expressed in by default.
    pub robot_link_command_frame: String,

    /// Name of the outgoing command stream.
    pub command_out_topic: String,

    /// Name of the status stream.
    pub status_topic: String,

    /// Name of the worst-case stop time stream.
    pub worst_case_stop_time_topic: String,

    /// Pad outgoing trajectories with repeated points, needed when the
    /// consumer is a Gazebo simulation that drops points stamped in the past.
    #[serde(default)]
    pub use_gazebo: bool,

    /// Number of points in a padded trajectory.
    #[serde(default = "default_gazebo_redundant_message_count")]
    pub gazebo_redundant_message_count: u32,
}

fn default_gazebo_redundant_message_count() -> u32 {
    30
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How incoming command values are interpreted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandInType {
    /// Commands are normalised to [-1, 1] and multiplied by the configured
    /// scales.
    Unitless,

    /// Commands are in meters/second and radians/second.
    SpeedUnits,
}

/// The shape of the outgoing command.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutType {
    /// A joint trajectory message with one point per tick.
    JointTrajectory,

    /// A flat array of joint positions (or velocities if positions are not
    /// published).
    FloatArray,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ServoParams {
    /// The halt publication limit, or `None` if halts are republished
    /// forever.
    pub fn halt_msg_limit(&self) -> Option<u32> {
        match self.num_outgoing_halt_msgs_to_publish {
            0 => None,
            n => Some(n),
        }
    }

    /// Check the parameters for consistency.
    pub fn validate(&self) -> Result<(), ServoError> {
        if self.publish_period_s <= 0.0 {
            return Err(ServoError::InvalidParams(
                "publish_period_s must be strictly positive".into(),
            ));
        }

        if self.linear_scale <= 0.0 || self.rotational_scale <= 0.0 || self.joint_scale <= 0.0 {
            return Err(ServoError::InvalidParams(
                "command scales must be strictly positive".into(),
            ));
        }

        if self.low_pass_filter_coeff <= 0.0 {
            return Err(ServoError::InvalidParams(
                "low_pass_filter_coeff must be strictly positive".into(),
            ));
        }

        if self.lower_singularity_threshold <= 0.0
            || self.lower_singularity_threshold >= self.hard_stop_singularity_threshold
        {
            return Err(ServoError::InvalidParams(
                "singularity thresholds must satisfy 0 < lower < hard_stop".into(),
            ));
        }

        if self.joint_limit_margin < 0.0 {
            return Err(ServoError::InvalidParams(
                "joint_limit_margin must not be negative".into(),
            ));
        }

        if self.incoming_command_timeout_s <= 0.0 {
            return Err(ServoError::InvalidParams(
                "incoming_command_timeout_s must be strictly positive".into(),
            ));
        }

        if self.command_out_type == CommandOutType::FloatArray
            && !self.publish_joint_positions
            && !self.publish_joint_velocities
        {
            return Err(ServoError::InvalidParams(
                "float_array output needs positions or velocities published".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::servo_calcs::test_util::nominal_params as nominal;

    #[test]
    fn test_validate_nominal() {
        assert!(nominal().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_period() {
        let mut params = nominal();
        params.publish_period_s = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut params = nominal();
        params.lower_singularity_threshold = 50.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_halt_msg_limit() {
        let mut params = nominal();
        assert_eq!(params.halt_msg_limit(), Some(4));

        params.num_outgoing_halt_msgs_to_publish = 0;
        assert_eq!(params.halt_msg_limit(), None);
    }

    #[test]
    fn test_deserialise() {
        let toml_str = r#"
            publish_period_s = 0.01
            command_in_type = "unitless"
            command_out_type = "joint_trajectory"
            linear_scale = 0.6
            rotational_scale = 0.3
            joint_scale = 0.5
            publish_joint_positions = true
            publish_joint_velocities = true
            publish_joint_accelerations = false
            low_pass_filter_coeff = 2.0
            lower_singularity_threshold = 17.0
            hard_stop_singularity_threshold = 30.0
            joint_limit_margin = 0.1
            incoming_command_timeout_s = 0.1
            num_outgoing_halt_msgs_to_publish = 4
            move_group_name = "arm"
            planning_frame = "base"
            robot_link_command_frame = "tool0"
            command_out_topic = "command_out"
            status_topic = "status"
            worst_case_stop_time_topic = "worst_case_stop_time"
        "#;

        let params: ServoParams = toml::from_str(toml_str).unwrap();
        assert_eq!(params.command_in_type, CommandInType::Unitless);
        assert_eq!(params.command_out_type, CommandOutType::JointTrajectory);
        assert!(!params.use_gazebo);
        assert_eq!(params.gazebo_redundant_message_count, 30);
    }
}
