//! Implementations for the ServoCalcs state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use nalgebra::{DVector, Isometry3};
use serde::Serialize;
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

// Internal
use super::filter::LowPassFilter;
use super::frames;
use super::latest_cmd::{
    CollisionScaleHandle, CommandHandle, JointStateHandle, StopHandle,
};
use super::limits;
use super::params::{CommandOutType, ServoParams};
use super::{ServoError, JOINT_STATE_RETRY_SLEEP_MS, NUM_CARTESIAN_DIMS};
use crate::model::{KinematicModel, TransformSource};
use servo_if::cmd::JointState;
use servo_if::status::ServoStatus;
use servo_if::tc::AxisMask;
use servo_if::traj::{JointArray, JointTrajectory, ServoCommand, TrajectoryPoint};
use util::convert::Convert;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Servo calculation core state.
///
/// Owns the kinematic model and all per-tick working state for the process
/// lifetime. Ingress callbacks communicate with the core through the
/// cloneable handles; the periodic executive drives it through `proc`.
pub struct ServoCalcs {
    pub(crate) params: ServoParams,

    pub(crate) model: Box<dyn KinematicModel>,
    pub(crate) transform_source: Option<Box<dyn TransformSource>>,

    cmd_handle: CommandHandle,
    collision_scale: CollisionScaleHandle,
    joint_state: JointStateHandle,
    stop: StopHandle,

    pub(crate) num_joints: usize,
    pub(crate) joint_name_index: HashMap<String, usize>,

    /// Working copy of the joint state the outgoing command is built from.
    pub(crate) internal_joint_state: JointState,

    /// The measured joint state cached at the start of the tick, before any
    /// deltas are applied.
    pub(crate) original_joint_state: JointState,

    position_filters: Vec<LowPassFilter>,

    /// The joint velocity chosen at the previous tick, published or not.
    pub(crate) prev_joint_velocity: DVector<f64>,

    /// Axes the operator allows to drift (task-space redundancy).
    pub(crate) drift_dimensions: [bool; NUM_CARTESIAN_DIMS],

    /// Axes under operator control; others are forced to zero.
    pub(crate) control_dimensions: [bool; NUM_CARTESIAN_DIMS],

    pub(crate) status: ServoStatus,

    paused: bool,
    wait_for_servo_commands: bool,
    pub(crate) updated_filters: bool,
    zero_velocity_count: u32,

    last_sent_command: JointTrajectory,
}

/// Input data for one tick of the servo core.
pub struct InputData {
    /// The wall-clock time of this tick, used for command staleness and
    /// outgoing stamps.
    pub now: DateTime<Utc>,
}

/// Output command of one tick, `None` when publication is suppressed or the
/// tick produced no motion.
#[derive(Default)]
pub struct OutputData {
    pub command: Option<ServoCommand>,
}

/// Status report for one tick of the servo core.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StatusReport {
    /// The status code published this tick.
    pub status: ServoStatus,

    /// Worst-case time to bring every joint to rest, consumed by the
    /// collision monitor.
    ///
    /// Units: seconds
    pub worst_case_stop_time_s: f64,

    /// True if an outgoing command was published this tick.
    pub published: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ServoCalcs {
    /// Initialise the servo core from a parameter file.
    pub fn init<P: AsRef<std::path::Path>>(
        params_path: P,
        model: Box<dyn KinematicModel>,
        transform_source: Option<Box<dyn TransformSource>>,
        joint_state: JointStateHandle,
    ) -> Result<Self, ServoError> {
        let params: ServoParams = util::params::load(params_path)?;
        Self::with_params(params, model, transform_source, joint_state)
    }

    /// Initialise the servo core from an already loaded parameter set.
    pub fn with_params(
        params: ServoParams,
        model: Box<dyn KinematicModel>,
        transform_source: Option<Box<dyn TransformSource>>,
        joint_state: JointStateHandle,
    ) -> Result<Self, ServoError> {
        params.validate()?;

        let num_joints = model.num_joints();
        let joint_names = model.joint_names().to_vec();

        // Map for the indices of incoming joint commands
        let joint_name_index: HashMap<String, usize> = joint_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let cmd_handle = CommandHandle::new(
            params.planning_frame.clone(),
            params.robot_link_command_frame.clone(),
        );

        // Start from the model's current configuration so the first outgoing
        // command is consistent even before a joint state arrives
        let mut internal_joint_state = JointState::zeroed(joint_names);
        internal_joint_state.positions = model.positions().convert();
        let original_joint_state = internal_joint_state.clone();

        // Low-pass filters for the joint positions
        let position_filters = (0..num_joints)
            .map(|_| LowPassFilter::new(params.low_pass_filter_coeff))
            .collect();

        // Set up the "last" sent command, in case it must be re-published
        // before the first calculation
        let last_sent_command =
            Self::compose_trajectory(&params, &internal_joint_state, num_joints, None);

        info!(
            "ServoCalcs initialised for group {} with {} joints",
            params.move_group_name, num_joints
        );

        Ok(Self {
            params,
            model,
            transform_source,
            cmd_handle,
            collision_scale: CollisionScaleHandle::new(),
            joint_state,
            stop: StopHandle::new(),
            num_joints,
            joint_name_index,
            internal_joint_state,
            original_joint_state,
            position_filters,
            prev_joint_velocity: DVector::zeros(num_joints),
            drift_dimensions: [false; NUM_CARTESIAN_DIMS],
            control_dimensions: [true; NUM_CARTESIAN_DIMS],
            status: ServoStatus::NoWarning,
            paused: false,
            wait_for_servo_commands: true,
            updated_filters: false,
            zero_velocity_count: 0,
            last_sent_command,
        })
    }

    // ---- HANDLES AND ACCESSORS ----

    /// Handle used by ingress callbacks to deliver commands.
    pub fn command_handle(&self) -> CommandHandle {
        self.cmd_handle.clone()
    }

    /// Handle used by the collision monitor to deliver its velocity scale.
    pub fn collision_scale_handle(&self) -> CollisionScaleHandle {
        self.collision_scale.clone()
    }

    /// Handle used to request the servo loop to stop.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The current servo status.
    pub fn status(&self) -> ServoStatus {
        self.status
    }

    /// The core's configuration.
    pub fn params(&self) -> &ServoParams {
        &self.params
    }

    /// The cached planning to command frame transform, or `None` if it has
    /// never been successfully computed.
    pub fn command_frame_transform(&self) -> Option<Isometry3<f64>> {
        self.cmd_handle.command_frame_transform()
    }

    // ---- CONTROL-PLANE MUTATORS ----

    /// Select which Cartesian axes are allowed to drift.
    pub fn set_drift_dimensions(&mut self, mask: &AxisMask) {
        self.drift_dimensions = mask.as_array();
    }

    /// Select which Cartesian axes are controlled.
    pub fn set_control_dimensions(&mut self, mask: &AxisMask) {
        self.control_dimensions = mask.as_array();
    }

    /// Reset the servo status, e.g. so the arm can move again after a
    /// collision halt.
    pub fn reset_status(&mut self) {
        self.status = ServoStatus::NoWarning;
    }

    /// Pause or resume the servo loop without touching the command caches.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    // ---- CYCLIC PROCESSING ----

    /// Perform one tick of the servo core.
    pub fn proc(&mut self, input: &InputData) -> Result<(OutputData, StatusReport), ServoError> {
        let now = input.now;

        // The status published this tick is the value held at tick start;
        // escalations during the tick show up on the next one
        let status_published = self.status;

        // Refresh the internal joint state, retrying until a valid one is
        // available so the filters never go stale
        let worst_case_stop_time_s = loop {
            if let Some(stop_time) = self.update_joints() {
                break stop_time;
            }
            if self.stop.is_stop_requested() {
                return Err(ServoError::StopRequested);
            }
            thread::sleep(Duration::from_millis(JOINT_STATE_RETRY_SLEEP_MS));
        };

        // Snapshot the latest commands under the cache lock, then work
        // lock-free for the rest of the tick
        let snap = self
            .cmd_handle
            .snapshot(now, self.params.incoming_command_timeout_s);

        // Resolve the planning to command frame transform and cache it for
        // external callers
        let tf = frames::command_frame_transform(
            self.model.as_ref(),
            self.transform_source.as_deref(),
            &snap.planning_frame,
            &snap.command_frame,
        );
        self.cmd_handle.store_transform(tf);

        // Don't end this tick without updating the filters
        self.updated_filters = false;

        // While paused or waiting for the first real command, keep the
        // filters primed with the current position so resuming cannot jump
        if self.wait_for_servo_commands || self.paused {
            self.reset_low_pass_filters();

            self.wait_for_servo_commands =
                snap.twist_stamp.is_none() && snap.jog_stamp.is_none();

            return Ok((
                OutputData::default(),
                StatusReport {
                    status: status_published,
                    worst_case_stop_time_s,
                    published: false,
                },
            ));
        }

        // Choose one control path with strict priority: fresh non-zero twist
        // wins over fresh non-zero jog
        let twist_fresh = snap.twist_nonzero && !snap.twist_stale;
        let jog_fresh = snap.jog_nonzero && !snap.jog_stale;
        let have_command = twist_fresh || jog_fresh;

        let mut joint_trajectory = if twist_fresh {
            match self.calc_cartesian(
                snap.twist.clone(),
                &snap.planning_frame,
                &snap.command_frame,
                now,
            ) {
                Some(trajectory) => trajectory,
                None => return self.abort_tick(status_published, worst_case_stop_time_s),
            }
        } else if jog_fresh {
            match self.calc_joint(&snap.jog, now) {
                Some(trajectory) => trajectory,
                None => return self.abort_tick(status_published, worst_case_stop_time_s),
            }
        } else {
            if (snap.twist_nonzero && snap.twist_stale) || (snap.jog_nonzero && snap.jog_stale) {
                debug!("Ignoring a stale command; consider raising incoming_command_timeout_s");
            }

            // A zero-velocity continuation of the last sent command
            let mut trajectory = self.last_sent_command.clone();
            for point in trajectory.points.iter_mut() {
                for velocity in point.velocities.iter_mut() {
                    *velocity = 0.0;
                }
            }
            trajectory
        };
        joint_trajectory.stamp = Some(now);

        // A tick without a fresh non-zero command is a halt tick
        if !have_command {
            self.sudden_halt(&mut joint_trajectory);
        }

        // Skip the publication if all inputs have been zero for several ticks
        // in a row. A limit of `None` means republish forever.
        let ok_to_publish = if !have_command {
            match self.params.halt_msg_limit() {
                Some(limit) if self.zero_velocity_count > limit => {
                    debug!("All-zero command. Doing nothing.");
                    false
                }
                _ => true,
            }
        } else {
            true
        };

        if !have_command {
            self.zero_velocity_count = self.zero_velocity_count.saturating_add(1);
        } else {
            self.zero_velocity_count = 0;
        }

        let command = if ok_to_publish {
            let command = match self.params.command_out_type {
                CommandOutType::JointTrajectory => {
                    ServoCommand::Trajectory(joint_trajectory.clone())
                }
                CommandOutType::FloatArray => {
                    // Parameter validation guarantees one of the two flags
                    let array = if self.params.publish_joint_positions {
                        JointArray::Positions(
                            joint_trajectory
                                .points
                                .first()
                                .map(|point| point.positions.clone())
                                .unwrap_or_default(),
                        )
                    } else {
                        JointArray::Velocities(
                            joint_trajectory
                                .points
                                .first()
                                .map(|point| point.velocities.clone())
                                .unwrap_or_default(),
                        )
                    };
                    ServoCommand::JointArray(array)
                }
            };

            self.last_sent_command = joint_trajectory;
            Some(command)
        } else {
            None
        };

        // If the filters were not updated on this tick, prime them with the
        // current position before exiting
        if !self.updated_filters {
            self.reset_low_pass_filters();
        }

        let published = command.is_some();
        Ok((
            OutputData { command },
            StatusReport {
                status: status_published,
                worst_case_stop_time_s,
                published,
            },
        ))
    }

    /// Common exit for a calculation path that dropped the tick.
    fn abort_tick(
        &mut self,
        status_published: ServoStatus,
        worst_case_stop_time_s: f64,
    ) -> Result<(OutputData, StatusReport), ServoError> {
        self.reset_low_pass_filters();

        Ok((
            OutputData::default(),
            StatusReport {
                status: status_published,
                worst_case_stop_time_s,
                published: false,
            },
        ))
    }

    // ---- SHARED CALCULATION STEPS ----

    /// Parse the latest measured joint state into the internal buffer.
    ///
    /// Returns the worst-case stop time on success, or `None` if no valid
    /// joint state is available yet.
    pub(crate) fn update_joints(&mut self) -> Option<f64> {
        let latest = self.joint_state.latest()?;

        // Check that the message contains enough joints
        if latest.names.len() < self.num_joints || latest.positions.len() < latest.names.len() {
            debug!("Incoming joint state is too short, waiting for a complete one");
            return None;
        }

        // Copy positions by looked-up index, tolerating reordered or extra
        // joints
        for (m, name) in latest.names.iter().enumerate() {
            match self.joint_name_index.get(name) {
                Some(&c) => self.internal_joint_state.positions[c] = latest.positions[m],
                None => {
                    debug!("Ignoring joint {}", name);
                    continue;
                }
            }
        }

        // Cache the original joints in case they need to be reset
        self.original_joint_state = self.internal_joint_state.clone();

        // Bring the kinematic model to the measured configuration so
        // Jacobians and frame transforms are current
        let positions: DVector<f64> = self.internal_joint_state.positions.convert();
        self.model.set_positions(&positions);

        // Worst case stop time over the group, for collision checking
        Some(limits::worst_case_stop_time(
            self.model.joint_bounds(),
            &self.joint_name_index,
            &latest,
        ))
    }

    /// Apply the multiplicative collision and singularity velocity scaling.
    pub(crate) fn apply_velocity_scaling(
        &mut self,
        delta_theta: &mut DVector<f64>,
        singularity_scale: f64,
    ) {
        let collision_scale = self.collision_scale.get();

        if collision_scale == 0.0 {
            self.status = ServoStatus::HaltForCollision;
        }

        *delta_theta *= collision_scale * singularity_scale;

        if self.status == ServoStatus::HaltForCollision {
            warn!("Collision monitor demanded a full stop, halting");
            delta_theta.fill(0.0);
        }
    }

    /// Convert a clipped and scaled joint delta into the outgoing trajectory.
    pub(crate) fn convert_deltas_to_outgoing(
        &mut self,
        delta_theta: &DVector<f64>,
        now: DateTime<Utc>,
    ) -> Option<JointTrajectory> {
        if delta_theta.len() != self.num_joints {
            error!("Lengths of joint state and increments do not match");
            return None;
        }

        // Add the deltas to each joint
        self.internal_joint_state = self.original_joint_state.clone();
        for i in 0..self.num_joints {
            self.internal_joint_state.positions[i] += delta_theta[i];
        }

        self.low_pass_filter_positions();

        // Velocities are computed from the unfiltered delta so position
        // filtering cannot mask a velocity bound violation downstream
        for i in 0..self.num_joints {
            self.internal_joint_state.velocities[i] =
                delta_theta[i] / self.params.publish_period_s;
        }

        let mut joint_trajectory = Self::compose_trajectory(
            &self.params,
            &self.internal_joint_state,
            self.num_joints,
            Some(now),
        );

        // Halt if the composed state is past a position margin and moving
        // further out
        if limits::position_limit_halt(
            &self.params,
            self.model.joint_bounds(),
            &self.internal_joint_state,
        ) {
            self.sudden_halt(&mut joint_trajectory);
            self.status = ServoStatus::JointBound;
        }

        if self.params.use_gazebo {
            Self::insert_redundant_points(
                &mut joint_trajectory,
                self.params.gazebo_redundant_message_count,
                self.params.publish_period_s,
            );
        }

        Some(joint_trajectory)
    }

    /// Compose a single-point trajectory message from a joint state.
    fn compose_trajectory(
        params: &ServoParams,
        joint_state: &JointState,
        num_joints: usize,
        stamp: Option<DateTime<Utc>>,
    ) -> JointTrajectory {
        let mut point = TrajectoryPoint {
            time_from_start_s: params.publish_period_s,
            ..Default::default()
        };

        if params.publish_joint_positions {
            point.positions = joint_state.positions.clone();
        }
        if params.publish_joint_velocities {
            point.velocities = joint_state.velocities.clone();
        }
        if params.publish_joint_accelerations {
            // No known robot consumes acceleration commands, but some
            // controllers require the field to be populated
            point.accelerations = vec![0.0; num_joints];
        }

        JointTrajectory {
            stamp,
            joint_names: joint_state.names.clone(),
            points: vec![point],
        }
    }

    /// Pad the trajectory with repeated points at increasing time offsets.
    /// The simulation drops points whose stamp is already in the past, so a
    /// single point would often be ignored.
    fn insert_redundant_points(
        joint_trajectory: &mut JointTrajectory,
        count: u32,
        publish_period_s: f64,
    ) {
        let count = count as usize;
        joint_trajectory.points.resize(count, TrajectoryPoint::default());

        let point = joint_trajectory.points[0].clone();

        // Start from 2 because the first point already carries one publish
        // period
        for i in 2..count {
            let mut padded = point.clone();
            padded.time_from_start_s = i as f64 * publish_period_s;
            joint_trajectory.points[i] = padded;
        }
    }

    /// Overwrite the first trajectory point with a full stop: current
    /// positions for position-controlled robots, zero velocities for
    /// velocity-controlled ones.
    pub(crate) fn sudden_halt(&mut self, joint_trajectory: &mut JointTrajectory) {
        if joint_trajectory.points.is_empty() {
            joint_trajectory.points.push(TrajectoryPoint {
                time_from_start_s: self.params.publish_period_s,
                positions: vec![0.0; self.num_joints],
                velocities: vec![0.0; self.num_joints],
                accelerations: Vec::new(),
            });
        }

        let point = &mut joint_trajectory.points[0];
        if self.params.publish_joint_positions {
            point.positions = self.original_joint_state.positions.clone();
        }
        if self.params.publish_joint_velocities {
            point.velocities = vec![0.0; self.num_joints];
        }
    }

    /// Advance every position filter by one step over the internal state.
    fn low_pass_filter_positions(&mut self) {
        for (filter, position) in self
            .position_filters
            .iter_mut()
            .zip(self.internal_joint_state.positions.iter_mut())
        {
            *position = filter.filter(*position);
        }

        self.updated_filters = true;
    }

    /// Flush every position filter to the current measured position.
    fn reset_low_pass_filters(&mut self) {
        for (filter, position) in self
            .position_filters
            .iter_mut()
            .zip(self.original_joint_state.positions.iter())
        {
            filter.reset(*position);
        }

        self.updated_filters = true;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::servo_calcs::test_util::{nominal_params, StubModel};
    use approx::assert_relative_eq;
    use chrono::Duration as ChronoDuration;
    use nalgebra::DMatrix;
    use servo_if::cmd::{JointJogCmd, TwistCmd};
    use servo_if::tc::AxisMask;

    /// Build a servo core around a stub model, with the joint state slot
    /// seeded so ticks never block.
    fn make_servo(params: ServoParams, model: StubModel) -> ServoCalcs {
        let joint_state = JointStateHandle::new();
        joint_state.set(JointState::zeroed(model.names.clone()));

        ServoCalcs::with_params(params, Box::new(model), None, joint_state).unwrap()
    }

    fn identity_servo(params: ServoParams) -> ServoCalcs {
        make_servo(params, StubModel::with_jacobian(DMatrix::identity(6, 6)))
    }

    fn tick(servo: &mut ServoCalcs, now: DateTime<Utc>) -> (OutputData, StatusReport) {
        servo.proc(&InputData { now }).unwrap()
    }

    fn twist_x(stamp: DateTime<Utc>) -> TwistCmd {
        TwistCmd {
            stamp: Some(stamp),
            frame_id: "base".into(),
            linear: [1.0, 0.0, 0.0],
            angular: [0.0, 0.0, 0.0],
        }
    }

    fn trajectory(output: OutputData) -> JointTrajectory {
        match output.command {
            Some(ServoCommand::Trajectory(trajectory)) => trajectory,
            other => panic!("Expected a trajectory command, got {:?}", other),
        }
    }

    #[test]
    fn test_first_tick_waits_for_commands() {
        let mut servo = identity_servo(nominal_params());
        let t0 = Utc::now();

        // No command yet: nothing is published while waiting
        let (output, report) = tick(&mut servo, t0);
        assert!(output.command.is_none());
        assert!(!report.published);
    }

    #[test]
    fn test_unitless_pass_through_in_planning_frame() {
        let params = nominal_params();
        let coeff = params.low_pass_filter_coeff;
        let mut servo = identity_servo(params);
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));

        // First tick clears the waiting state, second tick moves
        tick(&mut servo, t0);
        let (output, report) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        assert!(report.published);
        assert_eq!(report.status, ServoStatus::NoWarning);

        let trajectory = trajectory(output);
        assert_eq!(trajectory.joint_names.len(), 6);
        assert_eq!(trajectory.points.len(), 1);

        let point = &trajectory.points[0];
        assert_eq!(point.time_from_start_s, 0.01);
        assert_eq!(point.positions.len(), 6);
        assert_eq!(point.velocities.len(), 6);

        // delta_x = linear_scale * period * 1 = 0.005, so velocity is 0.5
        assert_relative_eq!(point.velocities[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(point.velocities[1], 0.0, epsilon = 1e-12);

        // The position delta passes through the freshly reset filter
        assert_relative_eq!(point.positions[0], 0.005 / (1.0 + coeff), epsilon = 1e-12);

        // prev_joint_velocity reflects the chosen delta
        assert_relative_eq!(servo.prev_joint_velocity[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_twist_in_rotated_frame() {
        use nalgebra::UnitQuaternion;
        use std::f64::consts::FRAC_PI_2;

        let mut model = StubModel::with_jacobian(DMatrix::identity(6, 6));
        model.frames.insert(
            "rotated".into(),
            Isometry3::from_parts(
                nalgebra::Translation3::new(0.0, 0.0, 0.0),
                UnitQuaternion::from_euler_angles(0.0, 0.0, FRAC_PI_2),
            ),
        );
        let mut servo = make_servo(nominal_params(), model);
        let t0 = Utc::now();

        let mut cmd = twist_x(t0);
        cmd.frame_id = "rotated".into();
        servo.command_handle().set_twist(cmd);

        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        // A 90 degree rotation about planning Z maps the X command onto Y
        let point = &trajectory(output).points[0];
        assert_relative_eq!(point.velocities[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(point.velocities[1], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_drift_on_rotation_axes() {
        let mut servo = identity_servo(nominal_params());
        let t0 = Utc::now();

        servo.set_drift_dimensions(&AxisMask {
            x_translation: false,
            y_translation: false,
            z_translation: false,
            x_rotation: true,
            y_rotation: true,
            z_rotation: true,
        });

        // A purely rotational command with all rotation axes drifting
        servo.command_handle().set_twist(TwistCmd {
            stamp: Some(t0),
            frame_id: "base".into(),
            linear: [0.0, 0.0, 0.0],
            angular: [1.0, 1.0, 1.0],
        });

        tick(&mut servo, t0);
        let (output, report) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        // The delta is computed from the linear part only, which is zero
        assert!(report.published);
        let point = &trajectory(output).points[0];
        for velocity in point.velocities.iter() {
            assert_relative_eq!(*velocity, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_control_dimensions_zero_the_twist() {
        let mut servo = identity_servo(nominal_params());
        let t0 = Utc::now();

        servo.set_control_dimensions(&AxisMask::all(false));
        servo.command_handle().set_twist(twist_x(t0));

        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        // Every component was forced to zero before IK
        let point = &trajectory(output).points[0];
        for velocity in point.velocities.iter() {
            assert_eq!(*velocity, 0.0);
        }
    }

    #[test]
    fn test_cartesian_wins_over_joint() {
        let mut servo = identity_servo(nominal_params());
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));
        servo.command_handle().set_joint_jog(JointJogCmd {
            stamp: Some(t0),
            joint_names: vec!["joint_5".into()],
            velocities: vec![1.0],
        });

        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        // The twist is acted on, the jog is not
        let point = &trajectory(output).points[0];
        assert_relative_eq!(point.velocities[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(point.velocities[5], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_joint_jog_path() {
        let mut servo = identity_servo(nominal_params());
        let t0 = Utc::now();

        servo.command_handle().set_joint_jog(JointJogCmd {
            stamp: Some(t0),
            joint_names: vec!["joint_2".into()],
            velocities: vec![-1.0],
        });

        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        // joint_scale (0.5) * command (-1)
        let point = &trajectory(output).points[0];
        assert_relative_eq!(point.velocities[2], -0.5, epsilon = 1e-12);
        assert_relative_eq!(point.velocities[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_collision_halt_latches_until_reset() {
        let mut servo = identity_servo(nominal_params());
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));
        servo.collision_scale_handle().set(0.0);

        tick(&mut servo, t0);
        let (output, report) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        // The halt is visible immediately in the output, and on the status
        // stream one tick later
        assert_eq!(report.status, ServoStatus::NoWarning);
        assert_eq!(servo.status(), ServoStatus::HaltForCollision);
        let point = &trajectory(output).points[0];
        for velocity in point.velocities.iter() {
            assert_eq!(*velocity, 0.0);
        }

        // Releasing the collision scale is not enough: the status latches
        servo.collision_scale_handle().set(1.0);
        servo.command_handle().set_twist(twist_x(t0 + ChronoDuration::milliseconds(10)));
        let (output, report) = tick(&mut servo, t0 + ChronoDuration::milliseconds(10));
        assert_eq!(report.status, ServoStatus::HaltForCollision);
        let point = &trajectory(output).points[0];
        assert_eq!(point.velocities[0], 0.0);

        // The reset telecommand clears it and motion resumes
        servo.reset_status();
        servo.command_handle().set_twist(twist_x(t0 + ChronoDuration::milliseconds(15)));
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(15));
        let point = &trajectory(output).points[0];
        assert_relative_eq!(point.velocities[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_stale_command_halts_then_suppresses() {
        let mut params = nominal_params();
        params.num_outgoing_halt_msgs_to_publish = 2;
        let mut servo = identity_servo(params);
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));
        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));
        assert!(output.command.is_some());

        // Well past the 0.1 s timeout the command is stale; halts are
        // published for limit + 1 ticks, then suppressed
        let mut halts_published = 0;
        let mut suppressed = 0;
        for k in 0..6 {
            let now = t0 + ChronoDuration::milliseconds(200 + 10 * k);
            let (output, report) = tick(&mut servo, now);

            match output.command {
                Some(ServoCommand::Trajectory(trajectory)) => {
                    halts_published += 1;
                    let point = &trajectory.points[0];
                    for velocity in point.velocities.iter() {
                        assert_eq!(*velocity, 0.0);
                    }
                    // Positions re-assert the current measured state
                    assert_relative_eq!(point.positions[0], 0.0, epsilon = 1e-12);
                }
                Some(_) => panic!("Expected a trajectory command"),
                None => {
                    assert!(!report.published);
                    suppressed += 1;
                }
            }
        }

        assert_eq!(halts_published, 3);
        assert_eq!(suppressed, 3);
    }

    #[test]
    fn test_zero_halt_limit_republishes_forever() {
        let mut params = nominal_params();
        params.num_outgoing_halt_msgs_to_publish = 0;
        let mut servo = identity_servo(params);
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));
        tick(&mut servo, t0);
        tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        for k in 0..20 {
            let now = t0 + ChronoDuration::milliseconds(200 + 10 * k);
            let (output, _) = tick(&mut servo, now);
            assert!(output.command.is_some());
        }
    }

    #[test]
    fn test_pause_gates_publication() {
        let mut servo = identity_servo(nominal_params());
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));
        tick(&mut servo, t0);

        servo.set_paused(true);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));
        assert!(output.command.is_none());

        servo.set_paused(false);
        servo.command_handle().set_twist(twist_x(t0 + ChronoDuration::milliseconds(8)));
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(10));
        assert!(output.command.is_some());
    }

    #[test]
    fn test_nan_command_drops_the_tick() {
        let mut servo = identity_servo(nominal_params());
        let t0 = Utc::now();

        let mut cmd = twist_x(t0);
        cmd.linear[1] = f64::NAN;
        servo.command_handle().set_twist(cmd);

        tick(&mut servo, t0);
        let (output, report) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));
        assert!(output.command.is_none());
        assert!(!report.published);

        // A valid command afterwards moves normally
        servo.command_handle().set_twist(twist_x(t0 + ChronoDuration::milliseconds(8)));
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(10));
        let point = &trajectory(output).points[0];
        assert_relative_eq!(point.velocities[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_range_unitless_drops_the_tick() {
        let mut servo = identity_servo(nominal_params());
        let t0 = Utc::now();

        let mut cmd = twist_x(t0);
        cmd.linear[0] = 1.5;
        servo.command_handle().set_twist(cmd);

        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));
        assert!(output.command.is_none());
    }

    #[test]
    fn test_joint_bound_halt() {
        let params = nominal_params();
        let model = StubModel::with_jacobian(DMatrix::identity(6, 6));
        let names = model.names.clone();

        let joint_state = JointStateHandle::new();
        let mut state = JointState::zeroed(names);
        // Position bounds are +/-10 with a 0.1 margin
        state.positions[0] = 9.95;
        joint_state.set(state);

        let mut servo =
            ServoCalcs::with_params(params, Box::new(model), None, joint_state).unwrap();
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));
        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        // Motion towards the bound is replaced by a sudden halt
        assert_eq!(servo.status(), ServoStatus::JointBound);
        let point = &trajectory(output).points[0];
        assert_relative_eq!(point.positions[0], 9.95, epsilon = 1e-12);
        for velocity in point.velocities.iter() {
            assert_eq!(*velocity, 0.0);
        }
    }

    #[test]
    fn test_gazebo_redundant_points() {
        let mut params = nominal_params();
        params.use_gazebo = true;
        params.gazebo_redundant_message_count = 5;
        let mut servo = identity_servo(params);
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));
        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        let trajectory = trajectory(output);
        assert_eq!(trajectory.points.len(), 5);

        // The fill starts at index 2; index 1 stays a default point
        assert_eq!(trajectory.points[0].time_from_start_s, 0.01);
        assert!(trajectory.points[1].positions.is_empty());
        assert_relative_eq!(trajectory.points[2].time_from_start_s, 0.02, epsilon = 1e-12);
        assert_relative_eq!(trajectory.points[4].time_from_start_s, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_float_array_output_positions() {
        let mut params = nominal_params();
        params.command_out_type = CommandOutType::FloatArray;
        let coeff = params.low_pass_filter_coeff;
        let mut servo = identity_servo(params);
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));
        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        // Positions win when both quantities are published
        match output.command {
            Some(ServoCommand::JointArray(JointArray::Positions(data))) => {
                assert_eq!(data.len(), 6);
                assert_relative_eq!(data[0], 0.005 / (1.0 + coeff), epsilon = 1e-12);
            }
            other => panic!("Expected a joint position array, got {:?}", other),
        }
    }

    #[test]
    fn test_float_array_output_velocities() {
        let mut params = nominal_params();
        params.command_out_type = CommandOutType::FloatArray;
        params.publish_joint_positions = false;
        let mut servo = identity_servo(params);
        let t0 = Utc::now();

        servo.command_handle().set_twist(twist_x(t0));
        tick(&mut servo, t0);
        let (output, _) = tick(&mut servo, t0 + ChronoDuration::milliseconds(5));

        match output.command {
            Some(ServoCommand::JointArray(JointArray::Velocities(data))) => {
                assert_eq!(data.len(), 6);
                assert_relative_eq!(data[0], 0.5, epsilon = 1e-12);
            }
            other => panic!("Expected a joint velocity array, got {:?}", other),
        }
    }

    #[test]
    fn test_command_frame_transform_accessor() {
        let mut model = StubModel::with_jacobian(DMatrix::identity(6, 6));
        model
            .frames
            .insert("tool0".into(), Isometry3::translation(0.0, 0.0, 1.0));
        let mut servo = make_servo(nominal_params(), model);

        // Uninitialised before the first tick
        assert!(servo.command_frame_transform().is_none());

        tick(&mut servo, Utc::now());
        let tf = servo.command_frame_transform().unwrap();
        assert_relative_eq!(tf.translation.vector.z, 1.0, epsilon = 1e-12);
    }
}

