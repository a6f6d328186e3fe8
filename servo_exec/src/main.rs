//! Main servo executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging, parameters and the arm model
//!     - Main loop at the publish period:
//!         - Drain pending telecommands from the script source
//!         - Servo core processing (one tick)
//!         - Route the outputs: log the outgoing demand, archive the status
//!           report, loop published positions back into the joint state
//!
//! Without a network command link the telecommand source is a command
//! script; the loopback joint state simulates a robot that tracks demands
//! perfectly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use servo_exec::arm_model::ArmModel;
use servo_exec::model::KinematicModel;
use servo_exec::servo_calcs::{InputData, JointStateHandle, ServoCalcs};
use servo_exec::tc_processor;
use servo_if::cmd::JointState;
use servo_if::traj::{JointArray, ServoCommand};
use util::archive::Archiver;
use util::convert::Convert;
use util::logger::{logger_init, LevelFilter};
use util::script_interpreter::{PendingTcs, ScriptInterpreter};
use util::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options for the servo executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "servo_exec", about = "Arm servo executable")]
struct Opt {
    /// Path to the command script to execute.
    script: PathBuf,

    /// Directory containing the parameter files.
    #[structopt(long, default_value = "params")]
    params_dir: PathBuf,
}

/// One archived record of the servo status stream.
#[derive(Serialize)]
struct StatusRecord {
    time_s: f64,
    status: i8,
    worst_case_stop_time_s: f64,
    published: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let opt = Opt::from_args();

    let session =
        Session::new("servo_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Arm Servo Executable\n");
    info!("Running on: {}", util::host::get_platform());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS AND BUILD THE MODEL ----

    let arm_model = ArmModel::init(opt.params_dir.join("arm_model.toml"))
        .wrap_err("Failed to build the arm model")?;

    info!(
        "Arm model loaded: {} joints rooted at {}",
        arm_model.num_joints(),
        arm_model.root_frame()
    );

    // Seed the joint state with the model's home configuration; published
    // demands are looped back into this slot each cycle
    let joint_state = JointStateHandle::new();
    let mut loopback_state = JointState::zeroed(arm_model.joint_names().to_vec());
    loopback_state.positions = arm_model.positions().convert();
    loopback_state.stamp = Some(Utc::now());
    joint_state.set(loopback_state.clone());

    // ---- INITIALISE THE SERVO CORE ----

    let mut servo = ServoCalcs::init(
        opt.params_dir.join("servo_calcs.toml"),
        Box::new(arm_model),
        None,
        joint_state.clone(),
    )
    .wrap_err("Failed to initialise ServoCalcs")?;

    let publish_period_s = servo.params().publish_period_s;

    // ---- INITIALISE THE TC SOURCE ----

    info!("Loading script from {:?}", opt.script);

    let mut script = ScriptInterpreter::new(&opt.script).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} TCs\n",
        script.get_duration(),
        script.get_num_tcs()
    );

    // ---- INITIALISE ARCHIVING ----

    let status_archive_file = format!("{}.csv", servo.params().status_topic);
    let mut status_archive = Archiver::from_path(&session, &status_archive_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create the status archive: {}", e))?;

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    loop {
        let cycle_start_instant = Instant::now();
        let now = Utc::now();

        // ---- TELECOMMAND PROCESSING ----

        match script.get_pending_tcs() {
            PendingTcs::None => (),
            PendingTcs::Some(tc_vec) => {
                for tc in tc_vec.iter() {
                    tc_processor::exec(&mut servo, tc, now);
                }
            }
            // Exit if end of script reached
            PendingTcs::EndOfScript => {
                info!("End of TC script reached, stopping");
                break;
            }
        }

        // ---- SERVO PROCESSING ----

        let (output, report) = servo
            .proc(&InputData { now })
            .wrap_err("Servo processing failed")?;

        // ---- OUTPUT ROUTING ----

        match status_archive.serialise(StatusRecord {
            time_s: util::session::get_elapsed_seconds(),
            status: report.status.as_i8(),
            worst_case_stop_time_s: report.worst_case_stop_time_s,
            published: report.published,
        }) {
            Ok(_) => (),
            Err(e) => warn!("Could not archive the status report: {}", e),
        }

        if let Some(command) = output.command {
            match command {
                ServoCommand::Trajectory(trajectory) => {
                    if let Some(point) = trajectory.points.first() {
                        debug!(
                            "Demand: positions {:?} velocities {:?}",
                            point.positions, point.velocities
                        );

                        // Loop the demand back as the next measured state
                        if !point.positions.is_empty() {
                            loopback_state.positions = point.positions.clone();
                        }
                        if !point.velocities.is_empty() {
                            loopback_state.velocities = point.velocities.clone();
                        }
                        loopback_state.stamp = Some(now);
                        joint_state.set(loopback_state.clone());
                    }
                }
                ServoCommand::JointArray(array) => {
                    debug!("Demand: {:?}", array);

                    // Loop the demand back as the next measured state
                    match array {
                        JointArray::Positions(positions) => {
                            if !positions.is_empty() {
                                loopback_state.positions = positions;
                            }
                        }
                        JointArray::Velocities(velocities) => {
                            if !velocities.is_empty() {
                                loopback_state.velocities = velocities;
                            }
                        }
                    }
                    loopback_state.stamp = Some(now);
                    joint_state.set(loopback_state.clone());
                }
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(publish_period_s).checked_sub(cycle_dur) {
            Some(sleep_dur) => thread::sleep(sleep_dur),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - publish_period_s
            ),
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}
