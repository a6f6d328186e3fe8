//! # Servo command script interpreter module
//!
//! This module provides an interpreter for servo command scripts, allowing
//! telecommands to be injected into the executable at scripted times without
//! a network command link.
//!
//! A script is a plain text file of `<exec_time_s>: <json tc>;` entries, e.g.
//!
//! ```text
//! 0.5: {"type": "TWIST", "payload": {"linear": [0.5, 0, 0], "angular": [0, 0, 0]}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use crate::session::get_elapsed_seconds;
use servo_if::tc::{ServoTc, TcParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The telecommand to run
    tc: ServoTc,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_tcs` to acquire the telecommands that need executing.
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    cmds: VecDeque<Command>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError),
}

pub enum PendingTcs {
    None,
    Some(Vec<ServoTc>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let cmds = Self::parse(&script)?;

        Ok(ScriptInterpreter {
            _script_path: path,
            cmds,
        })
    }

    /// Parse a full script into the command queue.
    fn parse(script: &str) -> Result<VecDeque<Command>, ScriptError> {
        let mut tc_queue: VecDeque<Command> = VecDeque::new();

        // Each entry is a timestamp, a colon, and a JSON body up to the
        // terminating semicolon.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .unwrap();

        for cap in re.captures_iter(script) {
            // Parse the exec time
            let exec_time_s: f64 = match cap.get(1).unwrap().as_str().parse() {
                Ok(t) => t,
                Err(e) => return Err(ScriptError::InvalidTimestamp(format!("{}", e))),
            };

            // Parse the TC from the body. The scripts contain JSON only.
            let tc = match ServoTc::from_json(cap.get(3).unwrap().as_str()) {
                Ok(c) => c,
                Err(e) => return Err(ScriptError::InvalidTc(exec_time_s, e)),
            };

            tc_queue.push_back(Command { exec_time_s, tc });
        }

        if tc_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(tc_queue)
    }

    /// Return a vector of pending TCs, or `None` if no TCs need executing now.
    pub fn get_pending_tcs(&mut self) -> PendingTcs {
        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingTcs::EndOfScript;
        }

        let mut tc_vec: Vec<ServoTc> = vec![];

        let current_time_s = get_elapsed_seconds();

        // Peek items from the queue, if the head's exec time is lower than
        // the current time add it to the vector, and keep adding TCs until
        // the exec times are larger than the current time.
        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s < current_time_s {
                tc_vec.push(self.cmds.pop_front().unwrap().tc);
            } else {
                break;
            }
        }

        // If the vector is longer than 0 return Some, otherwise None
        if !tc_vec.is_empty() {
            PendingTcs::Some(tc_vec)
        } else {
            PendingTcs::None
        }
    }

    /// Get the number of TCs remaining in the script
    pub fn get_num_tcs(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let script = r#"
            0.5: {"type": "TWIST", "payload":
                {"linear": [0.5, 0.0, 0.0], "angular": [0.0, 0.0, 0.0]}};
            1.0: {"type": "PAUSE", "payload": true};
            2.0: {"type": "RESET_STATUS"};
        "#;

        let cmds = ScriptInterpreter::parse(script).unwrap();
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds.front().unwrap().exec_time_s, 0.5);
        assert_eq!(cmds.back().unwrap().exec_time_s, 2.0);

        assert!(matches!(cmds[0].tc, ServoTc::Twist(_)));
        assert!(matches!(cmds[1].tc, ServoTc::Pause(true)));
        assert!(matches!(cmds[2].tc, ServoTc::ResetStatus));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(
            ScriptInterpreter::parse("no commands here"),
            Err(ScriptError::ScriptEmpty)
        ));
    }

    #[test]
    fn test_parse_bad_tc() {
        assert!(matches!(
            ScriptInterpreter::parse(r#"1.0: {"type": "WARP_DRIVE"};"#),
            Err(ScriptError::InvalidTc(_, _))
        ));
    }
}
