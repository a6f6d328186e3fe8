//! Host platform utility functions

use std::path::PathBuf;

/// Retrieve a short description of the host platform.
pub fn get_platform() -> String {
    format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH)
}

/// Get the software root directory from the environment.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var("ARM_SERVO_SW_ROOT").map(PathBuf::from)
}
