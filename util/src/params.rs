//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot load the parameter file: {0}")]
    FileLoadError(#[from] std::io::Error),

    #[error("Cannot deserialise the parameter file: {0}")]
    DeserialiseError(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
pub fn load<P, Q>(param_file_path: Q) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    Q: AsRef<Path>,
{
    // Load the file into a string
    let params_str = read_to_string(param_file_path)?;

    // Parse the string into the parameter struct
    Ok(toml::from_str(params_str.as_str())?)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct TestParams {
        gain: f64,
        name: String,
    }

    #[test]
    fn test_load() {
        let mut path = std::env::temp_dir();
        path.push("util_params_test.toml");
        std::fs::write(&path, "gain = 0.5\nname = \"servo\"\n").unwrap();

        let params: TestParams = load(&path).unwrap();
        assert_eq!(params.gain, 0.5);
        assert_eq!(params.name, "servo");
    }

    #[test]
    fn test_load_missing_file() {
        let result: Result<TestParams, _> = load("definitely_not_a_file.toml");
        assert!(matches!(result, Err(LoadError::FileLoadError(_))));
    }
}
