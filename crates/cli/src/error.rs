//! Structured CLI errors with meaningful exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: render error (shader generation, pipeline build, GPU-side failure)
//! - 11: I/O error (file read or write, snapshot)
//! - 12: input error (bad preset, bad JSON, rejected camera or algorithm config)
//! - 13: serialization error

use cliffray_core::RenderError;
use std::fmt;

/// Errors produced by CLI operations, each mapped to a distinct exit code.
pub enum CliError {
    /// A render-level error the user's input did not cause.
    Render(RenderError),
    /// An I/O error (file read, snapshot write).
    Io(String),
    /// A user input error (unknown preset, bad JSON, invalid config).
    Input(String),
    /// A serialization error (JSON output failure).
    Serialization(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Render(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Render(e) => write!(f, "{e}"),
            CliError::Io(msg) => write!(f, "{msg}"),
            CliError::Input(msg) => write!(f, "{msg}"),
            CliError::Serialization(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<RenderError> for CliError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Io(msg) => CliError::Io(msg),
            RenderError::Configuration(_) | RenderError::UnknownPreset(_) => {
                CliError::Input(e.to_string())
            }
            other => CliError::Render(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_exit_code_is_10() {
        let err = CliError::Render(RenderError::NotInitialized);
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn io_error_exit_code_is_11() {
        let err = CliError::Io("write failed".into());
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn input_error_exit_code_is_12() {
        let err = CliError::Input("bad preset".into());
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn serialization_error_exit_code_is_13() {
        let err = CliError::Serialization("json fail".into());
        assert_eq!(err.exit_code(), 13);
    }

    #[test]
    fn from_render_error_io_routes_to_cli_io() {
        let cli_err = CliError::from(RenderError::Io("disk full".into()));
        assert_eq!(cli_err.exit_code(), 11);
        assert!(cli_err.to_string().contains("disk full"));
    }

    #[test]
    fn config_and_preset_errors_route_to_input() {
        let cli_err = CliError::from(RenderError::Configuration("fov must be in (0, 180)".into()));
        assert_eq!(cli_err.exit_code(), 12);
        assert!(cli_err.to_string().contains("fov"));

        let cli_err = CliError::from(RenderError::UnknownPreset("xyz".into()));
        assert_eq!(cli_err.exit_code(), 12);
        assert!(cli_err.to_string().contains("xyz"));
    }

    #[test]
    fn other_render_errors_route_to_cli_render() {
        let cli_err = CliError::from(RenderError::Link("undefined varying".into()));
        assert_eq!(cli_err.exit_code(), 10);
        assert!(cli_err.to_string().contains("undefined varying"));
    }

    #[test]
    fn from_serde_json_error_routes_to_serialization() {
        let bad_json = serde_json::from_str::<serde_json::Value>("{invalid");
        let cli_err = CliError::from(bad_json.unwrap_err());
        assert_eq!(cli_err.exit_code(), 13);
    }
}
