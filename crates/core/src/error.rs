//! Error types for the cliffray core.

use thiserror::Error;

/// Errors produced while building or driving the raymarch pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Neither a WebGL2 nor a WebGL1 context could be obtained.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    Compilation {
        /// The shader stage that failed ("vertex" or "fragment").
        stage: String,
        /// Line-numbered source followed by the driver's info log.
        log: String,
    },

    /// A program failed to link.
    #[error("shader link error:\n{0}")]
    Link(String),

    /// A program was missing or failed driver-side validation.
    #[error("program validation failed: {0}")]
    Validation(String),

    /// Camera, field or algorithm configuration was rejected before any GPU work.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A GPU object could not be created or a driver call failed mid-frame.
    #[error("gpu error: {0}")]
    Gpu(String),

    /// The runtime was used after `dispose`.
    #[error("shader runtime is not initialized")]
    NotInitialized,

    /// A field preset name was not recognized.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// Writing an image or reading input failed.
    #[error("io error: {0}")]
    Io(String),
}
