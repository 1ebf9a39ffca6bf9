//! Error types for chartwatch-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from one render invocation.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The engine executable could not be started.
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the engine's output or exit status failed.
    #[error("I/O error reading engine {stream}: {source}")]
    Io {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited unsuccessfully.
    #[error("{} exited with {}: {}", .program.display(), describe_exit(.code), .stderr)]
    Exit {
        program: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    /// A document in the stream is not valid YAML.
    #[error("invalid YAML in document {index} (line {line}): {source}")]
    Decode {
        index: usize,
        line: usize,
        #[source]
        source: serde_yaml::Error,
    },

    /// The render was abandoned because shutdown was requested.
    #[error("render cancelled")]
    Cancelled,
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
