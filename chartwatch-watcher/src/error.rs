use std::path::PathBuf;

use chartwatch_renderer::RenderError;
use thiserror::Error;

/// Error surface for path watching, the pipeline loop, and output.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("cannot watch {path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot traverse {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WatcherError {
    WatcherError::Io {
        path: path.into(),
        source,
    }
}
