//! Error types for chartwatch-core.

use std::path::PathBuf;

use thiserror::Error;

/// Why a decoded document is not a resource definition.
///
/// The renderer drops documents failing this check without reporting them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("document is not a mapping")]
    NotAMapping,

    #[error("document has no `{field}`")]
    MissingField { field: &'static str },

    #[error("`{field}` is not a string")]
    NotAString { field: &'static str },
}

/// A document selected by a filter entry has no `metadata.name`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{api_version} {kind} has no metadata.name")]
pub struct MalformedDocumentError {
    pub kind: String,
    pub api_version: String,
}

/// Errors building a [`crate::FilterSpec`].
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter `{spec}` has an empty kind")]
    EmptyKind { spec: String },

    #[error("invalid name pattern `{pattern}` for kind `{kind}`: {source}")]
    InvalidPattern {
        kind: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("a filter needs at least one kind/name entry")]
    NoEntries,
}

/// Startup configuration errors. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no chart given; pass --chart or set `chart` in the config file")]
    MissingChart,

    #[error("no filters given; pass --filter KIND[=PATTERN] or --kind/--resource")]
    NoFilters,

    #[error("--resource needs --kind")]
    ResourceWithoutKind,

    #[error(transparent)]
    Filter(#[from] FilterError),
}
