//! chartwatch core library: domain types, filter matching, configuration, errors.
//!
//! - [`types`]: [`RenderRequest`] and the typed [`Document`]
//! - [`filter`]: [`FilterSpec`] kind/name selection
//! - [`config`]: the YAML configuration file and resolved [`Settings`]
//! - [`error`]: error taxonomy shared by the other crates

pub mod config;
pub mod error;
pub mod filter;
pub mod types;

pub use config::{FilterConfig, Settings, WatchConfig, DEFAULT_ENGINE};
pub use error::{ConfigError, FilterError, MalformedDocumentError, ShapeError};
pub use filter::{FilterEntry, FilterSpec};
pub use types::{Document, RenderRequest};
