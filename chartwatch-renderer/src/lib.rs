//! # chartwatch-renderer
//!
//! Runs the external templating engine and decodes its standard output as a
//! stream of YAML documents, one document at a time.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chartwatch_core::RenderRequest;
//! use chartwatch_renderer::HelmEngine;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn print_kinds() {
//!     let engine = HelmEngine::new(RenderRequest::new("charts/web").with_release("web"));
//!     if let Ok((documents, stats)) = engine.render(&CancellationToken::new()).await {
//!         for doc in &documents {
//!             println!("{doc}");
//!         }
//!         println!("{} kept, {} dropped", stats.kept, stats.dropped);
//!     }
//! }
//! ```

pub mod engine;
pub mod error;
pub mod stream;

pub use engine::{HelmEngine, ManifestSource, RenderStats};
pub use error::RenderError;
pub use stream::{DocumentStream, RawDocument};
