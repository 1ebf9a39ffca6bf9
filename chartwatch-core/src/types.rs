//! Domain types for a render cycle.
//!
//! A [`RenderRequest`] is built once at startup and reused for every cycle.
//! A [`Document`] is one resource definition decoded from the engine output;
//! it only exists once `kind` and `apiVersion` have been validated.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use serde_yaml::Value;

use crate::error::{MalformedDocumentError, ShapeError};

// ---------------------------------------------------------------------------
// RenderRequest
// ---------------------------------------------------------------------------

/// Everything the engine needs to render a chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Path to the chart directory (or packaged chart).
    pub chart: PathBuf,
    /// Release name; `None` lets the engine pick one.
    pub release: Option<String>,
    /// Value files, forwarded as `-f <file>`.
    pub values: Vec<PathBuf>,
    /// Pass-through arguments forwarded verbatim after everything else.
    pub extra_args: Vec<String>,
}

impl RenderRequest {
    pub fn new(chart: impl Into<PathBuf>) -> Self {
        Self {
            chart: chart.into(),
            release: None,
            values: Vec::new(),
            extra_args: Vec::new(),
        }
    }

    /// Set the release name. An empty name is the same as no name.
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        let release = release.into();
        self.release = (!release.trim().is_empty()).then_some(release);
        self
    }

    pub fn with_values<I, P>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.values.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Engine arguments: `template [release] <chart> [-f <values>]... [extra]...`.
    pub fn template_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["template".into()];
        if let Some(release) = &self.release {
            args.push(release.into());
        }
        args.push(self.chart.clone().into_os_string());
        for values in &self.values {
            args.push("-f".into());
            args.push(values.clone().into_os_string());
        }
        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }

    /// Filesystem inputs of the render: the chart followed by its value files.
    pub fn inputs(&self) -> Vec<PathBuf> {
        std::iter::once(self.chart.clone())
            .chain(self.values.iter().cloned())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A structurally valid resource document.
///
/// The full decoded mapping is kept so re-encoding reproduces every field in
/// source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    kind: String,
    api_version: String,
    name: Option<String>,
    body: Value,
}

impl Document {
    /// Validate a decoded YAML value.
    ///
    /// `kind` and `apiVersion` must be present strings. `metadata.name` is
    /// optional here and only checked by [`Document::require_name`].
    pub fn from_value(value: Value) -> Result<Self, ShapeError> {
        if !value.is_mapping() {
            return Err(ShapeError::NotAMapping);
        }
        let kind = required_str(&value, "kind")?;
        let api_version = required_str(&value, "apiVersion")?;
        let name = value
            .get("metadata")
            .and_then(|metadata| metadata.get("name"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Self {
            kind,
            api_version,
            name,
            body: value,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `metadata.name`, or a typed error when the document has none.
    pub fn require_name(&self) -> Result<&str, MalformedDocumentError> {
        self.name().ok_or_else(|| MalformedDocumentError {
            kind: self.kind.clone(),
            api_version: self.api_version.clone(),
        })
    }

    /// Re-encode the document as YAML text.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.body)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}/{}", self.kind, name),
            None => write!(f, "{}/<unnamed>", self.kind),
        }
    }
}

fn required_str(value: &Value, field: &'static str) -> Result<String, ShapeError> {
    match value.get(field) {
        None | Some(Value::Null) => Err(ShapeError::MissingField { field }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ShapeError::NotAString { field }),
    }
}
