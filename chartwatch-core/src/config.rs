//! YAML configuration file and resolved startup settings.
//!
//! ```yaml
//! chart: ./charts/web
//! release: web
//! values: [./values/dev.yaml]
//! watch: [./values/shared]
//! args: ["--set", "image.tag=dev"]
//! filters:
//!   - kind: Deployment
//!     name: "^web$"
//!   - kind: Service
//! ```
//!
//! Relative paths in a loaded file resolve against the file's directory.
//! Command-line flags are expressed as a second [`WatchConfig`] and layered
//! on top with [`WatchConfig::merge`].

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, FilterError};
use crate::filter::{FilterEntry, FilterSpec};
use crate::types::RenderRequest;

/// Engine executable used when none is configured.
pub const DEFAULT_ENGINE: &str = "helm";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub chart: Option<PathBuf>,
    pub release: Option<String>,
    pub helm: Option<PathBuf>,
    pub values: Vec<PathBuf>,
    pub watch: Vec<PathBuf>,
    pub args: Vec<String>,
    pub filters: Vec<FilterConfig>,
}

/// One `filters:` entry. A missing `name` selects every name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FilterConfig {
    pub fn new(kind: impl Into<String>, name: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            name,
        }
    }

    pub fn compile(&self) -> Result<FilterEntry, FilterError> {
        match self.name.as_deref() {
            Some(pattern) if !pattern.is_empty() => FilterEntry::new(&self.kind, pattern),
            _ => FilterEntry::any_name(&self.kind),
        }
    }
}

impl FromStr for FilterConfig {
    type Err = FilterError;

    /// Parse the command-line form `KIND[=PATTERN]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = match s.split_once('=') {
            Some((kind, pattern)) => (kind, Some(pattern).filter(|p| !p.is_empty())),
            None => (s, None),
        };
        if kind.trim().is_empty() {
            return Err(FilterError::EmptyKind { spec: s.to_string() });
        }
        Ok(Self::new(kind.trim(), name.map(str::to_string)))
    }
}

/// Validated startup configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub request: RenderRequest,
    pub filter: FilterSpec,
    pub program: PathBuf,
    /// Paths watched in addition to the chart and value files.
    pub watch: Vec<PathBuf>,
}

impl Settings {
    /// Chart, value files, then extra watch paths.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.request.inputs();
        paths.extend(self.watch.iter().cloned());
        paths
    }
}

impl WatchConfig {
    /// Load a configuration file, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: WatchConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.chart = self.chart.map(resolve);
        self.values = self.values.into_iter().map(resolve).collect();
        self.watch = self.watch.into_iter().map(resolve).collect();
        // `helm` is left alone so a bare program name still goes through PATH.
        self
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// Scalars from `overrides` win when set; lists are concatenated with
    /// `self`'s entries first.
    pub fn merge(mut self, overrides: WatchConfig) -> Self {
        if overrides.chart.is_some() {
            self.chart = overrides.chart;
        }
        if overrides.release.is_some() {
            self.release = overrides.release;
        }
        if overrides.helm.is_some() {
            self.helm = overrides.helm;
        }
        self.values.extend(overrides.values);
        self.watch.extend(overrides.watch);
        self.args.extend(overrides.args);
        self.filters.extend(overrides.filters);
        self
    }

    /// Validate and build the settings a run needs.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let chart = self.chart.ok_or(ConfigError::MissingChart)?;
        if self.filters.is_empty() {
            return Err(ConfigError::NoFilters);
        }
        let entries = self
            .filters
            .iter()
            .map(FilterConfig::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let filter = FilterSpec::new(entries)?;

        let mut request = RenderRequest::new(chart)
            .with_values(self.values)
            .with_extra_args(self.args);
        if let Some(release) = self.release {
            request = request.with_release(release);
        }

        Ok(Settings {
            request,
            filter,
            program: self.helm.unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE)),
            watch: self.watch,
        })
    }
}
