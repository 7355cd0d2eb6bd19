//! Settings for one run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::types::{ConcurrencyLimits, OrchestratorError};
use crate::config::Config;
use crate::schedule::SpeedSchedule;

/// A remote source directory and where its finished items go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTarget {
    pub remote_dir: String,
    /// `None` leaves finished items in the working directory.
    pub target_dir: Option<PathBuf>,
}

impl SourceTarget {
    pub fn new(remote_dir: impl Into<String>, target_dir: Option<PathBuf>) -> Self {
        Self {
            remote_dir: remote_dir.into(),
            target_dir,
        }
    }

    /// Resolves colon-delimited source and target lists.
    ///
    /// Targets map positionally onto sources; a source without a positional
    /// target falls back to `map`. Without a source list, every entry of
    /// `map` is a source.
    pub fn resolve(
        sources: Option<&str>,
        targets: Option<&str>,
        map: &BTreeMap<String, PathBuf>,
    ) -> Vec<SourceTarget> {
        let Some(sources) = sources.filter(|s| !s.trim().is_empty()) else {
            return map
                .iter()
                .map(|(remote, target)| SourceTarget::new(remote.clone(), Some(target.clone())))
                .collect();
        };

        let targets: Vec<&str> = targets
            .map(|t| t.split(':').collect())
            .unwrap_or_default();

        sources
            .split(':')
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(i, remote)| {
                let target = targets
                    .get(i)
                    .filter(|t| !t.is_empty())
                    .map(|t| PathBuf::from(*t))
                    .or_else(|| lookup(map, remote));
                SourceTarget::new(remote, target)
            })
            .collect()
    }

    /// Whether `dir` names this source, ignoring a trailing slash.
    pub fn matches(&self, dir: &str) -> bool {
        normalize(&self.remote_dir) == normalize(dir)
    }
}

fn normalize(dir: &str) -> &str {
    if dir.len() > 1 {
        dir.trim_end_matches('/')
    } else {
        dir
    }
}

fn lookup(map: &BTreeMap<String, PathBuf>, remote: &str) -> Option<PathBuf> {
    map.iter()
        .find(|(key, _)| normalize(key) == normalize(remote))
        .map(|(_, target)| target.clone())
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub host: String,
    pub sources: Vec<SourceTarget>,
    pub limits: ConcurrencyLimits,
    pub speed_schedule: SpeedSchedule,
    /// Remove remote sources of transferred items.
    pub remove_sources: bool,
    /// Item names matching any of these are never removed remotely.
    pub exclude_patterns: Vec<String>,
    pub working_dir: PathBuf,
}

impl RunSettings {
    pub fn new(host: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            sources: Vec::new(),
            limits: ConcurrencyLimits::default(),
            speed_schedule: SpeedSchedule::new(),
            remove_sources: false,
            exclude_patterns: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn with_source(mut self, source: SourceTarget) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_limits(mut self, limits: ConcurrencyLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_speed_schedule(mut self, schedule: SpeedSchedule) -> Self {
        self.speed_schedule = schedule;
        self
    }

    pub fn with_source_removal(mut self, exclude_patterns: Vec<String>) -> Self {
        self.remove_sources = true;
        self.exclude_patterns = exclude_patterns;
        self
    }

    /// Builds settings from a merged configuration.
    pub fn from_config(
        host: impl Into<String>,
        sources: Vec<SourceTarget>,
        config: &Config,
    ) -> Result<Self, OrchestratorError> {
        let speed_schedule = SpeedSchedule::from_map(&config.transfer.speed_schedule)
            .map_err(|e| OrchestratorError::InvalidSettings(e.to_string()))?;

        Ok(Self {
            host: host.into(),
            sources,
            limits: config.transfer.limits(),
            speed_schedule,
            remove_sources: config.remove_sources.remove,
            exclude_patterns: config.remove_sources.exclude.clone(),
            working_dir: config.transfer.working_dir.clone(),
        })
    }

    /// Target directory for items listed in `source_dir`.
    pub fn target_for(&self, source_dir: &str) -> Option<&Path> {
        self.sources
            .iter()
            .find(|s| s.matches(source_dir))
            .and_then(|s| s.target_dir.as_deref())
    }

    /// Whether `source_dir` is one of this run's sources.
    pub fn is_source(&self, source_dir: &str) -> bool {
        self.sources.iter().any(|s| s.matches(source_dir))
    }
}
