// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::runner::RunnerOptions;

/// Plan file as read from TOML, before validation.
///
/// ```toml
/// [runner]
/// timeout = "5s"
/// initial_delay = "1t"
/// period = "10t"
///
/// [provider.database]
/// available_after = "1s"
///
/// [unit.web]
/// requires = ["database"]
/// optional = ["cache"]
/// provides = ["web"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub runner: RunnerSection,

    /// Providers that appear on their own after a delay.
    #[serde(default)]
    pub provider: BTreeMap<String, ProviderConfig>,

    /// Units to queue on the runner, keyed by name.
    #[serde(default)]
    pub unit: BTreeMap<String, UnitConfig>,
}

/// `[runner]` section. Durations are strings parsed during validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    #[serde(default = "default_timeout")]
    pub timeout: String,

    #[serde(default = "default_initial_delay")]
    pub initial_delay: String,

    #[serde(default = "default_period")]
    pub period: String,
}

fn default_timeout() -> String {
    "10s".to_string()
}

fn default_initial_delay() -> String {
    "1t".to_string()
}

fn default_period() -> String {
    "10t".to_string()
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            initial_delay: default_initial_delay(),
            period: default_period(),
        }
    }
}

/// `[provider.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// When the provider becomes available, relative to start.
    #[serde(default = "default_available_after")]
    pub available_after: String,
}

fn default_available_after() -> String {
    "0ms".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            available_after: default_available_after(),
        }
    }
}

/// `[unit.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitConfig {
    /// Providers that must be available before the unit runs.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Providers the unit would like but can run without at the deadline.
    #[serde(default)]
    pub optional: Vec<String>,

    /// Names published once the unit has run.
    #[serde(default)]
    pub provides: Vec<String>,

    /// Number of initial run attempts that fail, to exercise retries.
    #[serde(default)]
    pub fail_first: u32,
}

/// Provider with its parsed arrival delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPlan {
    pub available_after: Duration,
}

/// Validated plan. Build one through `PlanFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub runner: RunnerOptions,
    pub providers: BTreeMap<String, ProviderPlan>,
    pub units: BTreeMap<String, UnitConfig>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(
        runner: RunnerOptions,
        providers: BTreeMap<String, ProviderPlan>,
        units: BTreeMap<String, UnitConfig>,
    ) -> Self {
        Self {
            runner,
            providers,
            units,
        }
    }
}
