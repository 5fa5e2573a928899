use std::collections::BTreeMap;

use depgate::config::{PlanFile, ProviderConfig, RawPlanFile, RunnerSection, UnitConfig};

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanBuilder {
    plan: RawPlanFile,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                runner: RunnerSection::default(),
                provider: BTreeMap::new(),
                unit: BTreeMap::new(),
            },
        }
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.plan.runner.timeout = timeout.to_string();
        self
    }

    pub fn initial_delay(mut self, delay: &str) -> Self {
        self.plan.runner.initial_delay = delay.to_string();
        self
    }

    pub fn period(mut self, period: &str) -> Self {
        self.plan.runner.period = period.to_string();
        self
    }

    pub fn with_provider(mut self, name: &str, available_after: &str) -> Self {
        self.plan.provider.insert(
            name.to_string(),
            ProviderConfig {
                available_after: available_after.to_string(),
            },
        );
        self
    }

    pub fn with_unit(mut self, name: &str, unit: UnitConfig) -> Self {
        self.plan.unit.insert(name.to_string(), unit);
        self
    }

    /// The raw plan, for tests that exercise validation failures.
    pub fn raw(self) -> RawPlanFile {
        self.plan
    }

    pub fn build(self) -> PlanFile {
        PlanFile::try_from(self.plan).expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `UnitConfig`.
#[derive(Default)]
pub struct UnitConfigBuilder {
    unit: UnitConfig,
}

impl UnitConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requires(mut self, name: &str) -> Self {
        self.unit.requires.push(name.to_string());
        self
    }

    pub fn optional(mut self, name: &str) -> Self {
        self.unit.optional.push(name.to_string());
        self
    }

    pub fn provides(mut self, name: &str) -> Self {
        self.unit.provides.push(name.to_string());
        self
    }

    pub fn fail_first(mut self, attempts: u32) -> Self {
        self.unit.fail_first = attempts;
        self
    }

    pub fn build(self) -> UnitConfig {
        self.unit
    }
}
