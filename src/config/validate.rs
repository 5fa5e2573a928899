// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::duration::parse_duration;
use crate::config::model::{PlanFile, ProviderPlan, RawPlanFile};
use crate::errors::{DepgateError, Result};
use crate::runner::RunnerOptions;

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = DepgateError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_units(&raw)?;
        let runner = parse_runner_section(&raw)?;
        let providers = parse_providers(&raw)?;
        validate_unit_dependencies(&raw)?;
        validate_required_cycles(&raw)?;
        Ok(PlanFile::new_unchecked(runner, providers, raw.unit))
    }
}

fn config_duration(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| DepgateError::ConfigError(format!("{field}: {e}")))
}

fn ensure_has_units(raw: &RawPlanFile) -> Result<()> {
    if raw.unit.is_empty() {
        return Err(DepgateError::ConfigError(
            "plan must contain at least one [unit.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn parse_runner_section(raw: &RawPlanFile) -> Result<RunnerOptions> {
    let timeout = config_duration("[runner].timeout", &raw.runner.timeout)?;
    let initial_delay = config_duration("[runner].initial_delay", &raw.runner.initial_delay)?;
    let period = config_duration("[runner].period", &raw.runner.period)?;

    if period.is_zero() {
        return Err(DepgateError::ConfigError(
            "[runner].period must be greater than zero".to_string(),
        ));
    }

    Ok(RunnerOptions {
        timeout,
        initial_delay,
        period,
    })
}

fn parse_providers(raw: &RawPlanFile) -> Result<BTreeMap<String, ProviderPlan>> {
    let mut providers = BTreeMap::new();
    for (name, cfg) in raw.provider.iter() {
        let field = format!("[provider.{name}].available_after");
        let available_after = config_duration(&field, &cfg.available_after)?;
        providers.insert(name.clone(), ProviderPlan { available_after });
    }
    Ok(providers)
}

fn validate_unit_dependencies(raw: &RawPlanFile) -> Result<()> {
    let mut known: BTreeSet<&str> = raw.provider.keys().map(String::as_str).collect();

    for (name, unit) in raw.unit.iter() {
        for provided in unit.provides.iter() {
            if raw.provider.contains_key(provided) {
                return Err(DepgateError::ConfigError(format!(
                    "unit '{name}' provides '{provided}', which is already declared as a [provider]"
                )));
            }
            known.insert(provided.as_str());
        }
    }

    for (name, unit) in raw.unit.iter() {
        for dep in unit.requires.iter().chain(unit.optional.iter()) {
            if !known.contains(dep.as_str()) {
                return Err(DepgateError::ConfigError(format!(
                    "unit '{name}' depends on unknown provider '{dep}'"
                )));
            }
        }
        for dep in unit.requires.iter() {
            if unit.provides.contains(dep) {
                return Err(DepgateError::ConfigError(format!(
                    "unit '{name}' cannot require '{dep}', which it provides itself"
                )));
            }
        }
    }

    Ok(())
}

fn validate_required_cycles(raw: &RawPlanFile) -> Result<()> {
    // Edge direction: provider unit -> dependant unit.
    let mut provided_by: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, unit) in raw.unit.iter() {
        for provided in unit.provides.iter() {
            provided_by.entry(provided.as_str()).or_default().push(name.as_str());
        }
    }

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in raw.unit.keys() {
        graph.add_node(name.as_str());
    }
    for (name, unit) in raw.unit.iter() {
        for dep in unit.requires.iter() {
            for provider in provided_by.get(dep.as_str()).into_iter().flatten() {
                graph.add_edge(*provider, name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(DepgateError::DagCycle(format!(
            "cycle detected in required dependencies involving unit '{}'",
            cycle.node_id()
        ))),
    }
}
