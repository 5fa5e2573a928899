use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use depgate::runner::{unit_names, FinishHandler, UnitRef};

/// One recorded finish-handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishCall {
    pub label: String,
    pub remaining: Vec<String>,
}

/// Shared log of finish-handler invocations, in call order.
#[derive(Debug, Clone, Default)]
pub struct FinishLog {
    calls: Arc<Mutex<Vec<FinishCall>>>,
}

impl FinishLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that records its call under `label`.
    pub fn handler(&self, label: &str) -> impl FinishHandler + 'static {
        let calls = Arc::clone(&self.calls);
        let label = label.to_string();
        move |remaining: Vec<UnitRef>| -> anyhow::Result<()> {
            calls.lock().unwrap().push(FinishCall {
                label,
                remaining: unit_names(&remaining),
            });
            Ok(())
        }
    }

    /// Handler that records its call under `label`, then returns an error.
    pub fn failing_handler(&self, label: &str) -> impl FinishHandler + 'static {
        let calls = Arc::clone(&self.calls);
        let label = label.to_string();
        move |remaining: Vec<UnitRef>| -> anyhow::Result<()> {
            calls.lock().unwrap().push(FinishCall {
                label: label.clone(),
                remaining: unit_names(&remaining),
            });
            Err(anyhow!("finish handler '{label}' failed"))
        }
    }

    pub fn calls(&self) -> Vec<FinishCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.label).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().unwrap().is_empty()
    }
}
