// src/config/mod.rs

//! Plan file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a plan file from disk (`loader.rs`).
//! - Validate dependency references and cycles (`validate.rs`).
//! - Parse duration strings such as `"500ms"` or `"10t"` (`duration.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path};
pub use model::{PlanFile, ProviderConfig, ProviderPlan, RawPlanFile, RunnerSection, UnitConfig};
