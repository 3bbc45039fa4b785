//! Configuration and scenario files for the lento smoothing engine.
//!
//! This crate maps TOML documents onto the engine in `lento-core`:
//!
//! # Features
//!
//! - **Settings**: Load and save [`EngineSettings`], the on-disk form of
//!   [`lento_core::SmootherConfig`]
//! - **Scenarios**: Scripted block sequences with curves, incoming step
//!   events and initial states
//! - **Validation**: Reject settings the engine would refuse and lint curves
//!   it would silently repair
//! - **Rendering**: Play a scenario through the engine and report every block
//!
//! # Example
//!
//! ```rust,no_run
//! use lento_config::{Scenario, render_scenario, lint_scenario};
//!
//! let scenario = Scenario::load("glide.toml").unwrap();
//! for warning in lint_scenario(&scenario) {
//!     eprintln!("warning: {warning}");
//! }
//!
//! for report in render_scenario(&scenario).unwrap() {
//!     println!("block {}: {} events", report.index, report.events.len());
//! }
//! ```

mod error;
mod scenario;
mod settings;

/// Offline scenario rendering.
pub mod render;

/// Settings and scenario validation.
pub mod validation;

pub use error::ConfigError;
pub use render::{BlockReport, CurveReport, ScenarioRunner, render_scenario};
pub use scenario::{BlockSpec, CurveKind, CurveSpec, EventSpec, Scenario, SetState};
pub use settings::EngineSettings;
pub use validation::{
    LintWarning, ValidationError, ValidationResult, lint_scenario, validate_scenario,
    validate_settings,
};
