//! Settings and scenario validation.
//!
//! [`validate_settings`] and [`validate_scenario`] reject documents the
//! engine would refuse or that address parameters which do not exist.
//! [`lint_scenario`] reports curves the engine accepts but silently repairs,
//! such as unsorted or out-of-block offsets, and curves dense enough to
//! overflow an output queue.
//!
//! # Example
//!
//! ```rust
//! use lento_config::{EngineSettings, ValidationError, validate_settings};
//!
//! let settings = EngineSettings {
//!     num_sets: 40,
//!     ..EngineSettings::default()
//! };
//! assert!(matches!(
//!     validate_settings(&settings),
//!     Err(ValidationError::Multiple(_))
//! ));
//! ```

use lento_core::{CONTROLLER_LIMIT, MAX_LEVEL, MAX_PARAM_SETS};
use thiserror::Error;

use crate::scenario::{CurveSpec, Scenario};
use crate::settings::EngineSettings;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Set count outside `1..=MAX_PARAM_SETS`.
    #[error("num_sets {0} out of range [1, {max}]", max = MAX_PARAM_SETS)]
    NumSets(usize),

    /// Half-life is zero, negative or not finite.
    #[error("half_life_secs must be finite and positive, got {0}")]
    HalfLife(f64),

    /// Epsilon is negative or not finite.
    #[error("epsilon must be finite and non-negative, got {0}")]
    Epsilon(f64),

    /// Output queues could not hold a single point.
    #[error("max_points_per_block must be positive")]
    PointCapacity,

    /// Some parameter sets would map past controller 127.
    #[error("controllers {base}..{} exceed the 7-bit range", controller_end(.base, .num_sets))]
    ControllerOverflow {
        /// Controller number of set 0.
        base: u8,
        /// Number of sets.
        num_sets: usize,
    },

    /// Sample rate is zero, negative or not finite.
    #[error("sample rate must be finite and positive, got {0}")]
    SampleRate(f64),

    /// A curve or initial state addresses a set that does not exist.
    #[error("{location}: set {set} out of range (num_sets = {num_sets})")]
    SetOutOfRange {
        /// Where the reference was found.
        location: String,
        /// Referenced set.
        set: usize,
        /// Configured set count.
        num_sets: usize,
    },

    /// An incoming event level exceeds the 7-bit range.
    #[error("{location}: level {level} exceeds {max}", max = MAX_LEVEL)]
    EventLevel {
        /// Where the event was found.
        location: String,
        /// Offending level.
        level: u8,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

fn controller_end(base: &u8, num_sets: &usize) -> usize {
    usize::from(*base) + *num_sets
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A curve the engine will accept after repairing it.
#[derive(Debug, Clone, PartialEq)]
pub enum LintWarning {
    /// Offsets decrease somewhere; later points are skipped.
    UnsortedOffsets {
        /// Block index.
        block: usize,
        /// Parameter name, e.g. `in1`.
        param: String,
        /// Index of the first point that goes backwards.
        index: usize,
    },
    /// An offset lies outside the block and will be clamped.
    OffsetOutsideBlock {
        /// Block index.
        block: usize,
        /// Parameter name.
        param: String,
        /// Offending offset.
        offset: i32,
        /// Block length.
        samples: usize,
    },
    /// A value lies outside `[0, 1]` and will be clamped.
    ValueOutOfRange {
        /// Block index.
        block: usize,
        /// Parameter name.
        param: String,
        /// Offending value.
        value: f64,
    },
    /// The same parameter is supplied twice in one block; the last one wins.
    DuplicateCurve {
        /// Block index.
        block: usize,
        /// Parameter name.
        param: String,
    },
    /// A curve has more points than an output queue holds. The engine keeps
    /// smoothing but output points past the capacity are dropped.
    DenseCurve {
        /// Block index.
        block: usize,
        /// Parameter name.
        param: String,
        /// Number of points.
        count: usize,
        /// Output queue capacity.
        capacity: usize,
    },
    /// An incoming event addresses no parameter set and will be ignored.
    UnroutedEvent {
        /// Block index.
        block: usize,
        /// Controller number.
        controller: u8,
    },
}

impl std::fmt::Display for LintWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LintWarning::UnsortedOffsets { block, param, index } => {
                write!(f, "block {block}, {param}: offsets decrease at point {index}")
            }
            LintWarning::OffsetOutsideBlock {
                block,
                param,
                offset,
                samples,
            } => write!(
                f,
                "block {block}, {param}: offset {offset} outside block of {samples} samples"
            ),
            LintWarning::ValueOutOfRange {
                block,
                param,
                value,
            } => write!(f, "block {block}, {param}: value {value} outside [0, 1]"),
            LintWarning::DuplicateCurve { block, param } => {
                write!(f, "block {block}: {param} supplied more than once")
            }
            LintWarning::DenseCurve {
                block,
                param,
                count,
                capacity,
            } => write!(
                f,
                "block {block}, {param}: {count} points may overflow an output queue of {capacity}"
            ),
            LintWarning::UnroutedEvent { block, controller } => {
                write!(f, "block {block}: controller {controller} addresses no set")
            }
        }
    }
}

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

fn settings_errors(settings: &EngineSettings, errors: &mut Vec<ValidationError>) {
    if settings.num_sets == 0 || settings.num_sets > MAX_PARAM_SETS {
        errors.push(ValidationError::NumSets(settings.num_sets));
    }
    if !(settings.half_life_secs.is_finite() && settings.half_life_secs > 0.0) {
        errors.push(ValidationError::HalfLife(settings.half_life_secs));
    }
    if !(settings.epsilon.is_finite() && settings.epsilon >= 0.0) {
        errors.push(ValidationError::Epsilon(settings.epsilon));
    }
    if settings.max_points_per_block == 0 {
        errors.push(ValidationError::PointCapacity);
    }
    if settings.controller_base as usize + settings.num_sets > CONTROLLER_LIMIT as usize {
        errors.push(ValidationError::ControllerOverflow {
            base: settings.controller_base,
            num_sets: settings.num_sets,
        });
    }
}

/// Validate engine settings.
///
/// Accepts exactly the settings [`lento_core::SmootherConfig::validate`]
/// accepts, but reports every problem at once.
pub fn validate_settings(settings: &EngineSettings) -> ValidationResult<()> {
    let mut errors = Vec::new();
    settings_errors(settings, &mut errors);
    collect(errors)
}

/// Validate a scenario: its settings, sample rate and every set reference.
pub fn validate_scenario(scenario: &Scenario) -> ValidationResult<()> {
    let settings = scenario.effective_settings();
    let num_sets = settings.num_sets;
    let mut errors = Vec::new();
    settings_errors(&settings, &mut errors);

    if !(scenario.sample_rate.is_finite() && scenario.sample_rate > 0.0) {
        errors.push(ValidationError::SampleRate(scenario.sample_rate));
    }

    for (i, state) in scenario.initial.iter().enumerate() {
        if state.set >= num_sets {
            errors.push(ValidationError::SetOutOfRange {
                location: format!("initial state {i}"),
                set: state.set,
                num_sets,
            });
        }
    }

    for (b, block) in scenario.blocks.iter().enumerate() {
        for curve in &block.curves {
            if curve.set >= num_sets {
                errors.push(ValidationError::SetOutOfRange {
                    location: format!("block {b}, {} curve", curve_name(curve)),
                    set: curve.set,
                    num_sets,
                });
            }
        }
        for event in &block.events {
            if event.level > MAX_LEVEL {
                errors.push(ValidationError::EventLevel {
                    location: format!("block {b}, controller {}", event.controller),
                    level: event.level,
                });
            }
        }
    }

    collect(errors)
}

fn curve_name(curve: &CurveSpec) -> &'static str {
    curve.kind.offset().name()
}

/// Report repairs the engine would make to a valid scenario.
pub fn lint_scenario(scenario: &Scenario) -> Vec<LintWarning> {
    let settings = scenario.effective_settings();
    let config = settings.to_smoother_config();
    let mut warnings = Vec::new();

    for (b, block) in scenario.blocks.iter().enumerate() {
        let samples = i64::try_from(block.samples).unwrap_or(i64::MAX);
        let mut seen = Vec::new();

        for curve in &block.curves {
            let param = curve.param_id().to_string();
            if seen.contains(&curve.param_id()) {
                warnings.push(LintWarning::DuplicateCurve {
                    block: b,
                    param: param.clone(),
                });
            }
            seen.push(curve.param_id());

            if let Some(index) = curve.points.windows(2).position(|w| w[1].0 < w[0].0) {
                warnings.push(LintWarning::UnsortedOffsets {
                    block: b,
                    param: param.clone(),
                    index: index + 1,
                });
            }
            if let Some(&(offset, _)) = curve
                .points
                .iter()
                .find(|(offset, _)| *offset < 0 || i64::from(*offset) >= samples.max(1))
            {
                warnings.push(LintWarning::OffsetOutsideBlock {
                    block: b,
                    param: param.clone(),
                    offset,
                    samples: block.samples,
                });
            }
            if let Some(&(_, value)) = curve
                .points
                .iter()
                .find(|(_, value)| !(0.0..=1.0).contains(value))
            {
                warnings.push(LintWarning::ValueOutOfRange {
                    block: b,
                    param: param.clone(),
                    value,
                });
            }
            if curve.points.len() > config.max_points_per_block {
                warnings.push(LintWarning::DenseCurve {
                    block: b,
                    param,
                    count: curve.points.len(),
                    capacity: config.max_points_per_block,
                });
            }
        }

        for event in &block.events {
            if config.set_for_controller(event.controller).is_none() {
                warnings.push(LintWarning::UnroutedEvent {
                    block: b,
                    controller: event.controller,
                });
            }
        }
    }

    warnings
}
