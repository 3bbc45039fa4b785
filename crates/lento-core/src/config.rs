//! Construction-time engine configuration.

use crate::error::EngineError;
use crate::param_set::ParamOffset;

/// Upper bound on parameter sets per instance.
///
/// Per-block scratch slots are fixed-size arrays of this length, so the
/// block driver never allocates.
pub const MAX_PARAM_SETS: usize = 16;

/// Highest valid 7-bit controller number plus one.
pub const CONTROLLER_LIMIT: u32 = 128;

/// Explicit engine constants.
///
/// # Example
///
/// ```rust
/// use lento_core::SmootherConfig;
///
/// let config = SmootherConfig {
///     half_life_secs: 1.0,
///     ..SmootherConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.controller_for(2), 92);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmootherConfig {
    /// Number of independent parameter sets (1..=[`MAX_PARAM_SETS`]).
    pub num_sets: usize,
    /// Seconds the output needs to cross the full range at slowness 0.5.
    pub half_life_secs: f64,
    /// Controller number of parameter set 0 on the step event stream.
    pub controller_base: u8,
    /// Values closer than this are treated as equal.
    pub epsilon: f64,
    /// Capacity of each output point queue.
    pub max_points_per_block: usize,
    /// Capacity of the step event buffer.
    pub max_events_per_block: usize,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            num_sets: 8,
            half_life_secs: 2.0,
            controller_base: 90,
            epsilon: 1e-5,
            max_points_per_block: 512,
            max_events_per_block: 4096,
        }
    }
}

impl SmootherConfig {
    /// Check every invariant the engine relies on.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.num_sets == 0 || self.num_sets > MAX_PARAM_SETS {
            return Err(EngineError::InvalidConfig(
                "num_sets must be between 1 and MAX_PARAM_SETS",
            ));
        }
        if !(self.half_life_secs.is_finite() && self.half_life_secs > 0.0) {
            return Err(EngineError::InvalidConfig(
                "half_life_secs must be finite and positive",
            ));
        }
        if u32::from(self.controller_base) + self.num_sets as u32 > CONTROLLER_LIMIT {
            return Err(EngineError::InvalidConfig(
                "not enough controller numbers for every parameter set",
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(EngineError::InvalidConfig(
                "epsilon must be finite and non-negative",
            ));
        }
        if self.max_points_per_block == 0 {
            return Err(EngineError::InvalidConfig(
                "max_points_per_block must be positive",
            ));
        }
        Ok(())
    }

    /// Number of host parameters (three per set).
    pub fn param_count(&self) -> usize {
        self.num_sets * ParamOffset::COUNT as usize
    }

    /// Controller number carrying step events for `set`.
    pub fn controller_for(&self, set: usize) -> u8 {
        self.controller_base + set as u8
    }

    /// Parameter set addressed by an incoming controller number, if any.
    pub fn set_for_controller(&self, controller: u8) -> Option<usize> {
        let set = controller.checked_sub(self.controller_base)? as usize;
        (set < self.num_sets).then_some(set)
    }
}
