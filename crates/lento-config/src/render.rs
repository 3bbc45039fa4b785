//! Offline scenario rendering.
//!
//! [`ScenarioRunner`] plays a [`Scenario`] through a [`Smoother`] the way a
//! host would, block by block, and records what each block produced.
//!
//! # Example
//!
//! ```rust
//! use lento_config::{BlockSpec, CurveKind, Scenario, SetState, render_scenario};
//!
//! let scenario = Scenario::new("jump")
//!     .with_initial(SetState { set: 0, input: 0.0, output: 0.0, slowness: 0.0 })
//!     .with_block(BlockSpec::new(100).with_curve(0, CurveKind::In, &[(0, 1.0)]));
//!
//! let reports = render_scenario(&scenario).unwrap();
//! assert_eq!(reports[0].sets[0].output, 1.0);
//! ```

use lento_core::{
    AutomationPoint, BlockInput, BlockOutput, EventBuffer, OutputChanges, ParamQueue, Smoother,
    StepEvent,
};
use serde::Serialize;

use crate::error::ConfigError;
use crate::scenario::{BlockSpec, CurveSpec, EventSpec, Scenario, SetState};
use crate::validation::validate_scenario;

/// Points written to one output parameter during a block.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurveReport {
    /// Parameter name, e.g. `out1`.
    pub param: String,
    /// Written points as `(offset, value)`.
    pub points: Vec<(i32, f64)>,
}

/// Everything one block produced.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BlockReport {
    /// Block index within the scenario.
    pub index: usize,
    /// Sample position of the block's first sample.
    pub start_sample: u64,
    /// Block length.
    pub samples: usize,
    /// Output curves that received points.
    pub curves: Vec<CurveReport>,
    /// Produced step events.
    pub events: Vec<EventSpec>,
    /// Events lost to a full event buffer.
    pub dropped_events: usize,
    /// Output points lost to full output queues.
    pub dropped_points: usize,
    /// Parameter set values after the block.
    pub sets: Vec<SetState>,
}

/// Drives a [`Smoother`] with scripted blocks.
pub struct ScenarioRunner {
    smoother: Smoother,
    changes: OutputChanges,
    events: EventBuffer,
    sample_rate: f64,
    position: u64,
    blocks_run: usize,
}

impl ScenarioRunner {
    /// Validate `scenario` and prepare a started processor with its
    /// initial states applied.
    pub fn new(scenario: &Scenario) -> Result<Self, ConfigError> {
        validate_scenario(scenario)?;
        let config = scenario.effective_settings().to_smoother_config();
        let mut smoother = Smoother::new(config)?;
        for state in &scenario.initial {
            if let Some(slot) = smoother.sets_mut().get_mut(state.set) {
                *slot = state.to_param_set();
            }
        }
        Ok(Self::from_smoother(smoother, scenario.sample_rate))
    }

    /// Run blocks on an existing processor, e.g. one restored from state.
    ///
    /// The processor is activated and started, which arms its initial flush.
    pub fn from_smoother(mut smoother: Smoother, sample_rate: f64) -> Self {
        let config = *smoother.config();
        smoother.set_active(true);
        smoother.set_processing(true);
        Self {
            smoother,
            changes: OutputChanges::new(&config),
            events: EventBuffer::with_capacity(config.max_events_per_block),
            sample_rate,
            position: 0,
            blocks_run: 0,
        }
    }

    /// The driven processor.
    pub fn smoother(&self) -> &Smoother {
        &self.smoother
    }

    /// Consume the runner, returning the processor.
    pub fn into_smoother(self) -> Smoother {
        self.smoother
    }

    /// Process one block.
    ///
    /// A failed block leaves the processor state as it was and does not
    /// advance the sample position.
    pub fn run_block(&mut self, block: &BlockSpec) -> Result<BlockReport, ConfigError> {
        let points: Vec<Vec<AutomationPoint>> = block
            .curves
            .iter()
            .map(CurveSpec::automation_points)
            .collect();
        let queues: Vec<ParamQueue<'_>> = block
            .curves
            .iter()
            .zip(&points)
            .map(|(curve, points)| ParamQueue::new(curve.param_id(), points))
            .collect();
        let incoming: Vec<StepEvent> = block.events.iter().map(|&e| e.into()).collect();

        self.changes.clear();
        self.events.clear();
        self.smoother.process(
            &BlockInput::new(self.sample_rate, block.samples)
                .with_changes(&queues)
                .with_events(&incoming),
            &mut BlockOutput::new()
                .with_changes(&mut self.changes)
                .with_events(&mut self.events),
        )?;

        let report = BlockReport {
            index: self.blocks_run,
            start_sample: self.position,
            samples: block.samples,
            curves: self
                .changes
                .changed()
                .map(|(id, points)| CurveReport {
                    param: id.to_string(),
                    points: points.iter().map(|p| (p.offset, p.value)).collect(),
                })
                .collect(),
            events: self.events.events().iter().map(|&e| e.into()).collect(),
            dropped_events: self.events.dropped(),
            dropped_points: self.smoother.dropped_points(),
            sets: self
                .smoother
                .sets()
                .iter()
                .enumerate()
                .map(|(i, set)| SetState::from_param_set(i, set))
                .collect(),
        };
        self.blocks_run += 1;
        self.position += block.samples as u64;
        Ok(report)
    }

    /// Process every block of `scenario` in order.
    pub fn run(&mut self, scenario: &Scenario) -> Result<Vec<BlockReport>, ConfigError> {
        scenario
            .blocks
            .iter()
            .map(|block| self.run_block(block))
            .collect()
    }
}

/// Validate and render a whole scenario from its initial state.
pub fn render_scenario(scenario: &Scenario) -> Result<Vec<BlockReport>, ConfigError> {
    ScenarioRunner::new(scenario)?.run(scenario)
}
