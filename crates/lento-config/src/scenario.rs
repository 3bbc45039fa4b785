//! Scenario file format: a scripted sequence of host blocks.

use lento_core::{AutomationPoint, DEFAULT_SLOWNESS, ParamId, ParamOffset, ParamSet, StepEvent};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::settings::EngineSettings;

/// A sequence of blocks to run through the engine offline.
///
/// # TOML Format
///
/// ```toml
/// name = "slow glide"
/// sample_rate = 48000
///
/// [settings]
/// num_sets = 2
///
/// [[initial]]
/// set = 0
/// slowness = 0.3
///
/// [[blocks]]
/// samples = 256
///
/// [[blocks.curves]]
/// set = 0
/// kind = "in"
/// points = [[0, 1.0]]
///
/// [[blocks.events]]
/// offset = 10
/// controller = 91
/// level = 64
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    /// Name of the scenario.
    pub name: String,

    /// Sample rate of every block (defaults to 48000).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    /// Engine settings; defaults apply when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<EngineSettings>,

    /// Starting values of individual sets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial: Vec<SetState>,

    /// Blocks in processing order.
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
}

fn default_sample_rate() -> f64 {
    48000.0
}

fn default_slowness() -> f64 {
    DEFAULT_SLOWNESS
}

/// Values of one parameter set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SetState {
    /// Parameter set index.
    pub set: usize,
    /// Target value.
    #[serde(default)]
    pub input: f64,
    /// Output value.
    #[serde(default)]
    pub output: f64,
    /// Smoothing slowness.
    #[serde(default = "default_slowness")]
    pub slowness: f64,
}

impl SetState {
    /// Snapshot of `params` for set `set`.
    pub fn from_param_set(set: usize, params: &ParamSet) -> Self {
        Self {
            set,
            input: params.input(),
            output: params.output(),
            slowness: params.slowness(),
        }
    }

    /// Engine representation, with values constrained to `[0, 1]`.
    pub fn to_param_set(&self) -> ParamSet {
        ParamSet::new(self.input, self.output, self.slowness)
    }
}

/// One host block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BlockSpec {
    /// Block length; 0 requests a flush-only block.
    pub samples: usize,

    /// Curves supplied with the block.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub curves: Vec<CurveSpec>,

    /// Incoming step events.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventSpec>,
}

/// Which parameter of a set a curve drives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    /// Target curve.
    In,
    /// Output override curve.
    Out,
    /// Smoothing speed curve.
    Slowness,
}

impl CurveKind {
    /// Parameter offset within a set.
    pub fn offset(self) -> ParamOffset {
        match self {
            CurveKind::In => ParamOffset::In,
            CurveKind::Out => ParamOffset::Out,
            CurveKind::Slowness => ParamOffset::Slowness,
        }
    }
}

/// One supplied curve, `points = [[offset, value], ...]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurveSpec {
    /// Parameter set index.
    pub set: usize,
    /// Driven parameter.
    pub kind: CurveKind,
    /// Breakpoints in host order.
    #[serde(default)]
    pub points: Vec<(i32, f64)>,
}

impl CurveSpec {
    /// Parameter id of this curve.
    pub fn param_id(&self) -> ParamId {
        ParamId::new(self.set, self.kind.offset())
    }

    /// Points in engine form.
    pub fn automation_points(&self) -> Vec<AutomationPoint> {
        self.points
            .iter()
            .map(|&(offset, value)| AutomationPoint::new(offset, value))
            .collect()
    }
}

/// One step event, incoming or produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventSpec {
    /// Sample offset inside the block.
    pub offset: i32,
    /// Controller number.
    pub controller: u8,
    /// Level in `[0, 127]`.
    pub level: u8,
}

impl From<StepEvent> for EventSpec {
    fn from(event: StepEvent) -> Self {
        Self {
            offset: event.offset,
            controller: event.controller,
            level: event.level,
        }
    }
}

impl From<EventSpec> for StepEvent {
    fn from(event: EventSpec) -> Self {
        StepEvent::new(event.offset, event.controller, event.level)
    }
}

impl Scenario {
    /// Create an empty scenario at 48 kHz.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sample_rate: default_sample_rate(),
            settings: None,
            initial: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the engine settings.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Add a starting state.
    pub fn with_initial(mut self, state: SetState) -> Self {
        self.initial.push(state);
        self
    }

    /// Append a block.
    pub fn with_block(mut self, block: BlockSpec) -> Self {
        self.blocks.push(block);
        self
    }

    /// Load a scenario from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a scenario from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the scenario to a TOML file, creating the parent directory.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the scenario to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Settings in effect, falling back to the defaults.
    pub fn effective_settings(&self) -> EngineSettings {
        self.settings.clone().unwrap_or_default()
    }

    /// Total number of samples across all blocks.
    pub fn total_samples(&self) -> u64 {
        self.blocks.iter().map(|b| b.samples as u64).sum()
    }
}

impl BlockSpec {
    /// Block of `samples` samples without curves or events.
    pub fn new(samples: usize) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }

    /// Add a curve.
    pub fn with_curve(mut self, set: usize, kind: CurveKind, points: &[(i32, f64)]) -> Self {
        self.curves.push(CurveSpec {
            set,
            kind,
            points: points.to_vec(),
        });
        self
    }

    /// Add an incoming step event.
    pub fn with_event(mut self, offset: i32, controller: u8, level: u8) -> Self {
        self.events.push(EventSpec {
            offset,
            controller,
            level,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
name = "slow glide"
sample_rate = 44100

[settings]
num_sets = 2

[[initial]]
set = 1
output = 0.25

[[blocks]]
samples = 256

[[blocks.curves]]
set = 0
kind = "in"
points = [[0, 1.0], [128, 0]]

[[blocks.events]]
offset = 10
controller = 91
level = 64

[[blocks]]
samples = 0
"#;

    #[test]
    fn parses_documented_format() {
        let scenario = Scenario::from_toml(EXAMPLE).unwrap();
        assert_eq!(scenario.name, "slow glide");
        assert_eq!(scenario.sample_rate, 44100.0);
        assert_eq!(scenario.effective_settings().num_sets, 2);
        assert_eq!(
            scenario.initial,
            vec![SetState {
                set: 1,
                input: 0.0,
                output: 0.25,
                slowness: 0.5
            }]
        );
        assert_eq!(scenario.blocks.len(), 2);

        let curve = &scenario.blocks[0].curves[0];
        assert_eq!(curve.kind, CurveKind::In);
        assert_eq!(curve.points, vec![(0, 1.0), (128, 0.0)]);
        assert_eq!(curve.param_id(), ParamId::new(0, ParamOffset::In));
        assert_eq!(scenario.blocks[0].events[0].controller, 91);
        assert_eq!(scenario.blocks[1].samples, 0);
        assert_eq!(scenario.total_samples(), 256);
    }

    #[test]
    fn minimal_scenario_uses_defaults() {
        let scenario = Scenario::from_toml("name = \"empty\"").unwrap();
        assert_eq!(scenario.sample_rate, 48000.0);
        assert!(scenario.settings.is_none());
        assert!(scenario.blocks.is_empty());
        assert_eq!(scenario.effective_settings(), EngineSettings::default());
    }

    #[test]
    fn unknown_curve_kind_is_rejected() {
        let text = "name = \"x\"\n[[blocks]]\nsamples = 4\n[[blocks.curves]]\nset = 0\nkind = \"gain\"\npoints = []\n";
        assert!(matches!(
            Scenario::from_toml(text),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn builder_round_trips_through_toml() {
        let scenario = Scenario::new("built")
            .with_sample_rate(96000.0)
            .with_initial(SetState::from_param_set(0, &ParamSet::new(0.2, 0.2, 0.0)))
            .with_block(
                BlockSpec::new(64)
                    .with_curve(0, CurveKind::Slowness, &[(0, 0.25)])
                    .with_event(3, 90, 127),
            );
        let text = scenario.to_toml().unwrap();
        assert_eq!(Scenario::from_toml(&text).unwrap(), scenario);
    }

    #[test]
    fn event_conversion_clamps_level() {
        let event: StepEvent = EventSpec {
            offset: 0,
            controller: 90,
            level: 200,
        }
        .into();
        assert_eq!(event.level, 127);
        assert_eq!(EventSpec::from(event).level, 127);
    }
}
