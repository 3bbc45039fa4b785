//! Scenario rendering command.

use anyhow::Context;
use clap::Args;
use lento_config::{BlockReport, Scenario, ScenarioRunner, lint_scenario, validate_scenario};
use lento_core::Smoother;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RenderArgs {
    /// Scenario file (TOML)
    scenario: PathBuf,

    /// Write every block report as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Start from a persisted state file instead of the scenario's initial states
    #[arg(long, value_name = "PATH")]
    state_in: Option<PathBuf>,

    /// Save the final state to this file
    #[arg(long, value_name = "PATH")]
    state_out: Option<PathBuf>,

    /// Print every step event
    #[arg(long)]
    events: bool,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;

    for warning in lint_scenario(&scenario) {
        tracing::warn!("{warning}");
    }

    let mut runner = match &args.state_in {
        Some(path) => {
            validate_scenario(&scenario)?;
            let config = scenario.effective_settings().to_smoother_config();
            let mut smoother = Smoother::new(config)?;
            load_state(&mut smoother, path)?;
            ScenarioRunner::from_smoother(smoother, scenario.sample_rate)
        }
        None => ScenarioRunner::new(&scenario)?,
    };

    println!(
        "{}: {} blocks, {} samples at {} Hz",
        scenario.name,
        scenario.blocks.len(),
        scenario.total_samples(),
        scenario.sample_rate
    );

    let mut reports = Vec::with_capacity(scenario.blocks.len());
    for block in &scenario.blocks {
        let report = runner
            .run_block(block)
            .with_context(|| format!("block {} failed", reports.len()))?;
        print_report(&report, args.events);
        reports.push(report);
    }

    println!();
    println!("  {:8}  {:>10}  {:>10}  {:>10}", "Set", "In", "Out", "Slowness");
    for (i, set) in runner.smoother().sets().iter().enumerate() {
        println!(
            "  {:8}  {:>10.6}  {:>10.6}  {:>10.6}",
            i + 1,
            set.input(),
            set.output(),
            set.slowness()
        );
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote block reports");
    }

    if let Some(path) = &args.state_out {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        runner.smoother().save_state(&mut writer)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), "saved state");
    }

    Ok(())
}

pub(crate) fn load_state(smoother: &mut Smoother, path: &Path) -> anyhow::Result<usize> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let read = smoother.load_state(&mut BufReader::new(file))?;
    let expected = smoother.config().num_sets;
    if read < expected {
        tracing::warn!("{}: restored {read} of {expected} sets", path.display());
    } else {
        tracing::debug!("{}: restored {read} sets", path.display());
    }
    Ok(read)
}

fn print_report(report: &BlockReport, events: bool) {
    let points: usize = report.curves.iter().map(|c| c.points.len()).sum();
    let kind = if report.samples == 0 { " (flush)" } else { "" };
    println!(
        "block {:>4} @{:>8}: {:>5} samples{kind}, {points} points, {} events",
        report.index,
        report.start_sample,
        report.samples,
        report.events.len()
    );
    if report.dropped_events > 0 {
        tracing::warn!(
            block = report.index,
            dropped = report.dropped_events,
            "event buffer overflowed"
        );
    }
    if report.dropped_points > 0 {
        tracing::warn!(
            block = report.index,
            dropped = report.dropped_points,
            "output queue overflowed"
        );
    }
    if events {
        for event in &report.events {
            println!(
                "    {:>6}  cc{:<3}  {:>3}",
                event.offset, event.controller, event.level
            );
        }
    }
}
