//! Slope model inspection command.

use clap::Args;
use lento_core::{max_slope, slowness_for_traverse_time, traverse_time_secs};
use serde::Serialize;

#[derive(Args)]
pub struct SlopeArgs {
    /// Slowness values to evaluate (default: 0.0, 0.1, ..., 1.0)
    #[arg(short, long, value_name = "S")]
    slowness: Vec<f64>,

    /// Find the slowness for a full-range glide of this many seconds
    #[arg(long, value_name = "SECS", conflicts_with = "slowness")]
    glide: Option<f64>,

    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: f64,

    /// Seconds to cross the full range at slowness 0.5
    #[arg(long, default_value = "2.0")]
    half_life: f64,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct SlopeRow {
    slowness: f64,
    max_slope_per_sample: f64,
    traverse_secs: f64,
    traverse_samples: f64,
}

fn slope_row(slowness: f64, sample_rate: f64, half_life: f64) -> anyhow::Result<SlopeRow> {
    let rate = max_slope(slowness, sample_rate, half_life)?;
    let traverse_secs = traverse_time_secs(slowness, half_life);
    Ok(SlopeRow {
        slowness,
        max_slope_per_sample: rate,
        traverse_secs,
        traverse_samples: traverse_secs * sample_rate,
    })
}

pub fn run(args: SlopeArgs) -> anyhow::Result<()> {
    if !(args.half_life.is_finite() && args.half_life > 0.0) {
        anyhow::bail!("--half-life must be a positive number of seconds");
    }

    let values: Vec<f64> = if let Some(secs) = args.glide {
        vec![slowness_for_traverse_time(secs, args.half_life)]
    } else if args.slowness.is_empty() {
        (0..=10).map(|i| f64::from(i) / 10.0).collect()
    } else {
        args.slowness.clone()
    };

    let rows = values
        .iter()
        .map(|&s| slope_row(s.clamp(0.0, 1.0), args.sample_rate, args.half_life))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "  {:>9}  {:>14}  {:>12}  {:>14}",
        "Slowness", "Max/sample", "Traverse s", "Traverse smp"
    );
    for row in &rows {
        println!(
            "  {:>9.4}  {:>14.6e}  {:>12.4}  {:>14.1}",
            row.slowness, row.max_slope_per_sample, row.traverse_secs, row.traverse_samples
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_slowness_crosses_in_half_life() {
        let row = slope_row(0.5, 48000.0, 2.0).unwrap();
        assert!((row.max_slope_per_sample - 1.0 / 96000.0).abs() < 1e-15);
        assert_eq!(row.traverse_secs, 2.0);
        assert_eq!(row.traverse_samples, 96000.0);
    }

    #[test]
    fn bad_sample_rate_is_an_error() {
        assert!(slope_row(0.5, 0.0, 2.0).is_err());
    }

    #[test]
    fn frozen_row_never_arrives() {
        let row = slope_row(1.0, 48000.0, 2.0).unwrap();
        assert_eq!(row.max_slope_per_sample, 0.0);
        assert!(row.traverse_secs.is_infinite());
    }
}
