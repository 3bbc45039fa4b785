//! Persisted state file commands.
//!
//! State files hold one little-endian `(in, out, slowness)` double triple
//! per parameter set, the same layout the engine saves and restores.

use anyhow::Context;
use clap::{Args, Subcommand};
use lento_core::{MAX_PARAM_SETS, ParamSet, RECORD_BYTES, read_state, write_state};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct StateArgs {
    #[command(subcommand)]
    command: StateCommand,
}

#[derive(Subcommand)]
enum StateCommand {
    /// Print the sets stored in a state file
    Show {
        /// State file
        file: PathBuf,
    },

    /// Write a state file with default values and optional overrides
    Init {
        /// State file to create
        file: PathBuf,

        /// Number of parameter sets
        #[arg(short, long, default_value = "8")]
        num_sets: usize,

        /// Set values as SET=IN,OUT,SLOWNESS (e.g. "0=0.2,0.2,0.5")
        #[arg(long = "set", value_name = "SPEC")]
        sets: Vec<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: StateArgs) -> anyhow::Result<()> {
    match args.command {
        StateCommand::Show { file } => show_state(&file),
        StateCommand::Init {
            file,
            num_sets,
            sets,
            force,
        } => init_state(&file, num_sets, &sets, force),
    }
}

fn show_state(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (sets, trailing) = decode(&bytes)?;

    println!("{}: {} sets", path.display(), sets.len());
    println!("  {:4}  {:>10}  {:>10}  {:>10}", "Set", "In", "Out", "Slowness");
    for (i, set) in sets.iter().enumerate() {
        println!(
            "  {:4}  {:>10.6}  {:>10.6}  {:>10.6}",
            i,
            set.input(),
            set.output(),
            set.slowness()
        );
    }
    if trailing > 0 {
        tracing::warn!("{}: ignoring {trailing} trailing bytes", path.display());
    }
    Ok(())
}

/// Decode every complete record, returning the sets and the number of
/// bytes left over.
fn decode(bytes: &[u8]) -> anyhow::Result<(Vec<ParamSet>, usize)> {
    let records = (bytes.len() / RECORD_BYTES).min(MAX_PARAM_SETS);
    let mut sets = vec![ParamSet::default(); records];
    let read = read_state(&mut sets, &mut &bytes[..])?;
    sets.truncate(read);
    Ok((sets, bytes.len() - read * RECORD_BYTES))
}

fn init_state(path: &Path, num_sets: usize, specs: &[String], force: bool) -> anyhow::Result<()> {
    if num_sets == 0 || num_sets > MAX_PARAM_SETS {
        anyhow::bail!("--num-sets must be between 1 and {MAX_PARAM_SETS}");
    }
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let mut sets = vec![ParamSet::default(); num_sets];
    for spec in specs {
        let (index, set) = parse_set_spec(spec)?;
        let slot = sets
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("set {index} out of range (num_sets = {num_sets})"))?;
        *slot = set;
    }

    let mut bytes = Vec::with_capacity(num_sets * RECORD_BYTES);
    write_state(&sets, &mut bytes)?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {} sets to {}", num_sets, path.display());
    Ok(())
}

/// Parse `SET=IN,OUT,SLOWNESS`.
fn parse_set_spec(spec: &str) -> anyhow::Result<(usize, ParamSet)> {
    let (index, values) = spec
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected SET=IN,OUT,SLOWNESS, got '{spec}'"))?;
    let index: usize = index
        .trim()
        .parse()
        .with_context(|| format!("invalid set index in '{spec}'"))?;

    let values: Vec<f64> = values
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid value in '{spec}'"))?;
    let [input, output, slowness] = values[..] else {
        anyhow::bail!("expected three values in '{spec}'");
    };
    Ok((index, ParamSet::new(input, output, slowness)))
}
