//! Settings and scenario validation command.

use anyhow::Context;
use clap::Args;
use lento_config::{
    EngineSettings, Scenario, ValidationError, lint_scenario, validate_scenario, validate_settings,
};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct CheckArgs {
    /// Files to check
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Treat the files as engine settings instead of scenarios
    #[arg(long)]
    settings: bool,

    /// Fail on lint warnings as well as errors
    #[arg(long)]
    strict: bool,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let mut failed = 0;

    for path in &args.files {
        let problems = if args.settings {
            let settings = EngineSettings::load(path)
                .with_context(|| format!("loading settings {}", path.display()))?;
            report_errors(path, validate_settings(&settings).err())
        } else {
            let scenario = Scenario::load(path)
                .with_context(|| format!("loading scenario {}", path.display()))?;
            let mut problems = report_errors(path, validate_scenario(&scenario).err());
            let warnings = lint_scenario(&scenario);
            for warning in &warnings {
                println!("{}: warning: {warning}", path.display());
            }
            if args.strict {
                problems += warnings.len();
            }
            problems
        };

        if problems == 0 {
            println!("{}: ok", path.display());
        } else {
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} files failed", args.files.len());
    }
    Ok(())
}

/// Print each validation error, returning how many there were.
fn report_errors(path: &Path, error: Option<ValidationError>) -> usize {
    let errors = match error {
        None => return 0,
        Some(ValidationError::Multiple(errors)) => errors,
        Some(e) => vec![e],
    };
    for e in &errors {
        println!("{}: error: {e}", path.display());
    }
    errors.len()
}
