//! Command-line interface for nested cross-validation runs.

use super::config::Config;
use super::run::{run, RunOptions, RunOutcome};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Printed after a completed run.
pub const SUCCESS_MESSAGE: &str = "Success! Tuned parameters, evaluated our models and made predictions";

#[derive(Debug, Parser)]
#[command(
    name = "nestcv",
    about = "Nested cross-validation for TF-IDF + SVM screening models"
)]
pub struct Cli {
    /// Label column prefix (a pattern anchored at the start of the name)
    pub y_prefix: String,

    /// Number of folds for both the outer and inner loop
    pub n_splits: usize,

    /// Quick run on a sample of the data and of the parameter grid
    #[arg(long)]
    pub test: bool,

    /// TOML configuration file. Defaults are used when it does not exist.
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Seed for shuffling and sampling (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Root directory for results (overrides the config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    /// Load the config file and apply command-line overrides.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(&self.config)?;
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(dir) = &self.output_dir {
            config.output.root = dir.clone();
        }
        Ok(config)
    }

    pub fn options(&self) -> RunOptions {
        RunOptions {
            y_prefix: self.y_prefix.clone(),
            n_splits: self.n_splits,
            test: self.test,
        }
    }
}

/// Main entry point for the CLI.
pub fn main_cv(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = cli.config()?;
    match run(&config, &cli.options())? {
        RunOutcome::Completed {
            cv,
            predictions,
            n_predictions,
            ..
        } => {
            tracing::info!(
                best_param_id = cv.best_param_id,
                predictions = %predictions.display(),
                rows = n_predictions,
                "run complete"
            );
            println!("{SUCCESS_MESSAGE}");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::NoTarget { prefix } => {
            eprintln!("No label column matches '{prefix}'");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from(["nestcv", "INCLUDE", "5", "--test", "--seed", "7"]).unwrap();
        assert_eq!(cli.y_prefix, "INCLUDE");
        assert_eq!(cli.n_splits, 5);
        assert!(cli.test);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(cli.output_dir.is_none());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "nestcv",
            "ecosystem",
            "3",
            "--config",
            "/nonexistent/config.toml",
            "--seed",
            "11",
            "--output-dir",
            "out",
        ])
        .unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.output.root, PathBuf::from("out"));
        assert_eq!(cli.options().y_prefix, "ecosystem");
    }

    #[test]
    fn test_missing_split_count_is_rejected() {
        assert!(Cli::try_parse_from(["nestcv", "INCLUDE"]).is_err());
    }
}
