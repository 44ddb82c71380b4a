//! nestcv - nested cross-validation for abstract screening
//!
//! Usage:
//!   nestcv INCLUDE 5
//!   nestcv "ecosystem\." 3 --test --seed 42 --output-dir results

use clap::Parser;
use nestcv::cv::cli::{main_cv, Cli};
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    main_cv(Cli::parse())
}
