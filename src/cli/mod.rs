use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "ctgov-etl")]
#[command(version)]
#[command(about = "Monthly ClinicalTrials.gov extract, transform and publish pipeline")]
#[command(long_about = "Runs the clinical trials ETL on a monthly schedule or on demand, then commits \
                       the refreshed data files and pushes them to the repository. Start with \
                       'ctgov-etl run' for a one-off refresh.")]
pub struct Cli {
    /// Configuration file (defaults to ./ctgov-etl.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerArg {
    Manual,
    Scheduled,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline once: provision, ETL, commit and push
    Run {
        /// How the run is labelled in logs
        #[arg(long, value_enum, default_value = "manual")]
        trigger: TriggerArg,
        /// Commit the refreshed data but do not push it
        #[arg(long, help = "Stop after committing; leave the commit local")]
        no_push: bool,
        /// Skip the runtime check and dependency installation
        #[arg(long, help = "Assume the environment is already provisioned")]
        skip_provision: bool,
    },
    /// Wait for each monthly slot and run the pipeline
    Schedule {
        /// Exit after the first scheduled run
        #[arg(long, help = "Run only the next scheduled slot, then exit")]
        once: bool,
    },
    /// Show when the next scheduled run starts
    Next,
    /// Run only the ETL stage and check its outputs
    Etl,
    /// Rebuild changes.csv from the snapshot history
    Changes {
        /// Number of most recent snapshots compared per study
        #[arg(long, help = "Snapshots per study to compare (default from config)")]
        last: Option<usize>,
    },
    /// Print headline metrics of the current snapshot
    Summary,
}
