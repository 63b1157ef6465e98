use anyhow::Result;
use clap::Parser;

use ctgov_etl::cli::commands::{
    changes::ChangesCommand, etl::EtlCommand, next::NextCommand, run::RunCommand,
    schedule::ScheduleCommand, show_how_to_get_started, summary::SummaryCommand,
};
use ctgov_etl::cli::{Cli, Commands};
use ctgov_etl::{init_telemetry, PipelineConfig, PipelineError};

fn main() {
    if let Err(e) = run() {
        let code = e
            .downcast_ref::<PipelineError>()
            .map(PipelineError::exit_code)
            .unwrap_or(1);
        eprintln!("Error: {e:#}");
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    PipelineConfig::load_env_file()?;
    let config = PipelineConfig::load(cli.config.as_deref())
        .map_err(|e| PipelineError::Config(format!("{e:#}")))?;

    if let Err(e) = init_telemetry(&config.observability) {
        eprintln!("Warning: Failed to initialize telemetry: {e}");
    }

    match cli.command {
        None => {
            show_how_to_get_started();
            Ok(())
        }
        Some(Commands::Run {
            trigger,
            no_push,
            skip_provision,
        }) => tokio::runtime::Runtime::new()?.block_on(async {
            RunCommand::new(config)
                .with_trigger(trigger)
                .with_no_push(no_push)
                .with_skip_provision(skip_provision)
                .execute()
                .await
        }),
        Some(Commands::Schedule { once }) => tokio::runtime::Runtime::new()?
            .block_on(async { ScheduleCommand::new(config).with_once(once).execute().await }),
        Some(Commands::Next) => {
            tokio::runtime::Runtime::new()?.block_on(async { NextCommand::new(config).execute().await })
        }
        Some(Commands::Etl) => {
            tokio::runtime::Runtime::new()?.block_on(async { EtlCommand::new(config).execute().await })
        }
        Some(Commands::Changes { last }) => tokio::runtime::Runtime::new()?
            .block_on(async { ChangesCommand::new(config).with_last(last).execute().await }),
        Some(Commands::Summary) => {
            tokio::runtime::Runtime::new()?.block_on(async { SummaryCommand::new(config).execute().await })
        }
    }
}
