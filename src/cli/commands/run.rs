use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

use crate::cli::TriggerArg;
use crate::config::PipelineConfig;
use crate::external::ProcessCommandExecutor;
use crate::pipeline::{Pipeline, RunReport};
use crate::trigger::{MonthlySchedule, Trigger, TriggerDispatcher};

pub struct RunCommand {
    config: PipelineConfig,
    trigger: TriggerArg,
    skip_provision: bool,
}

impl RunCommand {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            trigger: TriggerArg::Manual,
            skip_provision: false,
        }
    }

    pub fn with_trigger(mut self, trigger: TriggerArg) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_no_push(mut self, no_push: bool) -> Self {
        if no_push {
            self.config.publish.enabled = false;
        }
        self
    }

    pub fn with_skip_provision(mut self, skip_provision: bool) -> Self {
        self.skip_provision = skip_provision;
        self
    }

    fn resolve_trigger(&self) -> Trigger {
        let dispatcher = TriggerDispatcher::new(MonthlySchedule::from_config(&self.config.schedule));
        match self.trigger {
            TriggerArg::Manual => dispatcher.manual(),
            TriggerArg::Scheduled => Trigger::Scheduled {
                slot: dispatcher.schedule().latest_at_or_before(Utc::now()),
            },
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let trigger = self.resolve_trigger();
        println!("🚀 Starting pipeline run ({trigger})");
        println!();

        let report = run_pipeline(&self.config, self.skip_provision, trigger).await?;
        print_report(&report);
        Ok(())
    }
}

/// Build the pipeline from configuration and run it once, printing stage
/// outcomes as they are known
pub async fn run_pipeline(config: &PipelineConfig, skip_provision: bool, trigger: Trigger) -> Result<RunReport> {
    let pipeline = Pipeline::from_config(config, Arc::new(ProcessCommandExecutor), skip_provision)?;
    match pipeline.run(trigger).await {
        Ok(report) => Ok(report),
        Err(e) => {
            println!("❌ {e}");
            Err(e.into())
        }
    }
}

pub fn print_report(report: &RunReport) {
    if let Some(provision) = &report.provision {
        match &provision.runtime_version {
            Some(version) => println!("✅ Environment ready ({version})"),
            None => println!("✅ Environment ready"),
        }
        for command in &provision.installed {
            println!("   📦 {command}");
        }
    }

    match report.etl.studies {
        Some(count) => println!("✅ ETL finished: {count} studies"),
        None => println!("✅ ETL finished"),
    }
    if let Some(changes) = &report.etl.changes {
        println!(
            "   🔁 {} new, {} removed, {} field changes",
            changes.new_studies, changes.removed_studies, changes.field_changes
        );
    }

    println!("✅ Committed {} ({} files changed)", short(&report.publish.commit), report.publish.changed.len());
    if report.publish.pushed {
        println!("✅ Pushed to {}", report.publish.branch);
    } else {
        println!("⏸️  Push skipped; commit left on {}", report.publish.branch);
    }
    println!();
    println!("🆔 Run id: {}", report.run_id);
}

fn short(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}
