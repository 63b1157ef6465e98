use anyhow::Result;
use tracing::{error, info};

use crate::cli::commands::run::{print_report, run_pipeline};
use crate::config::PipelineConfig;
use crate::trigger::{MonthlySchedule, TriggerDispatcher};

pub struct ScheduleCommand {
    config: PipelineConfig,
    once: bool,
}

impl ScheduleCommand {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, once: false }
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let dispatcher = TriggerDispatcher::new(MonthlySchedule::from_config(&self.config.schedule));
        println!("⏰ Scheduler started; next run at {}", dispatcher.next_slot().format("%Y-%m-%d %H:%M UTC"));

        loop {
            let trigger = tokio::select! {
                trigger = dispatcher.wait_for_next_slot() => trigger,
                _ = tokio::signal::ctrl_c() => {
                    println!("👋 Scheduler stopped");
                    info!("Scheduler interrupted");
                    return Ok(());
                }
            };

            println!("🚀 Scheduled run ({trigger})");
            let result = run_pipeline(&self.config, false, trigger).await;

            if self.once {
                let report = result?;
                print_report(&report);
                return Ok(());
            }

            // A failed slot is not retried; the next slot starts fresh
            match result {
                Ok(report) => print_report(&report),
                Err(e) => error!(error = %format!("{e:#}"), "Scheduled run failed"),
            }
            println!("⏰ Next run at {}", dispatcher.next_slot().format("%Y-%m-%d %H:%M UTC"));
        }
    }
}
