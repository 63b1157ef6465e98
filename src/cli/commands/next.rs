use anyhow::Result;
use chrono::Utc;

use crate::config::PipelineConfig;
use crate::trigger::{MonthlySchedule, TriggerDispatcher};

pub struct NextCommand {
    config: PipelineConfig,
}

impl NextCommand {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub async fn execute(&self) -> Result<()> {
        let dispatcher = TriggerDispatcher::new(MonthlySchedule::from_config(&self.config.schedule));
        let slot = dispatcher.next_slot();
        let wait = slot - Utc::now();

        println!("📅 Next scheduled run: {}", slot.format("%Y-%m-%d %H:%M UTC"));
        println!(
            "   ⏳ in {} days, {} hours",
            wait.num_days(),
            wait.num_hours() - wait.num_days() * 24
        );
        Ok(())
    }
}
