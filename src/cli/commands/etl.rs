use anyhow::Result;
use std::sync::Arc;

use crate::cli::commands::outputs_for;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::etl::runner_from_config;
use crate::external::ProcessCommandExecutor;

pub struct EtlCommand {
    config: PipelineConfig,
}

impl EtlCommand {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub async fn execute(&self) -> Result<()> {
        let runner = runner_from_config(&self.config, Arc::new(ProcessCommandExecutor));
        let outputs = outputs_for(&self.config);

        println!("🔬 Running {} ETL into {}", runner.name(), outputs.data_dir().display());
        let report = runner.run(&outputs).await.inspect_err(|e| println!("❌ {e}"))?;

        let missing = outputs.missing();
        if !missing.is_empty() {
            println!("❌ Missing outputs:");
            for path in &missing {
                println!("   → {path}");
            }
            return Err(PipelineError::etl(format!("ETL did not produce: {}", missing.join(", "))).into());
        }

        if let Some(count) = report.studies {
            println!("✅ {count} studies extracted");
        }
        if let Some(changes) = report.changes {
            println!(
                "   🔁 {} new, {} removed, {} field changes",
                changes.new_studies, changes.removed_studies, changes.field_changes
            );
        }
        println!("✅ All output files present");
        Ok(())
    }
}
