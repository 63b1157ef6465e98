use anyhow::Result;

use crate::cli::commands::outputs_for;
use crate::config::PipelineConfig;
use crate::etl::summarize;

pub struct SummaryCommand {
    config: PipelineConfig,
}

impl SummaryCommand {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub async fn execute(&self) -> Result<()> {
        let path = outputs_for(&self.config).path_of("studies.csv");
        let summary = summarize(&path)?;

        println!("📊 CLINICAL TRIALS SNAPSHOT");
        println!("==========================");
        println!("   🧪 Total trials: {}", summary.total_studies);
        println!("   🟢 Recruiting: {}", summary.recruiting);
        println!("   ✅ Completed: {}", summary.completed);
        match &summary.extracted_at {
            Some(at) => println!("   🕒 Data extracted: {at}"),
            None => println!("   🕒 Data extracted: unknown"),
        }

        if !summary.by_status.is_empty() {
            println!();
            println!("📋 BY STATUS:");
            let mut statuses: Vec<_> = summary.by_status.iter().collect();
            statuses.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (status, count) in statuses {
                println!("   {status}: {count}");
            }
        }
        Ok(())
    }
}
