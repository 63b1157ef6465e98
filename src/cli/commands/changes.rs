use anyhow::Result;

use crate::cli::commands::outputs_for;
use crate::config::PipelineConfig;
use crate::etl::generate_changes;

pub struct ChangesCommand {
    config: PipelineConfig,
    last: Option<usize>,
}

impl ChangesCommand {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, last: None }
    }

    pub fn with_last(mut self, last: Option<usize>) -> Self {
        self.last = last;
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let outputs = outputs_for(&self.config);
        let window = self.last.unwrap_or(self.config.etl.changes_window);

        println!("🔁 Comparing the last {window} snapshots per study");
        let report = generate_changes(
            &outputs.path_of("studies_history.csv"),
            &outputs.path_of("changes.csv"),
            window,
        )?;

        if report.is_empty() {
            println!("✅ No changes detected");
        } else {
            println!("   🆕 New studies: {}", report.new_studies);
            println!("   🗑️  Removed studies: {}", report.removed_studies);
            println!("   ✏️  Field changes: {}", report.field_changes);
        }
        println!("📄 Wrote {}", outputs.path_of("changes.csv").display());
        Ok(())
    }
}
