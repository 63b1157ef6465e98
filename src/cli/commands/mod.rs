use crate::config::PipelineConfig;
use crate::outputs::OutputSet;

pub mod changes;
pub mod etl;
pub mod next;
pub mod run;
pub mod schedule;
pub mod summary;

pub fn outputs_for(config: &PipelineConfig) -> OutputSet {
    OutputSet::new(&config.repository.path, &config.repository.data_dir)
}

pub fn show_how_to_get_started() {
    println!("🧪 ctgov-etl - ClinicalTrials.gov data pipeline");
    println!();
    println!("Commands:");
    println!("  🚀 ctgov-etl run        # Refresh, commit and push the data now");
    println!("  ⏰ ctgov-etl schedule   # Run on every monthly slot");
    println!("  📅 ctgov-etl next       # Show the next scheduled run");
    println!("  🔬 ctgov-etl etl        # Run only the ETL stage");
    println!("  🔁 ctgov-etl changes    # Rebuild changes.csv from history");
    println!("  📊 ctgov-etl summary    # Headline metrics of the current data");
    println!();
    println!("💡 Start with 'ctgov-etl run --no-push' to try a refresh locally");
}
