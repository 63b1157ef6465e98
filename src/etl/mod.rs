//! ETL stage
//!
//! Two interchangeable runners: the built-in ClinicalTrials.gov ETL and an
//! external script treated as an opaque unit of work. Either way the stage
//! only succeeds when every file of the output set is on disk afterwards.

pub mod changes;
pub mod client;
pub mod history;
pub mod model;
pub mod normalize;
pub mod summary;
pub mod transform;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::{CommandSpec, EtlMode, PipelineConfig, SourceConfig};
use crate::error::PipelineError;
use crate::external::CommandExecutor;
use crate::outputs::OutputSet;

pub use changes::{generate_changes, ChangeRecord, ChangeReport};
pub use client::ClinicalTrialsClient;
pub use summary::{summarize, SnapshotSummary};
pub use transform::Snapshot;

/// Counts reported by a finished ETL run
#[derive(Debug, Clone, Default)]
pub struct EtlReport {
    pub studies: Option<usize>,
    pub changes: Option<ChangeReport>,
}

#[async_trait]
pub trait EtlRunner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produce the output set; any error aborts the pipeline
    async fn run(&self, outputs: &OutputSet) -> Result<EtlReport, PipelineError>;
}

/// Build the runner selected by configuration
pub fn runner_from_config(config: &PipelineConfig, executor: Arc<dyn CommandExecutor>) -> Box<dyn EtlRunner> {
    match config.etl.mode {
        EtlMode::Native => Box::new(NativeEtl::new(config.source.clone(), config.etl.changes_window)),
        EtlMode::Script => Box::new(ScriptEtl::new(
            executor,
            config.etl.script.clone(),
            config.repository.path.clone(),
        )),
    }
}

/// External program that writes the output set and exits zero
pub struct ScriptEtl {
    executor: Arc<dyn CommandExecutor>,
    command: CommandSpec,
    working_dir: PathBuf,
}

impl ScriptEtl {
    pub fn new(executor: Arc<dyn CommandExecutor>, command: CommandSpec, working_dir: PathBuf) -> Self {
        Self {
            executor,
            command,
            working_dir,
        }
    }
}

#[async_trait]
impl EtlRunner for ScriptEtl {
    fn name(&self) -> &'static str {
        "script"
    }

    async fn run(&self, _outputs: &OutputSet) -> Result<EtlReport, PipelineError> {
        info!(command = %self.command.display(), "Running ETL script");
        let output = self
            .executor
            .execute(&self.command, &self.working_dir)
            .await
            .map_err(|e| PipelineError::etl(e.to_string()))?;

        if !output.success() {
            return Err(PipelineError::etl(format!(
                "`{}` exited with status {}: {}",
                self.command.display(),
                output.status_code,
                output.diagnostic_tail(20)
            )));
        }
        Ok(EtlReport::default())
    }
}

/// Download, transform, append to history and diff, in-process
pub struct NativeEtl {
    source: SourceConfig,
    changes_window: usize,
}

impl NativeEtl {
    pub fn new(source: SourceConfig, changes_window: usize) -> Self {
        Self {
            source,
            changes_window,
        }
    }

    async fn run_steps(&self, outputs: &OutputSet) -> anyhow::Result<EtlReport> {
        let data_dir = outputs.data_dir();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Cannot create {}", data_dir.display()))?;

        let client = ClinicalTrialsClient::new(&self.source)?;
        let raw = client.fetch_studies().await?;
        transform::write_raw_studies(&outputs.path_of("studies.json"), &raw)?;
        info!(count = raw.len(), "Step 1: saved studies.json");

        let studies = transform::parse_studies(&raw)?;
        let timestamp = Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let snapshot = Snapshot::build(&studies, &timestamp);
        snapshot.write_all(&data_dir)?;
        info!("Step 2: snapshot tables written");

        history::append_to_history(&outputs.path_of("studies.csv"), &outputs.path_of("studies_history.csv"))?;
        info!("Step 3: history updated");

        let changes = generate_changes(
            &outputs.path_of("studies_history.csv"),
            &outputs.path_of("changes.csv"),
            self.changes_window,
        )?;
        info!("Step 4: changes report generated");

        Ok(EtlReport {
            studies: Some(studies.len()),
            changes: Some(changes),
        })
    }
}

#[async_trait]
impl EtlRunner for NativeEtl {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn run(&self, outputs: &OutputSet) -> Result<EtlReport, PipelineError> {
        self.run_steps(outputs)
            .await
            .map_err(|e| PipelineError::etl(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::command::{CommandOutput, MockCommandExecutor};

    #[tokio::test]
    async fn test_script_failure_maps_to_etl_error() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute().times(1).returning(|_, _| {
            Ok(CommandOutput {
                status_code: 1,
                stdout: String::new(),
                stderr: "Traceback: KeyError 'studies'".to_string(),
            })
        });
        let dir = tempfile::tempdir().unwrap();
        let etl = ScriptEtl::new(
            Arc::new(mock),
            CommandSpec::new("python", &["etl.py"]),
            dir.path().to_path_buf(),
        );

        let err = etl.run(&OutputSet::new(dir.path(), "data")).await.unwrap_err();
        assert!(matches!(err, PipelineError::EtlExecution { .. }));
        assert!(err.to_string().contains("KeyError"));
    }

    #[tokio::test]
    async fn test_script_success_reports_no_counts() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .withf(|spec, _| spec.program == "python")
            .times(1)
            .returning(|_, _| {
                Ok(CommandOutput {
                    status_code: 0,
                    stdout: "done".to_string(),
                    stderr: String::new(),
                })
            });
        let dir = tempfile::tempdir().unwrap();
        let etl = ScriptEtl::new(
            Arc::new(mock),
            CommandSpec::new("python", &["etl.py"]),
            dir.path().to_path_buf(),
        );

        let report = etl.run(&OutputSet::new(dir.path(), "data")).await.unwrap();
        assert!(report.studies.is_none());
    }
}
