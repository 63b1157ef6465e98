//! Environment provisioner
//!
//! Pins the runtime version and installs the declared dependencies before
//! the ETL runs. A failed check or install aborts the run; nothing is retried.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{CommandSpec, ProvisionConfig};
use crate::error::PipelineError;
use crate::external::CommandExecutor;

pub struct Provisioner {
    executor: Arc<dyn CommandExecutor>,
    config: ProvisionConfig,
    repo_root: PathBuf,
    data_dir: PathBuf,
}

/// What provisioning did, for the run report
#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    pub runtime_version: Option<String>,
    pub installed: Vec<String>,
}

impl Provisioner {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        config: ProvisionConfig,
        repo_root: PathBuf,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            executor,
            config,
            repo_root,
            data_dir,
        }
    }

    pub async fn provision(&self) -> Result<ProvisionReport, PipelineError> {
        let mut report = ProvisionReport::default();

        if let Some(check) = &self.config.runtime {
            let reported = self.run(&check.command).await?;
            let version = reported.trim().to_string();
            if !version_matches(&version, &check.expected_version) {
                return Err(PipelineError::provisioning(format!(
                    "runtime version mismatch: expected {}, `{}` reported `{}`",
                    check.expected_version,
                    check.command.display(),
                    version
                )));
            }
            info!(version = %version, "Runtime version verified");
            report.runtime_version = Some(version);
        }

        for spec in &self.config.install {
            info!(command = %spec.display(), "Installing dependencies");
            self.run(spec).await?;
            report.installed.push(spec.display());
        }

        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            PipelineError::provisioning(format!(
                "cannot create data directory {}: {e}",
                self.data_dir.display()
            ))
        })?;

        Ok(report)
    }

    /// Run one command; combined stdout+stderr on success
    async fn run(&self, spec: &CommandSpec) -> Result<String, PipelineError> {
        let output = self
            .executor
            .execute(spec, &self.repo_root)
            .await
            .map_err(|e| PipelineError::provisioning(e.to_string()))?;

        if !output.success() {
            warn!(command = %spec.display(), code = output.status_code, "Provisioning command failed");
            return Err(PipelineError::provisioning(format!(
                "`{}` exited with status {}: {}",
                spec.display(),
                output.status_code,
                output.diagnostic_tail(10)
            )));
        }

        Ok(format!("{}{}", output.stdout, output.stderr))
    }
}

/// `Python 3.11.4` matches `3.11` but not `3.1`
fn version_matches(reported: &str, expected: &str) -> bool {
    reported.split_whitespace().any(|token| {
        token == expected
            || token
                .strip_prefix(expected)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}
