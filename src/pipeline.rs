//! Run orchestration: provision, ETL, verify outputs, publish.
//!
//! Stages run strictly in order and the first failure ends the run. A
//! failed stage leaves the working tree as it is; no commit is created
//! before the publish stage.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, Instrument};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::etl::{runner_from_config, EtlReport, EtlRunner};
use crate::external::CommandExecutor;
use crate::git::Git2Operations;
use crate::outputs::OutputSet;
use crate::provision::{ProvisionReport, Provisioner};
use crate::publisher::{PublishReport, Publisher};
use crate::telemetry::{create_run_span, create_stage_span, generate_run_id};
use crate::trigger::Trigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Provision,
    Etl,
    Verify,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Provision => "provision",
            Stage::Etl => "etl",
            Stage::Verify => "verify",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub trigger: Trigger,
    pub provision: Option<ProvisionReport>,
    pub etl: EtlReport,
    pub publish: PublishReport,
}

pub struct Pipeline {
    provisioner: Option<Provisioner>,
    etl: Box<dyn EtlRunner>,
    publisher: Publisher,
    outputs: OutputSet,
}

impl Pipeline {
    pub fn new(
        provisioner: Option<Provisioner>,
        etl: Box<dyn EtlRunner>,
        publisher: Publisher,
        outputs: OutputSet,
    ) -> Self {
        Self {
            provisioner,
            etl,
            publisher,
            outputs,
        }
    }

    /// Wire the stages from configuration. `skip_provision` drops the
    /// provisioning stage for environments that are already set up.
    pub fn from_config(
        config: &PipelineConfig,
        executor: Arc<dyn CommandExecutor>,
        skip_provision: bool,
    ) -> Result<Self, PipelineError> {
        let repo_root = config.repository.path.clone();
        let outputs = OutputSet::new(&repo_root, &config.repository.data_dir);

        let provisioner = (!skip_provision).then(|| {
            Provisioner::new(
                executor.clone(),
                config.provision.clone(),
                repo_root.clone(),
                outputs.data_dir(),
            )
        });

        let git = Git2Operations::new(&repo_root)
            .map_err(|e| PipelineError::Config(format!("{}: {e:#}", repo_root.display())))?
            .with_token(config.publish.token.clone());
        let publisher = Publisher::new(
            Box::new(git),
            config.publish.clone(),
            config.repository.remote.clone(),
            config.repository.branch.clone(),
        );

        Ok(Self::new(
            provisioner,
            runner_from_config(config, executor),
            publisher,
            outputs,
        ))
    }

    pub fn outputs(&self) -> &OutputSet {
        &self.outputs
    }

    /// Execute one run. Manual and scheduled triggers take the same path.
    pub async fn run(&self, trigger: Trigger) -> Result<RunReport, PipelineError> {
        let run_id = generate_run_id();
        let span = create_run_span(&run_id, trigger.label());
        let started = Instant::now();

        let result = self.run_stages(&run_id, trigger).instrument(span.clone()).await;

        let _guard = span.enter();
        match &result {
            Ok(report) => info!(
                duration_ms = started.elapsed().as_millis() as u64,
                commit = %report.publish.commit,
                "Pipeline run succeeded"
            ),
            Err(e) => error!(
                duration_ms = started.elapsed().as_millis() as u64,
                exit_code = e.exit_code(),
                error = %e,
                "Pipeline run failed"
            ),
        }
        result
    }

    async fn run_stages(&self, run_id: &str, trigger: Trigger) -> Result<RunReport, PipelineError> {
        info!(trigger = %trigger, "Pipeline run started");

        let provision = match &self.provisioner {
            Some(provisioner) => Some(
                provisioner
                    .provision()
                    .instrument(create_stage_span(&Stage::Provision.to_string()))
                    .await?,
            ),
            None => {
                info!("Provisioning skipped");
                None
            }
        };

        let etl = self
            .etl
            .run(&self.outputs)
            .instrument(create_stage_span(&Stage::Etl.to_string()))
            .await?;

        {
            let _stage = create_stage_span(&Stage::Verify.to_string()).entered();
            self.verify_outputs()?;
        }

        let publish = {
            let _stage = create_stage_span(&Stage::Publish.to_string()).entered();
            self.publisher.publish(&self.outputs)?
        };

        Ok(RunReport {
            run_id: run_id.to_string(),
            trigger,
            provision,
            etl,
            publish,
        })
    }

    /// Every output must exist once the ETL reports success
    pub fn verify_outputs(&self) -> Result<(), PipelineError> {
        let missing = self.outputs.missing();
        if missing.is_empty() {
            info!("All output files present");
            return Ok(());
        }
        Err(PipelineError::etl(format!(
            "ETL succeeded but did not produce: {}",
            missing.join(", ")
        )))
    }
}
