// ctgov-etl library - ClinicalTrials.gov extract, transform and publish pipeline
// This exposes the pipeline stages for the binary and for integration tests

pub mod cli;
pub mod config;
pub mod error;
pub mod etl;
pub mod external;
pub mod git;
pub mod outputs;
pub mod pipeline;
pub mod provision;
pub mod publisher;
pub mod telemetry;
pub mod trigger;

// Re-export key types for easy access
pub use config::{CommandSpec, EtlMode, PipelineConfig};
pub use error::PipelineError;
pub use etl::{EtlReport, EtlRunner, NativeEtl, ScriptEtl};
pub use external::{CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use git::{CommitAuthor, Git2Operations, GitOperations, PushStatus};
pub use outputs::{OutputSet, OUTPUT_FILES};
pub use pipeline::{Pipeline, RunReport, Stage};
pub use provision::{ProvisionReport, Provisioner};
pub use publisher::{PublishReport, Publisher};
pub use telemetry::{create_run_span, create_stage_span, generate_run_id, init_telemetry};
pub use trigger::{MonthlySchedule, Trigger, TriggerDispatcher};
