use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ctgov-etl.toml";

/// Main configuration structure for the pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Repository that receives the data commit
    pub repository: RepositoryConfig,
    /// Monthly trigger slot
    pub schedule: ScheduleConfig,
    /// Environment provisioning commands
    pub provision: ProvisionConfig,
    /// ETL execution settings
    pub etl: EtlConfig,
    /// ClinicalTrials.gov query used by the native ETL
    pub source: SourceConfig,
    /// Commit and push settings
    pub publish: PublishConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Path of the working tree
    pub path: PathBuf,
    /// Data directory, relative to the working tree
    pub data_dir: String,
    /// Remote to push to
    pub remote: String,
    /// Branch to push; defaults to the branch HEAD points to
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Day of month (UTC), clamped to 1..=28
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Render as a shell-like string for logs
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeCheck {
    /// Command printing the runtime version, e.g. `python --version`
    pub command: CommandSpec,
    /// Version prefix expected in the command output, e.g. `3.11`
    pub expected_version: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvisionConfig {
    /// Runtime version pin, checked before installing anything
    pub runtime: Option<RuntimeCheck>,
    /// Dependency installation commands, run in order
    #[serde(default)]
    pub install: Vec<CommandSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EtlMode {
    /// Built-in ClinicalTrials.gov ETL
    Native,
    /// External script treated as an opaque unit of work
    Script,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EtlConfig {
    pub mode: EtlMode,
    /// Script invoked in `script` mode, run from the repository root
    pub script: CommandSpec,
    /// Number of most recent snapshots compared per study
    pub changes_window: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// API base, without the `/studies` path
    pub base_url: String,
    /// Value of the `query.cond` parameter
    pub condition: String,
    /// Studies requested per page (the API caps this at 1000)
    pub page_size: u32,
    /// Stop paging once this many studies were collected
    pub max_studies: Option<usize>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    /// Push after committing
    pub enabled: bool,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    /// Push token; read from GITHUB_TOKEN when unset
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Default filter when RUST_LOG is unset
    pub log_level: String,
    /// `json` or `pretty`
    pub log_format: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            repository: RepositoryConfig {
                path: PathBuf::from("."),
                data_dir: "data".to_string(),
                remote: "origin".to_string(),
                branch: None,
            },
            schedule: ScheduleConfig {
                day: 1,
                hour: 0,
                minute: 0,
            },
            provision: ProvisionConfig::default(),
            etl: EtlConfig {
                mode: EtlMode::Native,
                script: CommandSpec::new("python", &["etl.py"]),
                changes_window: 10,
            },
            source: SourceConfig {
                base_url: "https://clinicaltrials.gov/api/v2".to_string(),
                condition: "HFpEF - Heart Failure With Preserved Ejection Fraction".to_string(),
                page_size: 1000,
                max_studies: None,
                timeout_seconds: 60,
            },
            publish: PublishConfig {
                enabled: true,
                author_name: "github-actions[bot]".to_string(),
                author_email: "41898282+github-actions[bot]@users.noreply.github.com".to_string(),
                message: "Update clinical trials data".to_string(),
                token: None,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: "json".to_string(),
            },
        }
    }
}

impl PipelineConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`explicit`, else ctgov-etl.toml when present)
    /// 3. Environment variables (CTGOV_ETL__SECTION__KEY)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&PipelineConfig::default())
            .context("Failed to serialize default configuration")?;
        let mut builder = Config::builder().add_source(defaults);

        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::from(Path::new(DEFAULT_CONFIG_FILE)));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("CTGOV_ETL")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: PipelineConfig = builder
            .build()?
            .try_deserialize()
            .context("Invalid pipeline configuration")?;

        if config.publish.token.is_none() {
            config.publish.token = std::env::var("GITHUB_TOKEN")
                .or_else(|_| std::env::var("CTGOV_ETL_TOKEN"))
                .ok()
                .filter(|t| !t.is_empty());
        }

        config.schedule.day = config.schedule.day.clamp(1, 28);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Absolute-or-relative path of the data directory
    pub fn data_dir(&self) -> PathBuf {
        self.repository.path.join(&self.repository.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_native_etl_and_first_of_month() {
        let config = PipelineConfig::default();
        assert_eq!(config.etl.mode, EtlMode::Native);
        assert_eq!(config.schedule.day, 1);
        assert_eq!(config.etl.changes_window, 10);
        assert_eq!(config.data_dir(), PathBuf::from("./data"));
    }

    #[test]
    fn test_load_from_explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(
            &path,
            r#"
[etl]
mode = "script"
changes_window = 3

[etl.script]
program = "python3"
args = ["scripts/etl.py"]

[schedule]
day = 31
hour = 6
minute = 30
"#,
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.etl.mode, EtlMode::Script);
        assert_eq!(config.etl.script, CommandSpec::new("python3", &["scripts/etl.py"]));
        assert_eq!(config.etl.changes_window, 3);
        assert_eq!(config.schedule.day, 28);
        assert_eq!(config.schedule.hour, 6);
        assert_eq!(config.source.page_size, 1000);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = PipelineConfig::default();
        config.publish.message = "Monthly refresh".to_string();
        config.save_to_file(&path).unwrap();

        let reloaded = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(reloaded.publish.message, "Monthly refresh");
    }

    #[test]
    fn test_command_spec_display() {
        assert_eq!(CommandSpec::new("python", &["etl.py"]).display(), "python etl.py");
        assert_eq!(CommandSpec::new("make", &[]).display(), "make");
    }
}
