//! External tool abstractions
//!
//! Provisioning commands and the ETL script run through the
//! `CommandExecutor` trait so the pipeline can be exercised with fakes.

pub mod command;

pub use command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
