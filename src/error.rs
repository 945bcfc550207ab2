//! Fatal error taxonomy.
//!
//! Both kinds end the process with status 1 after a single `✗` line.

use std::path::PathBuf;
use thiserror::Error;

/// The configuration cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration file found (tried {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),

    #[error("Unable to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("Unknown notification carrier '{0}'")]
    UnknownCarrier(String),

    #[error("Notification carrier '{0}' is enabled but has no url")]
    CarrierWithoutUrl(String),

    #[error("Logging is enabled but logging/destination is not set")]
    LoggingWithoutDestination,

    #[error("Rollback is enabled but rollback/destination is not set")]
    RollbackWithoutDestination,

    #[error("Rollback is not enabled in your config file")]
    RollbackDisabled,

    #[error("You need to add global/backupdir to your config file")]
    NoBackupDir,

    #[error("You need to add logging/destination to your config file")]
    NoLogDestination,

    #[error("You need to add global/git_cookbook_path to your config file")]
    NoCookbookPath,

    #[error("No chef_server_url in {0}")]
    NoServerUrl(PathBuf),
}

/// Something about the invocation or the working copy forbids running.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error(
        "Git repo is actually on branch {actual} but you want to align using {expected}. Checkout to the desired one."
    )]
    WrongBranch { expected: String, actual: String },

    #[error("Environment {0} not found on server")]
    UnknownEnvironment(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
