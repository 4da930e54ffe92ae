//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use ssrcache::config::ConfigFileError;
use ssrcache::transform::TransformError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Command cannot run with the given arguments and configuration
    Usage(String),
    /// Failed to read an input file
    FileRead {
        path: PathBuf,
        error: std::io::Error,
    },
    /// Failed to write an output file
    FileWrite {
        path: PathBuf,
        error: std::io::Error,
    },
    /// Transform pipeline failed
    Transform(TransformError),
    /// The gateway answered with nothing (miss, maintenance or worker fault)
    NoResult(String),
    /// Failed to install the Ctrl-C handler
    Signal(std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NoResult(_) => 3,
            CliError::Config(_) | CliError::Usage(_) => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in the configuration file, or regenerate it with:");
                eprintln!("  ssrcache config init --force");
            }
            CliError::NoResult(_) => {
                eprintln!();
                eprintln!("Details are in the log file (ssrcache config show lists its location).");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path.display(), error)
            }
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
            CliError::Transform(e) => write!(f, "Transform failed: {}", e),
            CliError::NoResult(what) => write!(f, "{}", what),
            CliError::Signal(e) => write!(f, "Failed to set signal handler: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::Transform(e) => Some(e),
            CliError::Signal(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<TransformError> for CliError {
    fn from(e: TransformError) -> Self {
        CliError::Transform(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::NoResult("miss".into()).exit_code(), 3);
        assert_eq!(CliError::LoggingInit("x".into()).exit_code(), 1);
        let invalid = ConfigFileError::InvalidValue {
            section: "workers".into(),
            key: "max_workers".into(),
            value: "0".into(),
            reason: "must be at least 1".into(),
        };
        let err = CliError::from(invalid);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("workers.max_workers"));
    }
}
