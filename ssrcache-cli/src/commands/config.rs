//! Configuration management CLI commands.
//!
//! Provides `config init`, `config path` and `config show`.

use clap::Subcommand;
use ssrcache::config::ConfigFile;

use crate::error::CliError;
use crate::runner::RunnerOptions;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,

    /// Show the effective configuration, environment overrides included
    Show,
}

/// Run a config subcommand.
pub fn run(options: RunnerOptions, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => run_init(&options, force),
        ConfigCommands::Path => run_path(&options),
        ConfigCommands::Show => run_show(&options),
    }
}

fn run_init(options: &RunnerOptions, force: bool) -> Result<(), CliError> {
    let path = options.config_path();

    if force {
        ConfigFile::default().save_to(&path)?;
        println!("Wrote default configuration to {}", path.display());
    } else if ConfigFile::ensure_exists_at(&path)? {
        println!("Created {}", path.display());
    } else {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    }
    Ok(())
}

fn run_path(options: &RunnerOptions) -> Result<(), CliError> {
    println!("{}", options.config_path().display());
    Ok(())
}

fn run_show(options: &RunnerOptions) -> Result<(), CliError> {
    let mut config = ConfigFile::load_from(&options.config_path())?;
    config.apply_env();
    print!("{}", config.to_ini_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn options_for(path: PathBuf) -> RunnerOptions {
        RunnerOptions {
            config_path: Some(path),
            debug: false,
        }
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[workers]\nmax_workers = 4\n").unwrap();

        run_init(&options_for(path.clone()), false).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[workers]\nmax_workers = 4\n"
        );

        run_init(&options_for(path.clone()), true).unwrap();
        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.workers.max_workers, 7);
    }
}
