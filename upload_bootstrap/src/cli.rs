//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse_cli()             │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validate_cli()                  │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration
///
/// Holds all CLI arguments after security validation. Paths that must
/// already exist are canonicalized; paths that are about to be created
/// (upload server data dirs, progress databases) are only pattern-checked.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub concurrency: Option<usize>,
}

/// Validated command variants
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Upload {
        input: PathBuf,
        server: String,
        chunk_size_mb: Option<usize>,
        progress_db: Option<PathBuf>,
    },
    Resume {
        task_id: String,
        input: PathBuf,
        server: String,
        progress_db: Option<PathBuf>,
    },
    ListTasks {
        progress_db: Option<PathBuf>,
    },
    Cancel {
        task_id: String,
        progress_db: Option<PathBuf>,
    },
    Serve {
        bind: String,
        data_dir: PathBuf,
        database_url: Option<String>,
    },
}

/// Parse and validate CLI arguments
///
/// 1. Parse CLI with clap
/// 2. Validate all paths and values with `SecureArgParser`
/// 3. Return `ValidatedCli` on success
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

/// Validate parsed CLI arguments
fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    if let Some(concurrency) = cli.concurrency {
        if concurrency == 0 || concurrency > 256 {
            return Err(ParseError::InvalidValue {
                arg: "concurrency".to_string(),
                reason: "must be between 1 and 256".to_string(),
            });
        }
    }

    let command = match cli.command {
        Commands::Upload {
            input,
            server,
            chunk_size_mb,
            progress_db,
        } => {
            let validated_input = SecureArgParser::validate_path(&input.to_string_lossy())?;
            SecureArgParser::validate_argument(&server)?;

            if let Some(size) = chunk_size_mb {
                if size == 0 || size > 1024 {
                    return Err(ParseError::InvalidValue {
                        arg: "chunk-size-mb".to_string(),
                        reason: "must be between 1 and 1024 MB".to_string(),
                    });
                }
            }

            if let Some(ref path) = progress_db {
                // The progress database file may not exist yet on first run.
                SecureArgParser::validate_argument(&path.to_string_lossy())?;
            }

            ValidatedCommand::Upload {
                input: validated_input,
                server,
                chunk_size_mb,
                progress_db,
            }
        }
        Commands::Resume {
            task_id,
            input,
            server,
            progress_db,
        } => {
            SecureArgParser::validate_argument(&task_id)?;
            let validated_input = SecureArgParser::validate_path(&input.to_string_lossy())?;
            SecureArgParser::validate_argument(&server)?;

            ValidatedCommand::Resume {
                task_id,
                input: validated_input,
                server,
                progress_db,
            }
        }
        Commands::ListTasks { progress_db } => ValidatedCommand::ListTasks { progress_db },
        Commands::Cancel { task_id, progress_db } => {
            SecureArgParser::validate_argument(&task_id)?;
            ValidatedCommand::Cancel { task_id, progress_db }
        }
        Commands::Serve {
            bind,
            data_dir,
            database_url,
        } => {
            SecureArgParser::validate_argument(&bind)?;
            // The data directory may not exist yet; validate the string only.
            SecureArgParser::validate_argument(&data_dir.to_string_lossy())?;

            if let Some(ref url) = database_url {
                SecureArgParser::validate_argument(url)?;
            }

            ValidatedCommand::Serve {
                bind,
                data_dir,
                database_url,
            }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
        concurrency: cli.concurrency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_concurrency() {
        let cli = Cli {
            command: Commands::ListTasks { progress_db: None },
            verbose: false,
            config: None,
            concurrency: Some(0),
        };

        assert!(matches!(validate_cli(cli), Err(ParseError::InvalidValue { .. })));
    }

    #[test]
    fn accepts_list_tasks_command() {
        let cli = Cli {
            command: Commands::ListTasks { progress_db: None },
            verbose: true,
            config: None,
            concurrency: Some(4),
        };

        let validated = validate_cli(cli).expect("should validate");
        assert!(validated.verbose);
        assert!(matches!(validated.command, ValidatedCommand::ListTasks { .. }));
    }

    #[test]
    fn rejects_dangerous_server_url() {
        let cli = Cli {
            command: Commands::Serve {
                bind: "0.0.0.0:8080".to_string(),
                data_dir: PathBuf::from("/tmp/upload-data"),
                database_url: Some("sqlite://data.db;DROP TABLE manifests".to_string()),
            },
            verbose: false,
            config: None,
            concurrency: None,
        };

        assert!(validate_cli(cli).is_err());
    }
}
