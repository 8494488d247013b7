//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the enterprise application layers
//! (domain, application, infrastructure) and provides:
//!
//! - **Entry point** - Application lifecycle management
//! - **Platform abstraction** - OS-specific operations (POSIX vs Windows)
//! - **Signal handling** - Graceful shutdown (SIGTERM, SIGINT, SIGHUP)
//! - **Argument parsing** - Secure CLI argument validation
//! - **Error handling** - Unix exit code mapping
//! - **Async coordination** - Shutdown coordination and cancellation
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          BOOTSTRAP (This Module)            │
//! │  - Entry Point                              │
//! │  - Platform Abstraction                     │
//! │  - Signal Handling                          │
//! │  - Secure Arg Parsing                       │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │   upload_engine / upload_server (binaries)  │
//! │  - Use cases, domain services, adapters     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Key Design Principles
//!
//! 1. **Separation from enterprise layers** - bootstrap can see the
//!    client/server crates; they never depend back on bootstrap's
//!    platform-specific internals.
//! 2. **Platform abstraction** - OS-specific functionality lives behind a
//!    trait, selected at compile time.
//! 3. **Graceful shutdown** - signal handlers, cancellation token
//!    propagation, grace period enforcement.
//! 4. **Security first** - CLI input validation, path traversal
//!    prevention, injection protection.
//! 5. **Testability** - every component is behind a trait with a no-op or
//!    in-memory implementation available for tests.
//!
//! ## Module Structure
//!
//! - `platform` - OS abstraction (Unix/Windows)
//! - `signals` - Signal handling (SIGTERM, SIGINT, SIGHUP)
//! - `cli` - Secure argument parsing
//! - `config` - Application configuration
//! - `exit_code` - Unix exit code enumeration
//! - `logger` - Bootstrap-specific logging
//! - `shutdown` - Shutdown coordination

pub mod cli;
pub mod config;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code, ExitCode};

/// Bootstrap and parse CLI arguments
///
/// The main entry point for the bootstrap layer. Handles CLI parsing with
/// clap and security validation, and returns a validated configuration.
/// The caller is responsible for running application logic and mapping the
/// result to an exit code with [`result_to_exit_code`].
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}

/// Install a `tracing` subscriber at the given level, honoring
/// `RUST_LOG` if set.
///
/// Called once from each binary's `main` before any other bootstrap
/// activity, so that CLI validation errors and shutdown events are logged
/// consistently.
pub fn init_tracing(level: config::LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
