//! # Application Configuration
//!
//! Bootstrap-phase configuration structure.
//!
//! ## Design Philosophy
//!
//! `AppConfig` holds **validated** configuration after:
//! 1. Command-line argument parsing
//! 2. Security validation
//! 3. Environment variable resolution
//! 4. Default value application
//!
//! ## Immutability
//!
//! All configuration is **immutable** after creation. This ensures:
//! - Thread safety (no synchronization needed)
//! - Predictable behavior
//! - Safe sharing across async tasks
//!
//! ## Usage
//!
//! ```rust
//! use upload_bootstrap::config::{AppConfig, LogLevel};
//! use std::path::PathBuf;
//!
//! let config = AppConfig::builder()
//!     .app_name("upload-cli")
//!     .log_level(LogLevel::Info)
//!     .input_path(PathBuf::from("/path/to/file"))
//!     .build();
//!
//! println!("Running: {}", config.app_name());
//! ```

use std::path::PathBuf;

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors (default)
    #[default]
    Info,
    /// All messages including debug
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Application configuration
///
/// Immutable configuration structure holding all bootstrap-phase settings
/// shared by the `upload-cli` client and the `upload-server` binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application name
    app_name: String,

    /// Log level
    log_level: LogLevel,

    /// Input file path (client: file to upload)
    input_path: Option<PathBuf>,

    /// Output/data directory path (server: blob store root; client: progress db dir)
    output_path: Option<PathBuf>,

    /// Number of worker threads / concurrent chunk uploads (None = automatic)
    worker_threads: Option<usize>,

    /// Preferred chunk size in bytes, before server negotiation
    chunk_size_bytes: Option<usize>,

    /// Upload server base URL (client-side)
    server_url: Option<String>,

    /// HTTP bind address (server-side, e.g. "0.0.0.0:8080")
    bind_addr: Option<String>,

    /// Database connection string for persistent metadata/progress stores
    database_url: Option<String>,

    /// Enable verbose output
    verbose: bool,

    /// Dry run mode (no actual changes)
    dry_run: bool,
}

impl AppConfig {
    /// Create a new configuration builder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Get application name
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Get log level
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Get input path
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input_path.as_ref()
    }

    /// Get output path
    pub fn output_path(&self) -> Option<&PathBuf> {
        self.output_path.as_ref()
    }

    /// Get worker thread count
    pub fn worker_threads(&self) -> Option<usize> {
        self.worker_threads
    }

    /// Get the preferred chunk size in bytes
    pub fn chunk_size_bytes(&self) -> Option<usize> {
        self.chunk_size_bytes
    }

    /// Get the configured upload server base URL
    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref()
    }

    /// Get the configured HTTP bind address
    pub fn bind_addr(&self) -> Option<&str> {
        self.bind_addr.as_deref()
    }

    /// Get the configured database connection string
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if dry run mode is enabled
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    app_name: Option<String>,
    log_level: Option<LogLevel>,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    worker_threads: Option<usize>,
    chunk_size_bytes: Option<usize>,
    server_url: Option<String>,
    bind_addr: Option<String>,
    database_url: Option<String>,
    verbose: bool,
    dry_run: bool,
}

impl AppConfigBuilder {
    /// Set application name
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set input path
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Set output path
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set worker thread count
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }

    /// Set the preferred chunk size, in bytes
    pub fn chunk_size_bytes(mut self, bytes: usize) -> Self {
        self.chunk_size_bytes = Some(bytes);
        self
    }

    /// Set the upload server base URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the HTTP bind address
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    /// Set the database connection string
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Enable verbose mode
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Enable dry run mode
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Build the configuration
    ///
    /// # Panics
    ///
    /// Panics if app_name was not set
    pub fn build(self) -> AppConfig {
        self.try_build().expect("app_name is required")
    }

    /// Try to build the configuration
    ///
    /// Returns Err if required fields are missing
    pub fn try_build(self) -> Result<AppConfig, String> {
        Ok(AppConfig {
            app_name: self.app_name.ok_or("app_name is required")?,
            log_level: self.log_level.unwrap_or_default(),
            input_path: self.input_path,
            output_path: self.output_path,
            worker_threads: self.worker_threads,
            chunk_size_bytes: self.chunk_size_bytes,
            server_url: self.server_url,
            bind_addr: self.bind_addr,
            database_url: self.database_url,
            verbose: self.verbose,
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder_minimal() {
        let config = AppConfig::builder().app_name("test-app").build();

        assert_eq!(config.app_name(), "test-app");
        assert_eq!(config.log_level(), LogLevel::Info);
        assert!(config.input_path().is_none());
        assert!(config.output_path().is_none());
        assert!(config.worker_threads().is_none());
        assert!(config.server_url().is_none());
        assert!(!config.is_verbose());
        assert!(!config.is_dry_run());
    }

    #[test]
    fn test_config_builder_full() {
        let config = AppConfig::builder()
            .app_name("full-app")
            .log_level(LogLevel::Debug)
            .input_path("/input")
            .output_path("/output")
            .worker_threads(8)
            .chunk_size_bytes(1024 * 1024)
            .server_url("https://uploads.example.com")
            .bind_addr("0.0.0.0:8080")
            .database_url("sqlite://data.db")
            .verbose(true)
            .dry_run(true)
            .build();

        assert_eq!(config.app_name(), "full-app");
        assert_eq!(config.log_level(), LogLevel::Debug);
        assert_eq!(config.input_path(), Some(&PathBuf::from("/input")));
        assert_eq!(config.output_path(), Some(&PathBuf::from("/output")));
        assert_eq!(config.worker_threads(), Some(8));
        assert_eq!(config.chunk_size_bytes(), Some(1024 * 1024));
        assert_eq!(config.server_url(), Some("https://uploads.example.com"));
        assert_eq!(config.bind_addr(), Some("0.0.0.0:8080"));
        assert_eq!(config.database_url(), Some("sqlite://data.db"));
        assert!(config.is_verbose());
        assert!(config.is_dry_run());
    }

    #[test]
    #[should_panic(expected = "app_name is required")]
    fn test_config_builder_missing_app_name() {
        AppConfig::builder().build();
    }

    #[test]
    fn test_config_try_build_success() {
        let result = AppConfig::builder().app_name("test").try_build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_try_build_failure() {
        let result = AppConfig::builder().try_build();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), "app_name is required");
    }

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_to_tracing() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Info.to_tracing_level(), tracing::Level::INFO);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_config_clone() {
        let config1 = AppConfig::builder().app_name("clone-test").log_level(LogLevel::Debug).build();
        let config2 = config1.clone();

        assert_eq!(config1.app_name(), config2.app_name());
        assert_eq!(config1.log_level(), config2.log_level());
    }
}
