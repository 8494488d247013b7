// /////////////////////////////////////////////////////////////////////////////
// Chunked Upload Platform
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Provides standardized Unix exit codes following BSD `sysexits.h` conventions.
//!
//! ## Exit Code Conventions
//!
//! - **0**: Success
//! - **1**: General error
//! - **64-78**: Specific error conditions (BSD sysexits.h)
//! - **128+N**: Fatal signal N (e.g., 130 = SIGINT)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use upload_bootstrap::exit_code::{ExitCode, result_to_exit_code};
//!
//! fn run_application() -> Result<(), Box<dyn std::error::Error>> {
//!     Ok(())
//! }
//!
//! fn main() -> std::process::ExitCode {
//!     result_to_exit_code(run_application())
//! }
//! ```

use std::fmt;

/// Exit codes following Unix conventions (BSD sysexits.h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// General error (1)
    Error = 1,

    /// Command line usage error (64)
    UsageError = 64,

    /// Data format error (65)
    DataError = 65,

    /// Cannot open input (66)
    NoInput = 66,

    /// Service unavailable (69)
    Unavailable = 69,

    /// Internal software error (70)
    Software = 70,

    /// System error (71)
    OsError = 71,

    /// Cannot create output file (73)
    CantCreate = 73,

    /// I/O error (74)
    IoError = 74,

    /// Temporary failure, retry (75)
    TempFail = 75,

    /// Remote error in protocol (76)
    Protocol = 76,

    /// Permission denied (77)
    NoPerm = 77,

    /// Configuration error (78)
    Config = 78,

    /// Interrupted by signal (SIGINT - Ctrl+C) (130)
    Interrupted = 130,

    /// Terminated by signal (SIGTERM) (143)
    Terminated = 143,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create ExitCode from error type
    ///
    /// Maps common error message patterns to the closest `sysexits.h` code.
    /// Errors whose `Display` carries `upload_domain::UploadError`'s
    /// `category()` tag map more precisely via [`Self::from_category`].
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        let error_string = error.to_string().to_lowercase();

        if error_string.contains("permission") || error_string.contains("access denied") {
            ExitCode::NoPerm
        } else if error_string.contains("not found") || error_string.contains("no such") {
            ExitCode::NoInput
        } else if error_string.contains("invalid") || error_string.contains("argument") {
            ExitCode::UsageError
        } else if error_string.contains("parse") || error_string.contains("mismatch") {
            ExitCode::DataError
        } else if error_string.contains("timeout") || error_string.contains("retry") {
            ExitCode::TempFail
        } else if error_string.contains("network") || error_string.contains("protocol") {
            ExitCode::Protocol
        } else if error_string.contains("io") || error_string.contains("read") || error_string.contains("write") {
            ExitCode::IoError
        } else if error_string.contains("config") {
            ExitCode::Config
        } else if error_string.contains("unavailable") || error_string.contains("not available") {
            ExitCode::Unavailable
        } else {
            ExitCode::Error
        }
    }

    /// Map an `upload_domain::UploadError` category tag to an exit code
    ///
    /// Used by the CLI's top-level error handler, which has the category
    /// string available directly instead of having to pattern-match message
    /// text the way [`Self::from_error`] does for opaque errors.
    pub fn from_category(category: &str) -> Self {
        match category {
            "argument" | "transition" => ExitCode::UsageError,
            "configuration" => ExitCode::Config,
            "network" => ExitCode::Protocol,
            "timeout" => ExitCode::TempFail,
            "mismatch" | "integrity" => ExitCode::DataError,
            "storage" => ExitCode::Unavailable,
            "quota" => ExitCode::Unavailable,
            "token" | "not_found" => ExitCode::NoInput,
            "cancelled" => ExitCode::Interrupted,
            "plugin" | "internal" => ExitCode::Software,
            _ => ExitCode::Error,
        }
    }

    /// Get human-readable description of exit code
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::UsageError => "Command line usage error",
            ExitCode::DataError => "Data format error",
            ExitCode::NoInput => "Cannot open input",
            ExitCode::Unavailable => "Service unavailable",
            ExitCode::Software => "Internal software error",
            ExitCode::OsError => "System error",
            ExitCode::CantCreate => "Cannot create output file",
            ExitCode::IoError => "I/O error",
            ExitCode::TempFail => "Temporary failure, retry",
            ExitCode::Protocol => "Remote error in protocol",
            ExitCode::NoPerm => "Permission denied",
            ExitCode::Config => "Configuration error",
            ExitCode::Interrupted => "Interrupted by signal (SIGINT)",
            ExitCode::Terminated => "Terminated by signal (SIGTERM)",
        }
    }

    /// Check if this is a success exit code
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Check if this is an error exit code
    pub fn is_error(self) -> bool {
        !self.is_success()
    }

    /// Check if this represents a signal interruption
    pub fn is_signal(self) -> bool {
        matches!(self, ExitCode::Interrupted | ExitCode::Terminated)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

/// Map a result's error (if any) to an exit code
pub fn map_error_to_exit_code<E: std::error::Error>(error: &E) -> ExitCode {
    ExitCode::from_error(error)
}

/// Convert an application `Result` into a process-ready exit code
///
/// On `Err`, logs the error at `error` level before mapping it, so the
/// CLI's top-level `main` does not need to print the error itself.
pub fn result_to_exit_code<T, E: std::error::Error>(result: Result<T, E>) -> std::process::ExitCode {
    match result {
        Ok(_) => ExitCode::Success.into(),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from_error(&e).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Error.as_i32(), 1);
        assert_eq!(ExitCode::UsageError.as_i32(), 64);
        assert_eq!(ExitCode::Config.as_i32(), 78);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
        assert_eq!(ExitCode::Terminated.as_i32(), 143);
    }

    #[test]
    fn test_is_success() {
        assert!(ExitCode::Success.is_success());
        assert!(!ExitCode::Error.is_success());
    }

    #[test]
    fn test_is_signal() {
        assert!(ExitCode::Interrupted.is_signal());
        assert!(ExitCode::Terminated.is_signal());
        assert!(!ExitCode::Success.is_signal());
    }

    #[test]
    fn test_default() {
        assert_eq!(ExitCode::default(), ExitCode::Success);
    }

    #[test]
    fn test_display() {
        let display = format!("{}", ExitCode::UsageError);
        assert!(display.contains("Command line usage error"));
        assert!(display.contains("64"));
    }

    #[test]
    fn test_from_error() {
        use std::io;

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        assert_eq!(ExitCode::from_error(&err), ExitCode::NoPerm);

        let err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        assert_eq!(ExitCode::from_error(&err), ExitCode::NoInput);
    }

    #[test]
    fn test_from_category() {
        assert_eq!(ExitCode::from_category("argument"), ExitCode::UsageError);
        assert_eq!(ExitCode::from_category("token"), ExitCode::NoInput);
        assert_eq!(ExitCode::from_category("cancelled"), ExitCode::Interrupted);
        assert_eq!(ExitCode::from_category("internal"), ExitCode::Software);
        assert_eq!(ExitCode::from_category("something-unknown"), ExitCode::Error);
    }

    #[test]
    fn test_conversion_to_i32() {
        let code: i32 = ExitCode::Config.into();
        assert_eq!(code, 78);
    }

    #[test]
    fn test_result_to_exit_code_success() {
        let result: Result<(), std::io::Error> = Ok(());
        let code = result_to_exit_code(result);
        assert_eq!(code, std::process::ExitCode::SUCCESS);
    }
}
