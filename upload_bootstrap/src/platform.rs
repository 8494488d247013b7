//! # Platform Abstraction Module
//!
//! Provides platform-specific abstractions for operating system
//! functionality needed by the bootstrap layer.
//!
//! ## Architecture Pattern
//!
//! Following hexagonal architecture principles:
//! - **Interface**: `Platform` trait defines the contract
//! - **Implementations**:
//!   - `UnixPlatform`: POSIX implementation (Linux + macOS)
//!   - `WindowsPlatform`: Windows API implementation
//! - **Selection**: Compile-time platform selection via `#[cfg]`
//!
//! ## Design Philosophy
//!
//! The bootstrap module sits OUTSIDE the enterprise application layers, so
//! it can access platform-specific APIs directly. This abstraction:
//!
//! 1. **Isolates** OS-specific code to one module
//! 2. **Enables** testing via trait mocking
//! 3. **Provides** consistent API across platforms
//! 4. **Avoids** scattered conditional compilation
//!
//! ## Usage
//!
//! ```rust
//! use upload_bootstrap::platform::create_platform;
//!
//! let platform = create_platform();
//! println!("Running on: {}", platform.platform_name());
//! println!("CPU cores: {}", platform.cpu_count());
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;

#[cfg(windows)]
pub use windows::WindowsPlatform;

/// Platform-specific errors
#[derive(Debug, Error)]
pub enum PlatformError {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Feature not supported on this platform
    #[error("Not supported on this platform: {0}")]
    NotSupported(String),

    /// Generic platform error
    #[error("Platform error: {0}")]
    Other(String),
}

/// Platform abstraction trait for OS-specific operations
///
/// Allows the bootstrap layer to work with different operating systems
/// without conditional compilation scattered through the rest of the
/// codebase. Used mainly to choose I/O concurrency defaults (`cpu_count`)
/// and to `fsync` written chunks/objects (`sync_file`) the same way on
/// every platform the client or server runs on.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Get the number of available CPU cores
    ///
    /// Used as the default upper bound for `ConcurrencyLimiter` when the
    /// caller did not specify an explicit concurrency level.
    fn cpu_count(&self) -> usize;

    /// Get the platform-specific temporary directory
    fn temp_dir(&self) -> PathBuf;

    /// Get the platform name ("linux", "macos", "windows", ...)
    fn platform_name(&self) -> &'static str;

    /// Check if a path points to an executable file
    fn is_executable(&self, path: &Path) -> bool;

    /// Flush file buffers to disk
    ///
    /// Used by the blob store after writing a chunk and before renaming it
    /// into place, so a crash never leaves a partially-flushed object
    /// addressable under its content hash.
    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError>;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

/// Create the platform-specific implementation
///
/// Returns the appropriate platform implementation for the current
/// operating system, selected at compile time.
pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_platform() {
        let platform = create_platform();

        assert!(platform.cpu_count() >= 1);
        assert!(!platform.platform_name().is_empty());
    }

    #[test]
    fn test_temp_dir_exists() {
        let platform = create_platform();
        assert!(platform.temp_dir().exists());
    }
}
