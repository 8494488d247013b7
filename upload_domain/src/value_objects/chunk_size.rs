//! # Chunk-Size Adjuster (C2)
//!
//! Adapts the size of the *next* chunk plan from the observed upload time
//! of the most recently completed chunk. Modeled closely on the reference
//! `ChunkSize` value object's validated-construction discipline, but
//! carries the adaptive state (`current`) and the AIMD-style `adjust`
//! contract instead of being a bare wrapper around a byte count.

use crate::error::UploadError;

/// Hard floor for any negotiated or adjusted chunk size: 256 KiB.
pub const MIN_SIZE: usize = 256 * 1024;

/// Hard ceiling for any negotiated or adjusted chunk size: 10 MiB.
pub const MAX_SIZE: usize = 10 * 1024 * 1024;

/// Default initial chunk size: 1 MiB.
pub const DEFAULT_INITIAL_SIZE: usize = 1024 * 1024;

/// Default target per-chunk upload time: 3000 ms.
pub const DEFAULT_TARGET_TIME_MS: u64 = 3000;

/// Stateful, non-thread-safe chunk-size controller.
///
/// A task owns exactly one instance. `adjust` is the sole mutator; `reset`
/// restores `initial_size`. The invariant `min_size <= current <=
/// max_size` holds for the lifetime of the value — every path that could
/// violate it is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSizeAdjuster {
    initial_size: usize,
    min_size: usize,
    max_size: usize,
    target_time_ms: u64,
    current: usize,
}

impl ChunkSizeAdjuster {
    /// Builds a new adjuster, validating the configuration.
    ///
    /// # Errors
    /// - `min_size > max_size`
    /// - `initial_size` outside `[min_size, max_size]`
    /// - `target_time_ms == 0`
    pub fn new(
        initial_size: usize,
        min_size: usize,
        max_size: usize,
        target_time_ms: u64,
    ) -> Result<Self, UploadError> {
        if min_size > max_size {
            return Err(UploadError::invalid_argument(format!(
                "min_size ({min_size}) must be <= max_size ({max_size})"
            )));
        }
        if initial_size < min_size || initial_size > max_size {
            return Err(UploadError::invalid_argument(format!(
                "initial_size ({initial_size}) must lie within [{min_size}, {max_size}]"
            )));
        }
        if target_time_ms == 0 {
            return Err(UploadError::invalid_argument("target_time_ms must be > 0"));
        }
        Ok(Self {
            initial_size,
            min_size,
            max_size,
            target_time_ms,
            current: initial_size,
        })
    }

    /// Builds an adjuster using the platform defaults.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_INITIAL_SIZE, MIN_SIZE, MAX_SIZE, DEFAULT_TARGET_TIME_MS)
            .expect("platform defaults are always internally consistent")
    }

    /// The currently active chunk size, in bytes.
    pub fn current_size(&self) -> usize {
        self.current
    }

    /// Restores the adjuster to its `initial_size`.
    pub fn reset(&mut self) {
        self.current = self.initial_size;
    }

    /// Feeds the observed upload time (milliseconds) of the most recent
    /// chunk, returning the new current size.
    ///
    /// - `upload_time_ms < 0.5 * target`: doubles, capped at `max_size`.
    /// - `upload_time_ms > 1.5 * target`: halves, floored at `min_size`.
    /// - otherwise: unchanged.
    pub fn adjust(&mut self, upload_time_ms: u64) -> usize {
        let target = self.target_time_ms as f64;
        let observed = upload_time_ms as f64;

        if observed < 0.5 * target {
            self.current = (self.current.saturating_mul(2)).min(self.max_size);
        } else if observed > 1.5 * target {
            self.current = (self.current / 2).max(self.min_size);
        }
        self.current
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn target_time_ms(&self) -> u64 {
        self.target_time_ms
    }
}

impl Default for ChunkSizeAdjuster {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_min_greater_than_max() {
        assert!(ChunkSizeAdjuster::new(1024, 2048, 1024, 3000).is_err());
    }

    #[test]
    fn rejects_initial_outside_bounds() {
        assert!(ChunkSizeAdjuster::new(100, 256, 1024, 3000).is_err());
        assert!(ChunkSizeAdjuster::new(2000, 256, 1024, 3000).is_err());
    }

    #[test]
    fn rejects_zero_target_time() {
        assert!(ChunkSizeAdjuster::new(512, 256, 1024, 0).is_err());
    }

    #[test]
    fn fast_upload_doubles_up_to_max() {
        let mut a = ChunkSizeAdjuster::new(256, 256, 2048, 1000).unwrap();
        assert_eq!(a.adjust(100), 512);
        assert_eq!(a.adjust(100), 1024);
        assert_eq!(a.adjust(100), 2048);
        // already at max: stays capped
        assert_eq!(a.adjust(100), 2048);
    }

    #[test]
    fn slow_upload_halves_down_to_min() {
        let mut a = ChunkSizeAdjuster::new(2048, 256, 2048, 1000).unwrap();
        assert_eq!(a.adjust(2000), 1024);
        assert_eq!(a.adjust(2000), 512);
        assert_eq!(a.adjust(2000), 256);
        // already at min: stays floored
        assert_eq!(a.adjust(2000), 256);
    }

    #[test]
    fn in_band_upload_leaves_size_unchanged() {
        let mut a = ChunkSizeAdjuster::new(1024, 256, 2048, 1000).unwrap();
        assert_eq!(a.adjust(1000), 1024);
        assert_eq!(a.adjust(1499), 1024);
        assert_eq!(a.adjust(501), 1024);
    }

    #[test]
    fn reset_restores_initial_size() {
        let mut a = ChunkSizeAdjuster::new(1024, 256, 2048, 1000).unwrap();
        a.adjust(100);
        assert_ne!(a.current_size(), 1024);
        a.reset();
        assert_eq!(a.current_size(), 1024);
    }

    #[test]
    fn bounds_hold_under_any_sequence() {
        let mut a = ChunkSizeAdjuster::new(1024, 256, 4096, 1000).unwrap();
        let sequence = [50, 2000, 50, 50, 2000, 2000, 1000, 50, 2000];
        for t in sequence {
            let size = a.adjust(t);
            assert!(size >= a.min_size() && size <= a.max_size());
        }
    }
}
