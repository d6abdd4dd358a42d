//! Module: config
//! Responsibility: per-statement limits for range construction and key layout.
//! Does not own: enforcement, which lives in the arena and key descriptor.
//! Boundary: callers build one `RangeConfig` per statement and thread it down.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Default cap on range nodes allocated by clone/combination per statement.
pub const DEFAULT_MAX_SEL_ARGS: usize = 16_000;

/// Default maximum number of key parts in one composite index key.
pub const DEFAULT_MAX_KEY_PARTS: usize = 16;

/// Default maximum packed length of one index key, in bytes.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 4096;

///
/// RangeConfig
///
/// Limit policy for one statement's range analysis.
/// Limits stay policy-owned at the statement boundary instead of inside the
/// tree, so two statements never share or race on a counter.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct RangeConfig {
    pub max_sel_args: usize,
    pub max_key_parts: usize,
    pub max_key_length: usize,
}

impl RangeConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_sel_args: DEFAULT_MAX_SEL_ARGS,
            max_key_parts: DEFAULT_MAX_KEY_PARTS,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }

    #[must_use]
    pub const fn with_max_sel_args(mut self, max_sel_args: usize) -> Self {
        self.max_sel_args = max_sel_args;
        self
    }

    /// Reject limits that would make every range analysis fail.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sel_args == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_sel_args",
            });
        }
        if self.max_key_parts == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_key_parts",
            });
        }
        if self.max_key_length == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_key_length",
            });
        }

        Ok(())
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self::new()
    }
}

///
/// ConfigError
///
/// Rejected limit policy or key layout.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("config limit '{field}' must be non-zero")]
    ZeroLimit { field: &'static str },

    #[error("index key has no parts")]
    EmptyKey,

    #[error("index key has {parts} parts, limit is {max}")]
    TooManyParts { parts: usize, max: usize },

    #[error("index key store length {length} exceeds limit {max}")]
    KeyTooLong { length: usize, max: usize },

    #[error("key part {part} has zero width")]
    ZeroWidthPart { part: usize },
}

///
/// TESTS
///
