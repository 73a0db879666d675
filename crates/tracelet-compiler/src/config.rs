//! Compiler configuration.

use serde::{Deserialize, Serialize};
use tracelet_core::StackMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound for `str()` and `path()` results, in bytes.
    pub max_strlen: usize,
    /// Stack mode used by the `kstack`/`ustack` builtins.
    pub stack_mode: StackMode,
    /// Resolution rounds before giving up with `Error::RoundLimitExceeded`.
    pub max_rounds: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_strlen: 64,
            stack_mode: StackMode::Raw,
            max_rounds: 50,
        }
    }
}

impl Config {
    pub fn with_max_strlen(mut self, max_strlen: usize) -> Self {
        self.max_strlen = max_strlen;
        self
    }

    pub fn with_stack_mode(mut self, stack_mode: StackMode) -> Self {
        self.stack_mode = stack_mode;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Largest payload a `buf()` call may carry; one byte holds the length.
    pub fn max_buffer_size(&self) -> usize {
        self.max_strlen.saturating_sub(1)
    }
}
