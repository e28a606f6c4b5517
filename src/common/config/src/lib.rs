//! Configuration management for Veld.
//!
//! Provides runtime configuration for the execution engine.

use serde::{Deserialize, Serialize};

/// Global Veld configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VeldConfig {
    /// Execution configuration.
    pub execution: ExecutionConfig,
}

/// Event-loop execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of processing slots. `1` selects sequential execution,
    /// `0` selects one slot per available CPU.
    pub parallelism: usize,
    /// Rows per task. `0` lets the engine pick a granularity.
    pub chunk_rows: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallelism: 1,
            chunk_rows: 0,
        }
    }
}

impl ExecutionConfig {
    /// Set the number of processing slots.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set the task granularity in rows.
    pub fn with_chunk_rows(mut self, chunk_rows: u64) -> Self {
        self.chunk_rows = chunk_rows;
        self
    }

    /// Whether multi-slot execution is selected.
    pub fn is_parallel(&self) -> bool {
        self.parallelism != 1
    }

    /// Resolve the slot count, expanding `0` to the available CPUs.
    pub fn resolved_slots(&self) -> usize {
        if self.parallelism == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(1)
        } else {
            self.parallelism
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sequential() {
        let config = ExecutionConfig::default();
        assert!(!config.is_parallel());
        assert_eq!(config.resolved_slots(), 1);
    }

    #[test]
    fn test_builders() {
        let config = ExecutionConfig::default()
            .with_parallelism(4)
            .with_chunk_rows(1024);
        assert!(config.is_parallel());
        assert_eq!(config.resolved_slots(), 4);
        assert_eq!(config.chunk_rows, 1024);
    }

    #[test]
    fn test_zero_parallelism_uses_all_cpus() {
        let config = ExecutionConfig::default().with_parallelism(0);
        assert!(config.is_parallel());
        assert!(config.resolved_slots() >= 1);
    }
}
