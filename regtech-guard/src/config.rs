//! Engine configuration.
//!
//! Everything is plain data with builder-style setters and a few presets, in
//! the same shape as [`crate::logging::LogConfig`].

use crate::error::{GuardError, Result};
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};

/// When to stop a run after a structural phase.
///
/// After each structural phase that is not the last one, the engine computes
/// for every non-nullable field the fraction of records on which the field
/// was marked unusable. If any fraction reaches `unusable_threshold`, the
/// run halts and the remaining phases never execute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HaltPolicy {
    /// Fraction in `(0, 1]` at which a required field blocks later phases
    pub unusable_threshold: f64,
}

impl Default for HaltPolicy {
    fn default() -> Self {
        Self {
            unusable_threshold: 1.0,
        }
    }
}

impl HaltPolicy {
    /// Halts only when a required field is unusable on every record.
    pub fn all_records() -> Self {
        Self::default()
    }

    /// Halts when a required field is unusable on at least `fraction` of
    /// the records.
    pub fn threshold(fraction: f64) -> Self {
        Self {
            unusable_threshold: fraction,
        }
    }

    /// Never halts.
    pub fn never() -> Self {
        Self {
            unusable_threshold: f64::INFINITY,
        }
    }

    /// Validates the threshold.
    pub fn validate(&self) -> Result<()> {
        let t = self.unusable_threshold;
        if t.is_nan() || t <= 0.0 || (t.is_finite() && t > 1.0) {
            return Err(GuardError::Configuration(format!(
                "unusable_threshold must be in (0, 1], got {t}"
            )));
        }
        Ok(())
    }

    /// Returns true if `unusable` of `total` records reaches the threshold.
    /// Empty datasets never halt.
    pub fn should_halt(&self, unusable: usize, total: usize) -> bool {
        if total == 0 || unusable == 0 {
            return false;
        }
        unusable as f64 / total as f64 >= self.unusable_threshold
    }
}

/// Which members of a duplicate group are reported by uniqueness checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every record of a group of two or more
    #[default]
    FlagAll,
    /// Every record except the first occurrence
    AllButFirst,
}

/// Configuration for [`crate::core::ValidationEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker threads used for field checks (1 = sequential)
    pub workers: usize,
    /// Records below which field checks always run on the calling thread
    pub parallel_threshold: usize,
    /// Halting rule applied after structural phases
    pub halt_policy: HaltPolicy,
    /// Logging behaviour
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            parallel_threshold: 1024,
            halt_policy: HaltPolicy::default(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Single-threaded evaluation.
    pub fn sequential() -> Self {
        Self::default()
    }

    /// One worker per available CPU.
    pub fn parallel() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            ..Self::default()
        }
    }

    /// Sets the worker count. Zero means one worker per CPU.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 {
            num_cpus::get().max(1)
        } else {
            workers
        };
        self
    }

    /// Sets the record count below which field checks are not split across
    /// workers.
    pub fn with_parallel_threshold(mut self, records: usize) -> Self {
        self.parallel_threshold = records;
        self
    }

    /// Sets the halting rule.
    pub fn with_halt_policy(mut self, policy: HaltPolicy) -> Self {
        self.halt_policy = policy;
        self
    }

    /// Sets the logging behaviour.
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(GuardError::Configuration(
                "workers must be at least 1".to_string(),
            ));
        }
        self.halt_policy.validate()
    }
}
