//! Run parameters and process-wide defaults.

use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;

use crate::path::{PathError, ReplayPath};
use crate::random::fresh_seed;

/// Default number of successful trials required
pub const DEFAULT_NUM_RUNS: usize = 100;
/// Default number of skipped trials tolerated per required run
pub const DEFAULT_MAX_SKIPS_PER_RUN: usize = 100;
/// Default number of accepted shrink steps
pub const DEFAULT_MAX_SHRINK_STEPS: usize = 1000;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid number of runs: {0} (must be > 0)")]
    InvalidNumRuns(usize),

    #[error("Invalid max skips per run: {0} (must be > 0)")]
    InvalidMaxSkipsPerRun(usize),

    #[error("Invalid max shrink steps: {0} (must be > 0)")]
    InvalidMaxShrinkSteps(usize),

    #[error("Invalid time limit (must be > 0)")]
    InvalidTimeLimit,

    #[error("Invalid replay path: {0}")]
    InvalidPath(#[from] PathError),
}

/// How much detail a failure report carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Counterexample and error only
    #[default]
    None,
    /// Also every failing value met while shrinking
    Verbose,
    /// Also the tree of every value tried
    VeryVerbose,
}

/// Parameters of a run. Every field is optional: unset fields fall back to
/// the global configuration, then to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    /// Seed of the run, random when unset
    pub seed: Option<u64>,
    /// Replay path reported by a previous failing run
    pub path: Option<String>,
    /// Number of successful trials required
    pub num_runs: Option<usize>,
    /// Skipped trials tolerated per required run
    pub max_skips_per_run: Option<usize>,
    /// Accepted shrink steps before the search stops
    pub max_shrink_steps: Option<usize>,
    /// Stop at the first failure without shrinking
    pub end_on_failure: Option<bool>,
    /// Detail level of the report
    pub verbose: Option<Verbosity>,
    /// Wall-clock budget of the whole run
    pub interrupt_after_time_limit: Option<Duration>,
    /// Report an interrupted run as failed
    pub mark_interrupt_as_failure: Option<bool>,
    /// Generate without bias
    pub unbiased: Option<bool>,
}

impl Parameters {
    /// Parameters with nothing set
    pub const fn new() -> Self {
        Self {
            seed: None,
            path: None,
            num_runs: None,
            max_skips_per_run: None,
            max_shrink_steps: None,
            end_on_failure: None,
            verbose: None,
            interrupt_after_time_limit: None,
            mark_interrupt_as_failure: None,
            unbiased: None,
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn num_runs(mut self, num_runs: usize) -> Self {
        self.num_runs = Some(num_runs);
        self
    }

    pub fn max_skips_per_run(mut self, max_skips_per_run: usize) -> Self {
        self.max_skips_per_run = Some(max_skips_per_run);
        self
    }

    pub fn max_shrink_steps(mut self, max_shrink_steps: usize) -> Self {
        self.max_shrink_steps = Some(max_shrink_steps);
        self
    }

    pub fn end_on_failure(mut self, end_on_failure: bool) -> Self {
        self.end_on_failure = Some(end_on_failure);
        self
    }

    pub fn verbose(mut self, verbose: Verbosity) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn interrupt_after_time_limit(mut self, limit: Duration) -> Self {
        self.interrupt_after_time_limit = Some(limit);
        self
    }

    pub fn mark_interrupt_as_failure(mut self, mark: bool) -> Self {
        self.mark_interrupt_as_failure = Some(mark);
        self
    }

    pub fn unbiased(mut self, unbiased: bool) -> Self {
        self.unbiased = Some(unbiased);
        self
    }

    /// Fill the unset fields of `self` from `fallback`
    pub fn or(self, fallback: &Parameters) -> Self {
        Self {
            seed: self.seed.or(fallback.seed),
            path: self.path.or_else(|| fallback.path.clone()),
            num_runs: self.num_runs.or(fallback.num_runs),
            max_skips_per_run: self.max_skips_per_run.or(fallback.max_skips_per_run),
            max_shrink_steps: self.max_shrink_steps.or(fallback.max_shrink_steps),
            end_on_failure: self.end_on_failure.or(fallback.end_on_failure),
            verbose: self.verbose.or(fallback.verbose),
            interrupt_after_time_limit: self
                .interrupt_after_time_limit
                .or(fallback.interrupt_after_time_limit),
            mark_interrupt_as_failure: self
                .mark_interrupt_as_failure
                .or(fallback.mark_interrupt_as_failure),
            unbiased: self.unbiased.or(fallback.unbiased),
        }
    }

    /// Check the fields that are set
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(0) = self.num_runs {
            return Err(ConfigError::InvalidNumRuns(0));
        }
        if let Some(0) = self.max_skips_per_run {
            return Err(ConfigError::InvalidMaxSkipsPerRun(0));
        }
        if let Some(0) = self.max_shrink_steps {
            return Err(ConfigError::InvalidMaxShrinkSteps(0));
        }
        if self.interrupt_after_time_limit.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidTimeLimit);
        }
        if let Some(path) = &self.path {
            ReplayPath::parse(path)?;
        }
        Ok(())
    }
}

/// Fully resolved and validated parameters of one run
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedParameters {
    pub seed: u64,
    pub path: Option<ReplayPath>,
    pub num_runs: usize,
    pub max_skips_per_run: usize,
    pub max_shrink_steps: usize,
    pub end_on_failure: bool,
    pub verbose: Verbosity,
    pub interrupt_after_time_limit: Option<Duration>,
    pub mark_interrupt_as_failure: bool,
    pub unbiased: bool,
}

impl QualifiedParameters {
    /// Resolve `local` against the global configuration and the defaults
    pub fn resolve(local: &Parameters) -> Result<Self, ConfigError> {
        let global = read_configure_global();
        Self::resolve_with(local, &global)
    }

    /// Resolve `local` against an explicit fallback
    pub fn resolve_with(local: &Parameters, global: &Parameters) -> Result<Self, ConfigError> {
        let merged = local.clone().or(global);
        merged.validate()?;

        let path = match merged.path.as_deref() {
            Some(encoded) => Some(ReplayPath::parse(encoded)?),
            None => None,
        };
        Ok(Self {
            seed: merged.seed.unwrap_or_else(fresh_seed),
            path,
            num_runs: merged.num_runs.unwrap_or(DEFAULT_NUM_RUNS),
            max_skips_per_run: merged.max_skips_per_run.unwrap_or(DEFAULT_MAX_SKIPS_PER_RUN),
            max_shrink_steps: merged.max_shrink_steps.unwrap_or(DEFAULT_MAX_SHRINK_STEPS),
            end_on_failure: merged.end_on_failure.unwrap_or(false),
            verbose: merged.verbose.unwrap_or_default(),
            interrupt_after_time_limit: merged.interrupt_after_time_limit,
            mark_interrupt_as_failure: merged.mark_interrupt_as_failure.unwrap_or(false),
            unbiased: merged.unbiased.unwrap_or(false),
        })
    }

    /// Total number of skipped trials tolerated over the run
    pub fn max_skips(&self) -> usize {
        self.max_skips_per_run.saturating_mul(self.num_runs)
    }

    /// Bias factor used for trial `run_id`
    pub fn bias_for_run(&self, run_id: usize) -> Option<u32> {
        if self.unbiased {
            return None;
        }
        Some(2 + (run_id + 1).ilog10())
    }
}

static GLOBAL_PARAMETERS: RwLock<Parameters> = parking_lot::const_rwlock(Parameters::new());

/// Replace the process-wide defaults
pub fn configure_global(parameters: Parameters) -> Result<(), ConfigError> {
    parameters.validate()?;
    tracing::debug!(?parameters, "global configuration updated");
    *GLOBAL_PARAMETERS.write() = parameters;
    Ok(())
}

/// Current process-wide defaults
pub fn read_configure_global() -> Parameters {
    GLOBAL_PARAMETERS.read().clone()
}

/// Clear the process-wide defaults
pub fn reset_configure_global() {
    *GLOBAL_PARAMETERS.write() = Parameters::new();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let qualified = QualifiedParameters::resolve_with(&Parameters::new().seed(1), &Parameters::new())
            .expect("valid parameters");
        assert_eq!(qualified.seed, 1);
        assert_eq!(qualified.num_runs, DEFAULT_NUM_RUNS);
        assert_eq!(qualified.max_skips_per_run, DEFAULT_MAX_SKIPS_PER_RUN);
        assert_eq!(qualified.max_shrink_steps, DEFAULT_MAX_SHRINK_STEPS);
        assert_eq!(qualified.verbose, Verbosity::None);
        assert!(!qualified.end_on_failure);
        assert!(!qualified.unbiased);
        assert!(qualified.path.is_none());
    }

    #[test]
    fn test_local_overrides_global() {
        let global = Parameters::new().num_runs(10).seed(3).end_on_failure(true);
        let local = Parameters::new().num_runs(20);
        let qualified = QualifiedParameters::resolve_with(&local, &global).expect("valid");
        assert_eq!(qualified.num_runs, 20);
        assert_eq!(qualified.seed, 3);
        assert!(qualified.end_on_failure);
    }

    #[test]
    fn test_validation_errors() {
        let none = Parameters::new();
        assert_eq!(
            QualifiedParameters::resolve_with(&Parameters::new().num_runs(0), &none),
            Err(ConfigError::InvalidNumRuns(0))
        );
        assert_eq!(
            QualifiedParameters::resolve_with(&Parameters::new().max_skips_per_run(0), &none),
            Err(ConfigError::InvalidMaxSkipsPerRun(0))
        );
        assert_eq!(
            QualifiedParameters::resolve_with(&Parameters::new().max_shrink_steps(0), &none),
            Err(ConfigError::InvalidMaxShrinkSteps(0))
        );
        assert_eq!(
            QualifiedParameters::resolve_with(
                &Parameters::new().interrupt_after_time_limit(Duration::ZERO),
                &none
            ),
            Err(ConfigError::InvalidTimeLimit)
        );
        assert!(matches!(
            QualifiedParameters::resolve_with(&Parameters::new().path("+x"), &none),
            Err(ConfigError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_path_is_parsed() {
        let qualified =
            QualifiedParameters::resolve_with(&Parameters::new().path("3-+"), &Parameters::new())
                .expect("valid");
        assert_eq!(qualified.path.map(|p| p.len()), Some(4));
    }

    #[test]
    fn test_bias_for_run() {
        let mut qualified =
            QualifiedParameters::resolve_with(&Parameters::new().seed(0), &Parameters::new())
                .expect("valid");
        assert_eq!(qualified.bias_for_run(0), Some(2));
        assert_eq!(qualified.bias_for_run(8), Some(2));
        assert_eq!(qualified.bias_for_run(9), Some(3));
        assert_eq!(qualified.bias_for_run(99), Some(4));
        qualified.unbiased = true;
        assert_eq!(qualified.bias_for_run(50), None);
    }

    #[test]
    fn test_max_skips() {
        let qualified = QualifiedParameters::resolve_with(
            &Parameters::new().num_runs(5).max_skips_per_run(3),
            &Parameters::new(),
        )
        .expect("valid");
        assert_eq!(qualified.max_skips(), 15);
    }
}
