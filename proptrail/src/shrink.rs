//! Shrinking functionality for minimizing failing test cases.

use std::time::{Duration, Instant};

use crate::arbitrary::Arbitrary;
use crate::stream::Shrinks;
use crate::value::Value;

/// Result of a standalone shrinking operation
#[derive(Debug, Clone)]
pub struct ShrinkResult<T> {
    /// Original value that failed
    pub original: T,
    /// Minimal value that still fails
    pub minimal: T,
    /// Number of accepted shrinking steps
    pub shrink_steps: usize,
    /// Number of candidates evaluated
    pub candidates_tried: usize,
    /// Time spent shrinking
    pub shrink_duration: Duration,
    /// Whether shrinking ran out of candidates instead of hitting a limit
    pub completed: bool,
}

/// Configuration for shrinking behavior
#[derive(Debug, Clone)]
pub struct ShrinkConfig {
    /// Maximum number of accepted shrinking steps
    pub max_steps: usize,
    /// Optional wall-clock limit for the whole search
    pub timeout: Option<Duration>,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            timeout: None,
        }
    }
}

impl ShrinkConfig {
    /// Create a shrink configuration with custom max steps
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            max_steps,
            ..Default::default()
        }
    }

    /// Create a shrink configuration with a timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }
}

/// Incremental greedy depth-first walk over the shrink tree.
///
/// The caller pulls candidates with [`ShrinkSearch::next_candidate`], runs
/// them, and calls [`ShrinkSearch::descend`] with the first one that still
/// fails. Candidates that pass are simply not reported back.
pub struct ShrinkSearch<T> {
    current: Value<T>,
    candidates: Shrinks<T>,
    steps: usize,
    max_steps: usize,
}

impl<T: Clone + 'static> ShrinkSearch<T> {
    /// Start a search from a failing value and its shrink stream
    pub fn new(start: Value<T>, candidates: Shrinks<T>, max_steps: usize) -> Self {
        Self {
            current: start,
            candidates,
            steps: 0,
            max_steps,
        }
    }

    /// Next candidate to evaluate, `None` once the stream or the step budget
    /// is exhausted
    pub fn next_candidate(&mut self) -> Option<Value<T>> {
        if self.budget_exhausted() {
            return None;
        }
        self.candidates.next()
    }

    /// Make `candidate` the new current value and explore its own stream
    pub fn descend(&mut self, candidate: Value<T>, candidates: Shrinks<T>) {
        self.current = candidate;
        self.candidates = candidates;
        self.steps += 1;
    }

    /// Current smallest failing value
    pub fn current(&self) -> &Value<T> {
        &self.current
    }

    /// Number of accepted descents so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Whether the step budget stops the search
    pub fn budget_exhausted(&self) -> bool {
        self.steps >= self.max_steps
    }

    /// Consume the search and return the current value
    pub fn into_current(self) -> Value<T> {
        self.current
    }
}

/// Shrinking engine minimizing a failing value against a plain predicate
pub struct ShrinkEngine {
    config: ShrinkConfig,
}

impl ShrinkEngine {
    /// Create a new shrinking engine with default configuration
    pub fn new() -> Self {
        Self {
            config: ShrinkConfig::default(),
        }
    }

    /// Create a new shrinking engine with custom configuration
    pub fn with_config(config: ShrinkConfig) -> Self {
        Self { config }
    }

    /// Shrink `failing` using `arbitrary`'s shrinker.
    ///
    /// `still_fails` returns `true` when a candidate reproduces the failure.
    /// `failing` itself is assumed to fail and is not re-evaluated.
    pub fn minimize<A, F>(
        &self,
        arbitrary: &A,
        failing: Value<A::Value>,
        mut still_fails: F,
    ) -> ShrinkResult<A::Value>
    where
        A: Arbitrary,
        F: FnMut(&A::Value) -> bool,
    {
        let start_time = Instant::now();
        let original = failing.value_unchecked().clone();
        let stream = arbitrary.shrink(failing.value_unchecked(), failing.context());
        let mut search = ShrinkSearch::new(failing, stream, self.config.max_steps);
        let mut candidates_tried = 0;
        let mut timed_out = false;

        while let Some(candidate) = search.next_candidate() {
            if let Some(timeout) = self.config.timeout
                && start_time.elapsed() >= timeout
            {
                timed_out = true;
                break;
            }

            candidates_tried += 1;
            if still_fails(candidate.value_unchecked()) {
                let next = arbitrary.shrink(candidate.value_unchecked(), candidate.context());
                search.descend(candidate, next);
                tracing::trace!(step = search.steps(), "shrink step accepted");
            }
        }

        let completed = !timed_out && !search.budget_exhausted();
        let shrink_steps = search.steps();
        ShrinkResult {
            original,
            minimal: search.into_current().into_parts().0,
            shrink_steps,
            candidates_tried,
            shrink_duration: start_time.elapsed(),
            completed,
        }
    }
}

impl Default for ShrinkEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Shrinking helpers shared by the numeric and collection arbitraries
pub mod strategies {
    /// Halve a non-negative magnitude, rounding down
    fn halve(n: i128) -> i128 {
        n / 2
    }

    /// Candidates moving `current` toward `target` by successive halving.
    ///
    /// Each item is `(candidate, previous)` where `previous` is the last
    /// candidate yielded before it (or the known-passing `target` when
    /// `try_target_asap` is false). It is the lower bound a later shrink of
    /// that candidate can safely aim at.
    ///
    /// With `try_target_asap` the target itself comes first; without it the
    /// first candidate sits halfway between target and current.
    pub fn shrink_integer(
        current: i128,
        target: i128,
        try_target_asap: bool,
    ) -> impl Iterator<Item = (i128, Option<i128>)> {
        let real_gap = (current - target).abs();
        let direction: i128 = if current >= target { 1 } else { -1 };
        let mut previous = if try_target_asap { None } else { Some(target) };
        let mut to_remove = if try_target_asap {
            real_gap
        } else {
            halve(real_gap)
        };

        std::iter::from_fn(move || {
            if to_remove <= 0 {
                return None;
            }
            let next = if to_remove == real_gap {
                target
            } else {
                current - direction * to_remove
            };
            let item = (next, previous);
            previous = Some(next);
            to_remove = halve(to_remove);
            Some(item)
        })
    }

    /// Default shrink target of an integer range: zero when in range,
    /// otherwise the bound closest to zero
    pub fn default_target(min: i128, max: i128) -> i128 {
        if min <= 0 && max >= 0 {
            0
        } else if min > 0 {
            min
        } else {
            max
        }
    }

    /// `floor(log2(v))` for positive `v`, zero otherwise
    pub fn integer_log_like(v: i128) -> i128 {
        if v <= 0 {
            0
        } else {
            (127 - v.leading_zeros()) as i128
        }
    }

    /// Sub-ranges of `[min, max]` that generation favours when biased.
    ///
    /// The first range has the highest priority.
    pub fn bias_numeric_range(min: i128, max: i128) -> Vec<(i128, i128)> {
        if min == max {
            return vec![(min, max)];
        }
        if min < 0 && max > 0 {
            let log_min = integer_log_like(-min);
            let log_max = integer_log_like(max);
            return vec![
                (-log_min, log_max),
                (max - log_max, max),
                (min, min + log_min),
            ];
        }
        let log_gap = integer_log_like(max - min);
        let close_to_min = (min, min + log_gap);
        let close_to_max = (max - log_gap, max);
        if min < 0 {
            vec![close_to_max, close_to_min]
        } else {
            vec![close_to_min, close_to_max]
        }
    }
}
