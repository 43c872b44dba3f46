//! Property execution engine for running synchronous and asynchronous properties.
//!
//! Both flavours drive the same [`RunnerIterator`]: it hands out the next
//! input to test, is told how the predicate reacted, and decides what to try
//! next (another trial, a shrink candidate, or nothing).

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use crate::arbitrary::Arbitrary;
use crate::config::{ConfigError, Parameters, QualifiedParameters, Verbosity};
use crate::error::{PropertyError, panic_message};
use crate::path::{Decision, PathError, ReplayPath, ReplayPlan};
use crate::property::{AsyncProperty, Outcome, PreconditionFailure, Property, PropertyCore};
use crate::random::Random;
use crate::shrink::ShrinkSearch;
use crate::stream::Shrinks;
use crate::test_runner::format_run_details;
use crate::value::Value;

/// How a tested value fared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Skipped,
    Failure,
}

/// One tested value and the shrink candidates tried from it
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionTree<T> {
    pub status: ExecutionStatus,
    pub value: T,
    pub children: Vec<ExecutionTree<T>>,
}

/// Outcome of a whole `check`
#[derive(Debug, Clone)]
pub struct RunDetails<T> {
    /// Whether the property failed
    pub failed: bool,
    /// Whether the time limit stopped the run
    pub interrupted: bool,
    /// Trials executed, skipped ones excluded
    pub num_runs: usize,
    /// Trials rejected by a precondition
    pub num_skips: usize,
    /// Accepted shrink steps
    pub num_shrinks: usize,
    pub seed: u64,
    /// Smallest failing input found
    pub counterexample: Option<T>,
    /// Path replaying `counterexample` together with `seed`
    pub counterexample_path: Option<String>,
    pub error: Option<PropertyError>,
    /// Every failing input met, filled from [`Verbosity::Verbose`] on
    pub failures: Vec<T>,
    /// Every input tried, filled with [`Verbosity::VeryVerbose`]
    pub execution_summary: Vec<ExecutionTree<T>>,
    pub verbose: Verbosity,
    /// Resolved parameters, `None` when they were invalid
    pub run_configuration: Option<QualifiedParameters>,
}

impl<T: fmt::Debug> RunDetails<T> {
    /// Human readable summary, the message of [`assert`]
    pub fn report(&self) -> String {
        format_run_details(self)
    }
}

impl<T> RunDetails<T> {
    fn invalid(seed: Option<u64>, error: ConfigError) -> Self {
        Self {
            failed: true,
            interrupted: false,
            num_runs: 0,
            num_skips: 0,
            num_shrinks: 0,
            seed: seed.unwrap_or_default(),
            counterexample: None,
            counterexample_path: None,
            error: Some(error.into()),
            failures: Vec::new(),
            execution_summary: Vec::new(),
            verbose: Verbosity::None,
            run_configuration: None,
        }
    }
}

/// Why a guarded call did not return
enum Aborted {
    Rejected,
    Panicked(String),
}

fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, Aborted> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        if payload.is::<PreconditionFailure>() {
            Aborted::Rejected
        } else {
            Aborted::Panicked(panic_message(payload.as_ref()))
        }
    })
}

/// Shrink stream of `value`, empty when building it was rejected. `Err`
/// carries the panic message of a broken arbitrary.
fn shrink_guarded<P: PropertyCore>(
    property: &P,
    value: &Value<P::Input>,
) -> Result<Shrinks<P::Input>, String> {
    match guarded(|| property.shrink(value)) {
        Ok(candidates) => Ok(candidates),
        Err(Aborted::Rejected) => Ok(Shrinks::nil()),
        Err(Aborted::Panicked(message)) => Err(message),
    }
}

enum Phase<T> {
    Trials,
    /// Value selected by a replay path, `None` once handed out
    Replay(Option<Value<T>>),
    Shrinking(ShrinkSearch<T>),
    Done,
}

enum TrialStep<T> {
    Value(Value<T>),
    Skipped,
    Finished,
    Broken(String),
}

/// Records the execution tree when asked to
struct SummaryRecorder<T> {
    enabled: bool,
    roots: Vec<ExecutionTree<T>>,
    cursor: Vec<usize>,
}

impl<T: Clone> SummaryRecorder<T> {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            roots: Vec::new(),
            cursor: Vec::new(),
        }
    }

    fn children(&mut self) -> &mut Vec<ExecutionTree<T>> {
        let mut children = &mut self.roots;
        for &index in &self.cursor {
            children = &mut children[index].children;
        }
        children
    }

    /// Add a node under the current failing value, or at the root
    fn record(&mut self, value: &T, status: ExecutionStatus) {
        if !self.enabled {
            return;
        }
        let children = self.children();
        children.push(ExecutionTree {
            status,
            value: value.clone(),
            children: Vec::new(),
        });
        if status == ExecutionStatus::Failure {
            let index = children.len() - 1;
            self.cursor.push(index);
        }
    }
}

/// Runner state machine shared by [`check`] and [`check_async`]
pub(crate) struct RunnerIterator<'a, P: PropertyCore> {
    property: &'a P,
    params: QualifiedParameters,
    rng: Random,
    examples: VecDeque<Value<P::Input>>,
    phase: Phase<P::Input>,
    pending: Option<Value<P::Input>>,
    started: Instant,
    trial_index: usize,
    num_runs: usize,
    num_skips: usize,
    num_shrinks: usize,
    path: ReplayPath,
    replayed_path: Option<ReplayPath>,
    failed: bool,
    interrupted: bool,
    error: Option<PropertyError>,
    counterexample: Option<Value<P::Input>>,
    failures: Vec<P::Input>,
    summary: SummaryRecorder<P::Input>,
}

impl<'a, P: PropertyCore> RunnerIterator<'a, P> {
    pub(crate) fn new(property: &'a P, params: QualifiedParameters) -> Self {
        tracing::debug!(
            seed = params.seed,
            num_runs = params.num_runs,
            replay = params.path.is_some(),
            "starting property run"
        );
        let summary = SummaryRecorder::new(params.verbose >= Verbosity::VeryVerbose);
        let mut runner = Self {
            property,
            rng: Random::new(params.seed),
            examples: property.examples().into(),
            phase: Phase::Trials,
            pending: None,
            started: Instant::now(),
            trial_index: 0,
            num_runs: 0,
            num_skips: 0,
            num_shrinks: 0,
            path: ReplayPath::new(),
            replayed_path: None,
            failed: false,
            interrupted: false,
            error: None,
            counterexample: None,
            failures: Vec::new(),
            summary,
            params,
        };
        if let Some(path) = runner.params.path.clone() {
            runner.start_replay(path);
        }
        runner
    }

    /// Next input to run the predicate against, `None` once the run is over
    pub(crate) fn next_value(&mut self) -> Option<P::Input> {
        if self.pending.is_some() {
            return None;
        }
        loop {
            if self.time_limit_reached() {
                self.interrupt();
                return None;
            }
            match &mut self.phase {
                Phase::Done => return None,
                Phase::Replay(selected) => {
                    let value = selected.take()?;
                    return Some(self.offer(value));
                }
                Phase::Trials => match self.next_trial() {
                    TrialStep::Value(value) => return Some(self.offer(value)),
                    TrialStep::Skipped => continue,
                    TrialStep::Finished => {
                        self.phase = Phase::Done;
                        return None;
                    }
                    TrialStep::Broken(message) => {
                        self.fail_arbitrary(message);
                        return None;
                    }
                },
                Phase::Shrinking(search) => match guarded(|| search.next_candidate()) {
                    Ok(Some(candidate)) => return Some(self.offer(candidate)),
                    // only this candidate is lost, the stream goes on
                    Err(Aborted::Rejected) => continue,
                    Ok(None) => {
                        self.stop_shrinking();
                        return None;
                    }
                    Err(Aborted::Panicked(message)) => {
                        self.fail_arbitrary(message);
                        return None;
                    }
                },
            }
        }
    }

    /// Report how the predicate reacted to the last value handed out
    pub(crate) fn handle_outcome(&mut self, outcome: Outcome) {
        let Some(value) = self.pending.take() else {
            return;
        };
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Trials => self.trial_outcome(value, outcome),
            Phase::Replay(_) => self.replay_outcome(value, outcome),
            Phase::Shrinking(search) => self.candidate_outcome(search, value, outcome),
            Phase::Done => {}
        }
    }

    pub(crate) fn into_details(mut self) -> RunDetails<P::Input> {
        if matches!(self.phase, Phase::Shrinking(_)) {
            self.stop_shrinking();
        }
        let counterexample_path = match (&self.counterexample, &self.replayed_path) {
            (None, _) => None,
            (Some(_), Some(replayed)) => Some(replayed.stringify()),
            (Some(_), None) => Some(self.path.stringify()),
        };
        if self.failed {
            tracing::info!(
                seed = self.params.seed,
                path = counterexample_path.as_deref().unwrap_or(""),
                num_runs = self.num_runs,
                num_shrinks = self.num_shrinks,
                error = ?self.error,
                "property failed"
            );
        }
        RunDetails {
            failed: self.failed,
            interrupted: self.interrupted,
            num_runs: self.num_runs,
            num_skips: self.num_skips,
            num_shrinks: self.num_shrinks,
            seed: self.params.seed,
            counterexample: self.counterexample.map(|value| value.into_parts().0),
            counterexample_path,
            error: self.error,
            failures: self.failures,
            execution_summary: self.summary.roots,
            verbose: self.params.verbose,
            run_configuration: Some(self.params),
        }
    }

    fn offer(&mut self, value: Value<P::Input>) -> P::Input {
        let input = value.value().into_owned();
        self.pending = Some(value);
        input
    }

    fn time_limit_reached(&self) -> bool {
        let Some(limit) = self.params.interrupt_after_time_limit else {
            return false;
        };
        matches!(self.phase, Phase::Trials | Phase::Shrinking(_)) && self.started.elapsed() >= limit
    }

    fn interrupt(&mut self) {
        let elapsed = self.started.elapsed();
        tracing::warn!(?elapsed, "property run interrupted by its time limit");
        self.interrupted = true;
        if matches!(self.phase, Phase::Shrinking(_)) {
            // the failure stands, only the search stops early
            self.stop_shrinking();
            return;
        }
        self.phase = Phase::Done;
        if self.params.mark_interrupt_as_failure {
            self.failed = true;
            self.error = Some(PropertyError::Interrupted { elapsed });
        }
    }

    fn next_trial(&mut self) -> TrialStep<P::Input> {
        if let Some(example) = self.examples.pop_front() {
            return TrialStep::Value(example);
        }
        if self.num_runs >= self.params.num_runs {
            return TrialStep::Finished;
        }
        let mut trial_rng = self.rng.split();
        let bias = self.params.bias_for_run(self.trial_index);
        let property = self.property;
        match guarded(|| {
            let value = property.generate(&mut trial_rng, bias);
            let orphan = cfg!(debug_assertions)
                && value.context().is_none()
                && !property.can_shrink_without_context(value.value_unchecked());
            (value, orphan)
        }) {
            Ok((value, false)) => TrialStep::Value(value),
            // nothing could ever shrink it
            Ok((value, true)) => TrialStep::Broken(format!(
                "generated {:?} without a context, yet can_shrink_without_context rejects it",
                value.value_unchecked()
            )),
            Err(Aborted::Rejected) => {
                self.path.push(Decision::Skip);
                self.trial_index += 1;
                if self.record_skip() {
                    TrialStep::Skipped
                } else {
                    TrialStep::Finished
                }
            }
            Err(Aborted::Panicked(message)) => TrialStep::Broken(message),
        }
    }

    /// Count a skipped trial, `false` once the skip budget is exceeded
    fn record_skip(&mut self) -> bool {
        self.num_skips += 1;
        let max_skips = self.params.max_skips();
        if self.num_skips <= max_skips {
            return true;
        }
        tracing::warn!(
            num_skips = self.num_skips,
            max_skips,
            "too many pre-condition failures"
        );
        self.failed = true;
        self.error = Some(PropertyError::TooManySkips {
            num_skips: self.num_skips,
            max_skips,
        });
        self.phase = Phase::Done;
        false
    }

    fn record_failure(&mut self, value: &Value<P::Input>) {
        if self.params.verbose >= Verbosity::Verbose {
            self.failures.push(value.value_unchecked().clone());
        }
    }

    fn trial_outcome(&mut self, value: Value<P::Input>, outcome: Outcome) {
        let trial = self.trial_index;
        self.trial_index += 1;
        tracing::trace!(trial, ?outcome, "trial finished");
        match outcome {
            Outcome::Success => {
                self.num_runs += 1;
                self.path.push(Decision::Skip);
                self.summary
                    .record(value.value_unchecked(), ExecutionStatus::Success);
                self.phase = Phase::Trials;
            }
            Outcome::Skipped => {
                self.path.push(Decision::Skip);
                self.summary
                    .record(value.value_unchecked(), ExecutionStatus::Skipped);
                if self.record_skip() {
                    self.phase = Phase::Trials;
                }
            }
            Outcome::Failure(error) => {
                self.num_runs += 1;
                self.path.push(Decision::Descend);
                self.summary
                    .record(value.value_unchecked(), ExecutionStatus::Failure);
                self.record_failure(&value);
                tracing::debug!(trial, %error, "property failed, shrinking");
                self.failed = true;
                self.error = Some(error);
                self.start_shrinking(value);
            }
        }
    }

    fn start_shrinking(&mut self, value: Value<P::Input>) {
        if self.params.end_on_failure {
            self.counterexample = Some(value);
            self.phase = Phase::Done;
            return;
        }
        match shrink_guarded(self.property, &value) {
            Ok(candidates) => {
                self.phase = Phase::Shrinking(ShrinkSearch::new(
                    value,
                    candidates,
                    self.params.max_shrink_steps,
                ));
            }
            Err(message) => self.fail_arbitrary(message),
        }
    }

    fn candidate_outcome(
        &mut self,
        mut search: ShrinkSearch<P::Input>,
        value: Value<P::Input>,
        outcome: Outcome,
    ) {
        let error = match outcome {
            Outcome::Failure(error) => error,
            Outcome::Success | Outcome::Skipped => {
                let status = if outcome == Outcome::Skipped {
                    ExecutionStatus::Skipped
                } else {
                    ExecutionStatus::Success
                };
                self.path.push(Decision::Skip);
                self.summary.record(value.value_unchecked(), status);
                self.phase = Phase::Shrinking(search);
                return;
            }
        };

        self.path.push(Decision::Descend);
        self.summary
            .record(value.value_unchecked(), ExecutionStatus::Failure);
        self.record_failure(&value);
        self.error = Some(error);

        match shrink_guarded(self.property, &value) {
            Ok(candidates) => search.descend(value, candidates),
            Err(message) => {
                self.fail_arbitrary(message);
                return;
            }
        }
        tracing::debug!(step = search.steps(), "shrink step accepted");
        self.phase = Phase::Shrinking(search);
    }

    fn stop_shrinking(&mut self) {
        if let Phase::Shrinking(search) = std::mem::replace(&mut self.phase, Phase::Done) {
            self.num_shrinks = search.steps();
            self.counterexample = Some(search.into_current());
        }
    }

    fn fail_arbitrary(&mut self, message: String) {
        tracing::warn!(%message, "arbitrary panicked while generating or shrinking");
        self.failed = true;
        self.error = Some(PropertyError::ArbitraryFailed { message });
        self.counterexample = None;
        self.phase = Phase::Done;
    }

    fn start_replay(&mut self, path: ReplayPath) {
        match self.replay(&path) {
            Ok((value, trial, num_shrinks)) => {
                self.trial_index = trial;
                self.num_runs = trial + 1;
                self.num_shrinks = num_shrinks;
                self.replayed_path = Some(path);
                self.phase = Phase::Replay(Some(value));
            }
            Err(error) => {
                tracing::warn!(%error, "unable to replay path");
                self.failed = true;
                self.error = Some(error);
                self.phase = Phase::Done;
            }
        }
    }

    /// Walk `path` without evaluating the predicate. Returns the selected
    /// value, its trial index and the number of shrink steps taken.
    fn replay(
        &mut self,
        path: &ReplayPath,
    ) -> Result<(Value<P::Input>, usize, usize), PropertyError> {
        let plan = ReplayPlan::from_path(path)?;
        let available = self.examples.len() + self.params.num_runs + self.params.max_skips();
        if plan.failing_trial >= available {
            return Err(PathError::TrialOutOfRange {
                trial: plan.failing_trial,
                available,
            }
            .into());
        }

        let property = self.property;
        let mut current = match self.examples.get(plan.failing_trial) {
            Some(example) => example.clone(),
            None => {
                for _ in self.examples.len()..plan.failing_trial {
                    self.rng.split();
                }
                let mut trial_rng = self.rng.split();
                let bias = self.params.bias_for_run(plan.failing_trial);
                match guarded(|| property.generate(&mut trial_rng, bias)) {
                    Ok(value) => value,
                    Err(Aborted::Rejected) => return Err(PathError::NoFailingTrial.into()),
                    Err(Aborted::Panicked(message)) => {
                        return Err(PropertyError::ArbitraryFailed { message });
                    }
                }
            }
        };
        self.examples.clear();

        let arbitrary_failed = |message| PropertyError::ArbitraryFailed { message };
        let mut candidates = shrink_guarded(property, &current).map_err(arbitrary_failed)?;
        let mut num_shrinks = 0;
        for decision in plan.shrink {
            // rejected candidates were never evaluated, so they hold no decision
            let candidate = loop {
                match guarded(|| candidates.next()) {
                    Ok(Some(candidate)) => break candidate,
                    Ok(None) => return Err(PathError::MissingCandidate.into()),
                    Err(Aborted::Rejected) => continue,
                    Err(Aborted::Panicked(message)) => return Err(arbitrary_failed(message)),
                }
            };
            if decision == Decision::Descend {
                current = candidate;
                candidates = shrink_guarded(property, &current).map_err(arbitrary_failed)?;
                num_shrinks += 1;
            }
        }
        Ok((current, plan.failing_trial, num_shrinks))
    }

    fn replay_outcome(&mut self, value: Value<P::Input>, outcome: Outcome) {
        match outcome {
            Outcome::Failure(error) => {
                self.record_failure(&value);
                self.summary
                    .record(value.value_unchecked(), ExecutionStatus::Failure);
                self.failed = true;
                self.error = Some(error);
                self.counterexample = Some(value);
            }
            Outcome::Skipped => {
                tracing::debug!("replayed value was rejected by a precondition");
                self.num_skips += 1;
                self.summary
                    .record(value.value_unchecked(), ExecutionStatus::Skipped);
            }
            Outcome::Success => {
                tracing::debug!("replayed value no longer fails");
                self.summary
                    .record(value.value_unchecked(), ExecutionStatus::Success);
            }
        }
        self.phase = Phase::Done;
    }
}

/// Run `property` and describe what happened. Never panics on a failing
/// predicate.
pub fn check<A: Arbitrary>(property: &Property<A>, parameters: Parameters) -> RunDetails<A::Value> {
    let params = match QualifiedParameters::resolve(&parameters) {
        Ok(params) => params,
        Err(error) => return RunDetails::invalid(parameters.seed, error),
    };
    let mut runner = RunnerIterator::new(property, params);
    while let Some(input) = runner.next_value() {
        let outcome = property.run(input);
        runner.handle_outcome(outcome);
    }
    runner.into_details()
}

/// Run `property` and panic with the report if it fails
pub fn assert<A: Arbitrary>(property: &Property<A>, parameters: Parameters) {
    let details = check(property, parameters);
    if details.failed {
        panic!("{}", details.report());
    }
}

/// Asynchronous counterpart of [`check`]. Predicate futures are awaited one
/// after the other on the caller's executor.
pub async fn check_async<A: Arbitrary>(
    property: &AsyncProperty<A>,
    parameters: Parameters,
) -> RunDetails<A::Value> {
    let params = match QualifiedParameters::resolve(&parameters) {
        Ok(params) => params,
        Err(error) => return RunDetails::invalid(parameters.seed, error),
    };
    let mut runner = RunnerIterator::new(property, params);
    while let Some(input) = runner.next_value() {
        let outcome = property.run(input).await;
        runner.handle_outcome(outcome);
    }
    runner.into_details()
}

/// Asynchronous counterpart of [`assert`]
pub async fn assert_async<A: Arbitrary>(property: &AsyncProperty<A>, parameters: Parameters) {
    let details = check_async(property, parameters).await;
    if details.failed {
        panic!("{}", details.report());
    }
}
