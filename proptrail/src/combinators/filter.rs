//! Restricting an arbitrary to the values matching a predicate.

use std::rc::Rc;

use crate::arbitrary::Arbitrary;
use crate::property::reject;
use crate::random::Random;
use crate::stream::Shrinks;
use crate::value::{Context, Value};

/// Default number of generation attempts before giving up
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// Arbitrary keeping only the values of its base matching a predicate.
///
/// Generation retries up to [`Filter::max_attempts`] times. When every
/// attempt is rejected the current trial is abandoned as a precondition
/// failure and counted as a skip by the runner.
pub struct Filter<A: Arbitrary> {
    base: A,
    predicate: Rc<dyn Fn(&A::Value) -> bool>,
    max_attempts: usize,
}

impl<A: Arbitrary> Filter<A> {
    pub(crate) fn new<F>(base: A, predicate: F) -> Self
    where
        F: Fn(&A::Value) -> bool + 'static,
    {
        Self {
            base,
            predicate: Rc::new(predicate),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the number of generation attempts, at least one
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

impl<A: Arbitrary> Arbitrary for Filter<A> {
    type Value = A::Value;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<A::Value> {
        for _ in 0..self.max_attempts {
            let generated = self.base.generate(rng, bias);
            if (self.predicate)(generated.value_unchecked()) {
                return generated;
            }
        }
        tracing::debug!(attempts = self.max_attempts, "filter rejected every generated value");
        reject(format!(
            "filter rejected {} generated values in a row",
            self.max_attempts
        ))
    }

    fn can_shrink_without_context(&self, value: &A::Value) -> bool {
        self.base.can_shrink_without_context(value) && (self.predicate)(value)
    }

    fn shrink(&self, value: &A::Value, context: Option<&Context>) -> Shrinks<A::Value> {
        let predicate = Rc::clone(&self.predicate);
        self.base
            .shrink(value, context)
            .filter(move |candidate| predicate(candidate.value_unchecked()))
    }
}
