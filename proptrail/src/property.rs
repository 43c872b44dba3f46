//! Property definitions for synchronous and asynchronous predicates.

use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::arbitrary::Arbitrary;
use crate::error::{PropertyError, panic_message};
use crate::random::Random;
use crate::stream::Shrinks;
use crate::value::Value;

/// Panic payload signalling that the current input does not satisfy a
/// precondition. The trial is skipped rather than failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconditionFailure {
    message: Option<String>,
}

impl PreconditionFailure {
    /// Reason given when rejecting, if any
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for PreconditionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "precondition failure: {message}"),
            None => f.write_str("precondition failure"),
        }
    }
}

/// Skip the current trial unless `condition` holds.
///
/// Only meaningful inside a predicate or an arbitrary run by the engine.
pub fn pre(condition: bool) {
    if !condition {
        resume_unwind(Box::new(PreconditionFailure { message: None }));
    }
}

/// Abandon the current trial as a precondition failure
pub(crate) fn reject(message: impl Into<String>) -> ! {
    resume_unwind(Box::new(PreconditionFailure {
        message: Some(message.into()),
    }))
}

/// Run `f`, turning a precondition failure into `None`. Any other panic
/// keeps unwinding.
pub(crate) fn unless_rejected<R>(f: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Some(result),
        Err(payload) if payload.is::<PreconditionFailure>() => None,
        Err(payload) => resume_unwind(payload),
    }
}

/// Values a predicate may return
pub trait PredicateOutcome {
    /// `Ok` when the property holds
    fn into_outcome(self) -> Result<(), PropertyError>;
}

impl PredicateOutcome for bool {
    fn into_outcome(self) -> Result<(), PropertyError> {
        if self {
            Ok(())
        } else {
            Err(PropertyError::Falsified)
        }
    }
}

impl PredicateOutcome for () {
    fn into_outcome(self) -> Result<(), PropertyError> {
        Ok(())
    }
}

impl<E: fmt::Display> PredicateOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), PropertyError> {
        self.map_err(|e| PropertyError::predicate_failed(e.to_string()))
    }
}

impl<E: fmt::Display> PredicateOutcome for Result<bool, E> {
    fn into_outcome(self) -> Result<(), PropertyError> {
        match self {
            Ok(holds) => holds.into_outcome(),
            Err(e) => Err(PropertyError::predicate_failed(e.to_string())),
        }
    }
}

/// Result of running the predicate once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// A precondition rejected the input
    Skipped,
    Failure(PropertyError),
}

impl Outcome {
    fn from_result(result: Result<Result<(), PropertyError>, Box<dyn std::any::Any + Send>>) -> Self {
        match result {
            Ok(Ok(())) => Outcome::Success,
            Ok(Err(error)) => Outcome::Failure(error),
            Err(payload) if payload.is::<PreconditionFailure>() => Outcome::Skipped,
            Err(payload) => Outcome::Failure(PropertyError::PredicatePanicked {
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

/// Generation side shared by [`Property`] and [`AsyncProperty`]
pub trait PropertyCore {
    /// Input of the predicate
    type Input: Clone + fmt::Debug + 'static;

    /// Generate an input
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<Self::Input>;

    /// Whether `input` can be shrunk without its generation context
    fn can_shrink_without_context(&self, input: &Self::Input) -> bool;

    /// Shrink candidates of a failing input
    fn shrink(&self, value: &Value<Self::Input>) -> Shrinks<Self::Input>;

    /// Inputs to try before random ones
    fn examples(&self) -> Vec<Value<Self::Input>>;
}

type Hook = Box<dyn Fn()>;

struct Hooks {
    before_each: Option<Hook>,
    after_each: Option<Hook>,
}

impl Hooks {
    fn new() -> Self {
        Self {
            before_each: None,
            after_each: None,
        }
    }

    fn before(&self) {
        if let Some(hook) = &self.before_each {
            hook();
        }
    }

    fn after(&self) {
        if let Some(hook) = &self.after_each {
            hook();
        }
    }
}

fn shrink_input<A: Arbitrary>(arbitrary: &A, value: &Value<A::Value>) -> Shrinks<A::Value> {
    match value.context() {
        Some(context) => arbitrary.shrink(value.value_unchecked(), Some(context)),
        None if arbitrary.can_shrink_without_context(value.value_unchecked()) => {
            arbitrary.shrink(value.value_unchecked(), None)
        }
        None => Shrinks::nil(),
    }
}

/// A synchronous property: an arbitrary and a predicate over its values
pub struct Property<A: Arbitrary> {
    arbitrary: A,
    predicate: Box<dyn Fn(A::Value) -> Result<(), PropertyError>>,
    examples: Vec<A::Value>,
    hooks: Hooks,
}

/// Build a property checking `predicate` against values of `arbitrary`.
///
/// The predicate holds when it returns `true`, `()`, `Ok(())` or `Ok(true)`.
/// Returning `false` or `Err`, or panicking, makes it fail. Calling
/// [`pre`] with a false condition skips the input.
pub fn property<A, F, R>(arbitrary: A, predicate: F) -> Property<A>
where
    A: Arbitrary,
    F: Fn(A::Value) -> R + 'static,
    R: PredicateOutcome,
{
    Property {
        arbitrary,
        predicate: Box::new(move |input| predicate(input).into_outcome()),
        examples: Vec::new(),
        hooks: Hooks::new(),
    }
}

impl<A: Arbitrary> Property<A> {
    /// Inputs tried before any generated value
    pub fn with_examples(mut self, examples: Vec<A::Value>) -> Self {
        self.examples = examples;
        self
    }

    /// Run `hook` before every predicate execution
    pub fn before_each(mut self, hook: impl Fn() + 'static) -> Self {
        self.hooks.before_each = Some(Box::new(hook));
        self
    }

    /// Run `hook` after every predicate execution, even a panicking one
    pub fn after_each(mut self, hook: impl Fn() + 'static) -> Self {
        self.hooks.after_each = Some(Box::new(hook));
        self
    }

    /// Run the predicate once against `input`
    pub fn run(&self, input: A::Value) -> Outcome {
        self.hooks.before();
        let result = catch_unwind(AssertUnwindSafe(|| (self.predicate)(input)));
        self.hooks.after();
        Outcome::from_result(result)
    }
}

impl<A: Arbitrary> PropertyCore for Property<A> {
    type Input = A::Value;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<A::Value> {
        self.arbitrary.generate(rng, bias)
    }

    fn can_shrink_without_context(&self, input: &A::Value) -> bool {
        self.arbitrary.can_shrink_without_context(input)
    }

    fn shrink(&self, value: &Value<A::Value>) -> Shrinks<A::Value> {
        shrink_input(&self.arbitrary, value)
    }

    fn examples(&self) -> Vec<Value<A::Value>> {
        self.examples
            .iter()
            .map(|example| Value::new(example.clone(), None))
            .collect()
    }
}

type AsyncPredicate<T> = Box<dyn Fn(T) -> LocalBoxFuture<'static, Result<(), PropertyError>>>;

/// A property whose predicate is asynchronous.
///
/// The future is polled by whatever executor awaits
/// [`check_async`](crate::check_async); no runtime is assumed.
pub struct AsyncProperty<A: Arbitrary> {
    arbitrary: A,
    predicate: AsyncPredicate<A::Value>,
    examples: Vec<A::Value>,
    hooks: Hooks,
}

/// Build an asynchronous property, see [`property`]
pub fn async_property<A, F, Fut, R>(arbitrary: A, predicate: F) -> AsyncProperty<A>
where
    A: Arbitrary,
    F: Fn(A::Value) -> Fut + 'static,
    Fut: Future<Output = R> + 'static,
    R: PredicateOutcome + 'static,
{
    AsyncProperty {
        arbitrary,
        predicate: Box::new(move |input| {
            predicate(input)
                .map(PredicateOutcome::into_outcome)
                .boxed_local()
        }),
        examples: Vec::new(),
        hooks: Hooks::new(),
    }
}

impl<A: Arbitrary> AsyncProperty<A> {
    /// Inputs tried before any generated value
    pub fn with_examples(mut self, examples: Vec<A::Value>) -> Self {
        self.examples = examples;
        self
    }

    /// Run `hook` before every predicate execution
    pub fn before_each(mut self, hook: impl Fn() + 'static) -> Self {
        self.hooks.before_each = Some(Box::new(hook));
        self
    }

    /// Run `hook` after every predicate execution, even a panicking one
    pub fn after_each(mut self, hook: impl Fn() + 'static) -> Self {
        self.hooks.after_each = Some(Box::new(hook));
        self
    }

    /// Run the predicate once against `input`
    pub async fn run(&self, input: A::Value) -> Outcome {
        self.hooks.before();
        let result = match catch_unwind(AssertUnwindSafe(|| (self.predicate)(input))) {
            Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
            Err(payload) => Err(payload),
        };
        self.hooks.after();
        Outcome::from_result(result)
    }
}

impl<A: Arbitrary> PropertyCore for AsyncProperty<A> {
    type Input = A::Value;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<A::Value> {
        self.arbitrary.generate(rng, bias)
    }

    fn can_shrink_without_context(&self, input: &A::Value) -> bool {
        self.arbitrary.can_shrink_without_context(input)
    }

    fn shrink(&self, value: &Value<A::Value>) -> Shrinks<A::Value> {
        shrink_input(&self.arbitrary, value)
    }

    fn examples(&self) -> Vec<Value<A::Value>> {
        self.examples
            .iter()
            .map(|example| Value::new(example.clone(), None))
            .collect()
    }
}
