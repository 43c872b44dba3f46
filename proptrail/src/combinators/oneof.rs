//! Weighted choice between arbitraries, with depth control for recursive
//! structures.

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::arbitrary::{Arbitrary, BoxedArbitrary};
use crate::property::unless_rejected;
use crate::random::Random;
use crate::stream::{Shrinks, Stream};
use crate::value::{Context, Value, context_as, into_context};

/// Default depth bias, matching a "small" recursive size
pub const DEFAULT_DEPTH_BIAS: f64 = 0.5;

thread_local! {
    static DEPTH_CONTEXTS: RefCell<HashMap<String, DepthContext>> = RefCell::new(HashMap::new());
}

/// Current recursion depth shared by the arbitraries of one recursive
/// structure.
///
/// Each [`OneOf`] entering a branch bumps the depth for the duration of the
/// nested generation. Arbitraries using the same identifier share the counter.
#[derive(Debug, Clone, Default)]
pub struct DepthContext {
    depth: Rc<Cell<usize>>,
}

impl DepthContext {
    /// A private counter
    pub fn new() -> Self {
        Self::default()
    }

    /// The counter registered under `identifier` on this thread
    pub fn for_identifier(identifier: &str) -> Self {
        DEPTH_CONTEXTS.with(|contexts| {
            contexts
                .borrow_mut()
                .entry(identifier.to_string())
                .or_default()
                .clone()
        })
    }

    /// Current depth
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    fn enter(&self) -> DepthGuard {
        self.depth.set(self.depth.get() + 1);
        DepthGuard {
            depth: Rc::clone(&self.depth),
        }
    }
}

struct DepthGuard {
    depth: Rc<Cell<usize>>,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

struct Branch<T> {
    arbitrary: BoxedArbitrary<T>,
    weight: u32,
}

/// Arbitrary picking one of several branches according to their weights.
///
/// The first branch is considered the terminal one: the deeper the shared
/// [`DepthContext`], the more likely it gets picked, and past
/// [`OneOf::max_depth`] it is the only one picked.
pub struct OneOf<T> {
    branches: Vec<Branch<T>>,
    cumulated_weights: Vec<i64>,
    total_weight: i64,
    max_depth: usize,
    depth_bias: f64,
    with_cross_shrink: bool,
    first_fallback: Option<T>,
    depth: DepthContext,
}

struct OneOfContext<T> {
    selected: usize,
    original_bias: Option<u32>,
    original_context: Option<Context>,
    rng_for_first: Option<Random>,
    /// First branch value offered while shrinking, `None` when its generation was rejected
    generated_for_first: OnceCell<Option<Value<T>>>,
}

/// Uniform choice between `arbitraries`
pub fn one_of<T: Clone + std::fmt::Debug + 'static>(arbitraries: Vec<BoxedArbitrary<T>>) -> OneOf<T> {
    OneOf::new(arbitraries.into_iter().map(|a| (a, 1)).collect())
}

/// Choice between `arbitraries` proportional to their weights
pub fn one_of_weighted<T: Clone + std::fmt::Debug + 'static>(
    arbitraries: Vec<(BoxedArbitrary<T>, u32)>,
) -> OneOf<T> {
    OneOf::new(arbitraries)
}

impl<T: Clone + std::fmt::Debug + 'static> OneOf<T> {
    /// Panics when no branch has a positive weight.
    pub fn new(arbitraries: Vec<(BoxedArbitrary<T>, u32)>) -> Self {
        let mut total_weight = 0i64;
        let mut cumulated_weights = Vec::with_capacity(arbitraries.len());
        let branches = arbitraries
            .into_iter()
            .map(|(arbitrary, weight)| {
                total_weight += i64::from(weight);
                cumulated_weights.push(total_weight);
                Branch { arbitrary, weight }
            })
            .collect();
        assert!(total_weight > 0, "one_of requires at least one branch with a positive weight");
        Self {
            branches,
            cumulated_weights,
            total_weight,
            max_depth: usize::MAX,
            depth_bias: DEFAULT_DEPTH_BIAS,
            with_cross_shrink: false,
            first_fallback: None,
            depth: DepthContext::new(),
        }
    }

    /// Depth from which only the first branch is generated
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// How fast the first branch becomes favoured as depth grows, `0.0`
    /// disables the effect
    pub fn depth_bias(mut self, depth_bias: f64) -> Self {
        self.depth_bias = depth_bias;
        self
    }

    /// Share the depth counter with every arbitrary using `identifier`
    pub fn depth_identifier(mut self, identifier: &str) -> Self {
        self.depth = DepthContext::for_identifier(identifier);
        self
    }

    /// Share an explicit depth counter
    pub fn depth_context(mut self, depth: DepthContext) -> Self {
        self.depth = depth;
        self
    }

    /// Let values from later branches shrink into a value of the first one
    pub fn with_cross_shrink(mut self) -> Self {
        self.with_cross_shrink = true;
        self
    }

    /// Value of the first branch proposed when shrinking, without context, a
    /// value of another branch
    pub fn first_fallback(mut self, value: T) -> Self {
        self.first_fallback = Some(value);
        self
    }

    fn must_generate_first(&self) -> bool {
        self.max_depth <= self.depth.depth()
    }

    fn must_fallback_to_first_in_shrink(&self, index: usize) -> bool {
        index != 0 && self.with_cross_shrink && self.branches[0].weight != 0
    }

    fn neg_depth_benefit(&self) -> i64 {
        if self.depth_bias <= 0.0 || self.branches[0].weight == 0 {
            return 0;
        }
        let depth = i32::try_from(self.depth.depth()).unwrap_or(i32::MAX);
        let benefit = (1.0 + self.depth_bias).powi(depth).floor() - 1.0;
        let scaled = self.total_weight as f64 * benefit;
        if scaled >= i64::MAX as f64 {
            -i64::MAX
        } else {
            -(scaled as i64)
        }
    }

    fn generate_for_index(&self, rng: &mut Random, index: usize, bias: Option<u32>) -> Value<T> {
        let _guard = self.depth.enter();
        let generated = self.branches[index].arbitrary.generate(rng, bias);
        let rng_for_first = self
            .must_fallback_to_first_in_shrink(index)
            .then(|| rng.clone());
        into_selected(index, generated, rng_for_first, bias)
    }

    fn index_without_context(&self, value: &T) -> Option<usize> {
        if self.must_generate_first() {
            return self.branches[0]
                .arbitrary
                .can_shrink_without_context(value)
                .then_some(0);
        }
        let _guard = self.depth.enter();
        self.branches
            .iter()
            .position(|b| b.weight != 0 && b.arbitrary.can_shrink_without_context(value))
    }

    fn default_shrink_for_first(&self, index: usize) -> Shrinks<T> {
        match &self.first_fallback {
            Some(fallback) if self.must_fallback_to_first_in_shrink(index) => {
                Stream::once(Value::new(fallback.clone(), None))
            }
            _ => Stream::nil(),
        }
    }
}

fn into_selected<T: 'static>(
    selected: usize,
    value: Value<T>,
    rng_for_first: Option<Random>,
    bias: Option<u32>,
) -> Value<T> {
    value.map_parts(|value, original_context| {
        let context = OneOfContext::<T> {
            selected,
            original_bias: bias,
            original_context,
            rng_for_first,
            generated_for_first: OnceCell::new(),
        };
        (value, Some(into_context(context)))
    })
}

impl<T: Clone + std::fmt::Debug + 'static> Arbitrary for OneOf<T> {
    type Value = T;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        if self.must_generate_first() {
            return self.generate_for_index(rng, 0, bias);
        }
        let selected = rng.next_int(self.neg_depth_benefit(), self.total_weight - 1);
        let index = self
            .cumulated_weights
            .iter()
            .position(|cumulated| selected < *cumulated)
            .unwrap_or(0);
        self.generate_for_index(rng, index, bias)
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.index_without_context(value).is_some()
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        if let Some(context) = context_as::<OneOfContext<T>>(context) {
            let selected = context.selected;
            let bias = context.original_bias;
            let original = self.branches[selected]
                .arbitrary
                .shrink(value, context.original_context.as_ref())
                .map(move |v| into_selected(selected, v, None, bias));
            return match &context.rng_for_first {
                Some(rng) => {
                    let first = context
                        .generated_for_first
                        .get_or_init(|| {
                            unless_rejected(|| self.generate_for_index(&mut rng.clone(), 0, bias))
                        })
                        .clone();
                    match first {
                        Some(first) => Stream::once(first).join(original),
                        None => original,
                    }
                }
                None => original,
            };
        }

        let Some(index) = self.index_without_context(value) else {
            return Stream::nil();
        };
        let from_branch = self.branches[index]
            .arbitrary
            .shrink(value, None)
            .map(move |v| into_selected(index, v, None, None));
        self.default_shrink_for_first(index).join(from_branch)
    }
}
