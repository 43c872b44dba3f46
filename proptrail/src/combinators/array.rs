//! Variable-length vectors of values from an item arbitrary.

use std::rc::Rc;

use crate::arbitrary::Arbitrary;
use crate::primitives::{IntegerArbitrary, integer};
use crate::random::Random;
use crate::shrink::strategies::integer_log_like;
use crate::stream::{Shrinks, Stream};
use crate::value::{Context, Value, context_as, into_context};

/// Largest length an array may reach when no maximum is given
pub const MAX_LENGTH: usize = i32::MAX as usize;

/// Extra length generated above the minimum when no maximum is given
const DEFAULT_LENGTH_SPREAD: usize = 10;

/// Arbitrary for `Vec`s of items generated by another arbitrary.
///
/// Arrays shrink by dropping items from the front first, then by shrinking
/// items one by one.
pub struct ArrayArbitrary<A> {
    item: Rc<A>,
    min_length: usize,
    max_length: usize,
    max_generated_length: Option<usize>,
}

impl<A> Clone for ArrayArbitrary<A> {
    fn clone(&self) -> Self {
        Self {
            item: Rc::clone(&self.item),
            min_length: self.min_length,
            max_length: self.max_length,
            max_generated_length: self.max_generated_length,
        }
    }
}

#[derive(Clone)]
struct ArrayContext {
    shrunk_once: bool,
    length_context: Option<Context>,
    item_contexts: Vec<Option<Context>>,
    start_index: usize,
    clone_on_read: bool,
}

/// Intermediate shrink result, turned into a `Value` once accepted
struct Candidate<T> {
    items: Vec<T>,
    item_contexts: Vec<Option<Context>>,
    length_context: Option<Context>,
    start_index: usize,
}

/// Arrays of `item` values, from zero to ten items by default
pub fn array<A: Arbitrary>(item: A) -> ArrayArbitrary<A> {
    ArrayArbitrary {
        item: Rc::new(item),
        min_length: 0,
        max_length: MAX_LENGTH,
        max_generated_length: None,
    }
}

impl<A: Arbitrary> ArrayArbitrary<A> {
    /// Smallest accepted length
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self.max_length = self.max_length.max(min_length);
        self
    }

    /// Largest accepted length
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self.min_length = self.min_length.min(max_length);
        self
    }

    /// Largest length produced by generation. Shrinking and
    /// `can_shrink_without_context` still accept up to `max_length`.
    pub fn max_generated_length(mut self, length: usize) -> Self {
        self.max_generated_length = Some(length);
        self
    }

    fn generated_length_bound(&self) -> usize {
        let spread = self
            .max_generated_length
            .unwrap_or(self.min_length.saturating_add(DEFAULT_LENGTH_SPREAD));
        spread.clamp(self.min_length, self.max_length)
    }

    fn length_arbitrary(&self) -> IntegerArbitrary<usize> {
        integer(self.min_length, self.generated_length_bound())
    }

    /// Target length and bias forwarded to items
    fn apply_bias(&self, rng: &mut Random, bias: Option<u32>) -> (usize, Option<u32>) {
        let length = self.length_arbitrary();
        let bias = bias.filter(|factor| *factor > 0);
        let Some(factor) = bias else {
            return (*length.generate(rng, None).value_unchecked(), None);
        };
        let max_generated = self.generated_length_bound();
        if self.min_length == max_generated {
            return (*length.generate(rng, None).value_unchecked(), bias);
        }
        if rng.next_int(1, i64::from(factor)) != 1 {
            return (*length.generate(rng, None).value_unchecked(), None);
        }
        if rng.next_int(1, i64::from(factor)) != 1 {
            return (*length.generate(rng, None).value_unchecked(), bias);
        }
        let spread = integer_log_like((max_generated - self.min_length) as i128) as usize;
        let biased = integer(self.min_length, self.min_length + spread);
        (*biased.generate(rng, None).value_unchecked(), bias)
    }

    fn wrap(&self, candidate: Candidate<A::Value>, shrunk_once: bool, clone_on_read: bool) -> Value<Vec<A::Value>> {
        let context = Some(into_context(ArrayContext {
            shrunk_once,
            length_context: candidate.length_context,
            item_contexts: candidate.item_contexts,
            start_index: candidate.start_index,
            clone_on_read,
        }));
        if clone_on_read {
            Value::with_clone_on_read(candidate.items, context)
        } else {
            Value::new(candidate.items, context)
        }
    }

    /// Shrink the items in `[start_index, end_index)` one at a time
    fn shrink_item_by_item(
        &self,
        items: Rc<Vec<A::Value>>,
        context: &ArrayContext,
        end_index: usize,
    ) -> Stream<Candidate<A::Value>> {
        let mut shrinks = Stream::nil();
        for index in context.start_index..end_index {
            let item = Rc::clone(&self.item);
            let items = Rc::clone(&items);
            let item_contexts = context.item_contexts.clone();
            shrinks = shrinks.join(Stream::lazy(move || {
                let item_context = item_contexts.get(index).cloned().flatten();
                let base_items = Rc::clone(&items);
                item.shrink(&items[index], item_context.as_ref())
                    .map(move |candidate| {
                        let (value, value_context) = candidate.into_parts();
                        let mut next_items = base_items.as_ref().clone();
                        next_items[index] = value;
                        let mut next_contexts = item_contexts.clone();
                        next_contexts.resize(next_items.len(), None);
                        next_contexts[index] = value_context;
                        Candidate {
                            items: next_items,
                            item_contexts: next_contexts,
                            length_context: None,
                            start_index: index,
                        }
                    })
            }));
        }
        shrinks
    }

    fn shrink_impl(&self, items: Rc<Vec<A::Value>>, context: ArrayContext) -> Stream<Candidate<A::Value>> {
        if items.is_empty() {
            return Stream::nil();
        }
        let len = items.len();

        // A value shrunk before without a length context already went
        // through its first length candidate
        let skip_first = context.shrunk_once
            && context.length_context.is_none()
            && len > self.min_length + 1;
        let by_length = {
            let items = Rc::clone(&items);
            let item_contexts = context.item_contexts.clone();
            self.length_arbitrary()
                .shrink(&len, context.length_context.as_ref())
                .drop(usize::from(skip_first))
                .map(move |length| {
                    let (length, length_context) = length.into_parts();
                    let start = items.len() - length;
                    Candidate {
                        items: items[start..].to_vec(),
                        item_contexts: (start..items.len())
                            .map(|i| item_contexts.get(i).cloned().flatten())
                            .collect(),
                        length_context,
                        start_index: 0,
                    }
                })
        };

        let end_index = if len > self.min_length { 1 } else { len };
        let by_item = {
            let this = self.clone();
            let items = Rc::clone(&items);
            let context = context.clone();
            Stream::lazy(move || this.shrink_item_by_item(items, &context, end_index))
        };

        let by_tail = if len > self.min_length {
            let this = self.clone();
            Stream::lazy(move || {
                let head = items[0].clone();
                let head_context = context.item_contexts.first().cloned().flatten();
                let tail = Rc::new(items[1..].to_vec());
                let tail_context = ArrayContext {
                    shrunk_once: false,
                    length_context: None,
                    item_contexts: context.item_contexts.iter().skip(1).cloned().collect(),
                    start_index: 0,
                    clone_on_read: context.clone_on_read,
                };
                let min_length = this.min_length;
                this.shrink_impl(tail, tail_context)
                    .filter(move |candidate| min_length <= candidate.items.len() + 1)
                    .map(move |candidate| {
                        let mut items = Vec::with_capacity(candidate.items.len() + 1);
                        items.push(head.clone());
                        items.extend(candidate.items);
                        let mut item_contexts = Vec::with_capacity(items.len());
                        item_contexts.push(head_context.clone());
                        item_contexts.extend(candidate.item_contexts);
                        Candidate {
                            items,
                            item_contexts,
                            length_context: None,
                            start_index: 0,
                        }
                    })
            })
        } else {
            Stream::nil()
        };

        by_length.join(by_item).join(by_tail)
    }
}

impl<A: Arbitrary> Arbitrary for ArrayArbitrary<A> {
    type Value = Vec<A::Value>;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<Vec<A::Value>> {
        let (length, item_bias) = self.apply_bias(rng, bias);
        let mut items = Vec::with_capacity(length);
        let mut item_contexts = Vec::with_capacity(length);
        let mut clone_on_read = false;
        for _ in 0..length {
            let generated = self.item.generate(&mut rng.split(), item_bias);
            clone_on_read |= generated.has_to_be_cloned();
            let (value, context) = generated.into_parts();
            items.push(value);
            item_contexts.push(context);
        }
        let candidate = Candidate {
            items,
            item_contexts,
            length_context: None,
            start_index: 0,
        };
        self.wrap(candidate, false, clone_on_read)
    }

    fn can_shrink_without_context(&self, value: &Vec<A::Value>) -> bool {
        (self.min_length..=self.max_length).contains(&value.len())
            && value.iter().all(|item| self.item.can_shrink_without_context(item))
    }

    fn shrink(&self, value: &Vec<A::Value>, context: Option<&Context>) -> Shrinks<Vec<A::Value>> {
        let context = context_as::<ArrayContext>(context).cloned().unwrap_or(ArrayContext {
            shrunk_once: false,
            length_context: None,
            item_contexts: Vec::new(),
            start_index: 0,
            clone_on_read: false,
        });
        let clone_on_read = context.clone_on_read;
        let this = self.clone();
        self.shrink_impl(Rc::new(value.clone()), context)
            .map(move |candidate| this.wrap(candidate, true, clone_on_read))
    }
}
