//! Dependent generation: a first value selects the arbitrary of the second.

use std::rc::Rc;

use crate::arbitrary::Arbitrary;
use crate::property::unless_rejected;
use crate::random::Random;
use crate::stream::Shrinks;
use crate::value::{Context, Value, context_as, into_context};

type Chainer<T, B> = Rc<dyn Fn(&T) -> B>;

/// Arbitrary generating a base value then a value from the arbitrary the
/// base value maps to
pub struct Chain<A: Arbitrary, B> {
    base: A,
    chainer: Chainer<A::Value, B>,
}

struct ChainContext<T, B: Arbitrary> {
    original_bias: Option<u32>,
    original_value: T,
    original_context: Option<Context>,
    /// Set once the dependent value itself was shrunk, the base is frozen from then on
    stopped_for_original: bool,
    chained: Rc<B>,
    chained_context: Option<Context>,
    rng: Random,
}

impl<T: Clone, B: Arbitrary> Clone for ChainContext<T, B> {
    fn clone(&self) -> Self {
        Self {
            original_bias: self.original_bias,
            original_value: self.original_value.clone(),
            original_context: self.original_context.clone(),
            stopped_for_original: self.stopped_for_original,
            chained: Rc::clone(&self.chained),
            chained_context: self.chained_context.clone(),
            rng: self.rng.clone(),
        }
    }
}

impl<A: Arbitrary, B: Arbitrary> Chain<A, B> {
    pub(crate) fn new<F>(base: A, chainer: F) -> Self
    where
        F: Fn(&A::Value) -> B + 'static,
    {
        Self {
            base,
            chainer: Rc::new(chainer),
        }
    }

    fn chain_value(
        chainer: &Chainer<A::Value, B>,
        source: Value<A::Value>,
        rng: &mut Random,
        saved_rng: Random,
        bias: Option<u32>,
    ) -> Value<B::Value> {
        let (original_value, original_context) = source.into_parts();
        let chained = Rc::new(chainer(&original_value));
        let (value, chained_context) = chained.generate(rng, bias).into_parts();
        let context = ChainContext {
            original_bias: bias,
            original_value,
            original_context,
            stopped_for_original: false,
            chained,
            chained_context,
            rng: saved_rng,
        };
        Value::new(value, Some(into_context(context)))
    }
}

impl<A: Arbitrary, B: Arbitrary> Arbitrary for Chain<A, B> {
    type Value = B::Value;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<B::Value> {
        let saved_rng = rng.clone();
        let source = self.base.generate(rng, bias);
        Self::chain_value(&self.chainer, source, rng, saved_rng, bias)
    }

    fn can_shrink_without_context(&self, _value: &B::Value) -> bool {
        false
    }

    fn shrink(&self, value: &B::Value, context: Option<&Context>) -> Shrinks<B::Value> {
        let Some(context) = context_as::<ChainContext<A::Value, B>>(context) else {
            return Shrinks::nil();
        };

        let from_base = if context.stopped_for_original {
            Shrinks::nil()
        } else {
            let chainer = Rc::clone(&self.chainer);
            let rng = context.rng.clone();
            let bias = context.original_bias;
            let sources = self
                .base
                .shrink(&context.original_value, context.original_context.as_ref());
            // a dependent arbitrary may reject every value it draws
            Shrinks::new(sources.filter_map(move |source| {
                unless_rejected(|| {
                    Self::chain_value(&chainer, source, &mut rng.clone(), rng.clone(), bias)
                })
            }))
        };

        let frozen = context.clone();
        let from_chained = context
            .chained
            .shrink(value, context.chained_context.as_ref())
            .map(move |candidate| {
                let (value, chained_context) = candidate.into_parts();
                let mut context = frozen.clone();
                context.chained_context = chained_context;
                context.stopped_for_original = true;
                Value::new(value, Some(into_context(context)))
            });

        from_base.join(from_chained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::array::array;
    use crate::primitives::{IntegerArbitrary, integer};

    type IntChainContext = ChainContext<i32, IntegerArbitrary<i32>>;

    #[test]
    fn test_chain_generates_dependent_values() {
        let arb = integer(1usize, 10).chain(|len| {
            array(integer(0u8, 9))
                .min_length(*len)
                .max_length(*len)
        });
        let mut rng = Random::new(3);
        for _ in 0..100 {
            let v = arb.generate(&mut rng, Some(2));
            let len = v.value_unchecked().len();
            assert!((1..=10).contains(&len));
        }
    }

    #[test]
    fn test_chain_cannot_shrink_without_context() {
        let arb = integer(0i32, 5).chain(|max| integer(0i32, *max));
        assert!(!arb.can_shrink_without_context(&1));
        assert_eq!(arb.shrink(&1, None).count(), 0);
    }

    #[test]
    fn test_chain_shrinks_base_then_dependent() {
        let arb = integer(0i32, 100).chain(|min| integer(*min, 200));
        let mut rng = Random::new(17);
        let v = loop {
            let v = arb.generate(&mut rng, None);
            if *v.value_unchecked() > 50 {
                break v;
            }
        };

        let candidates: Vec<Value<i32>> = arb.shrink(v.value_unchecked(), v.context()).collect();
        assert!(!candidates.is_empty());
        for candidate in &candidates {
            assert!((0..=200).contains(candidate.value_unchecked()));
        }

        // Shrinking the same pair twice gives the same stream
        let again: Vec<i32> = arb
            .shrink(v.value_unchecked(), v.context())
            .map(|c| *c.value_unchecked())
            .collect();
        let first: Vec<i32> = candidates.iter().map(|c| *c.value_unchecked()).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_chain_drops_base_candidates_rejected_by_dependent() {
        let arb = integer(0i32, 10).chain(|min| {
            let min = *min;
            integer(min, 100).filter(move |_| min >= 5).max_attempts(1)
        });
        let mut rng = Random::new(2);
        let v = loop {
            if let Some(v) = unless_rejected(|| arb.generate(&mut rng, None)) {
                break v;
            }
        };
        let candidates: Vec<i32> = arb
            .shrink(v.value_unchecked(), v.context())
            .map(|c| *c.value_unchecked())
            .collect();
        assert!(candidates.iter().all(|c| (5..=100).contains(c)));
    }

    #[test]
    fn test_chain_stops_base_shrinking_after_dependent_shrink() {
        let arb = integer(0i32, 10).chain(|min| integer(*min, 1000));
        let v = arb.generate(&mut Random::new(1), None);
        let context = context_as::<IntChainContext>(v.context()).expect("chain context");
        let base_candidates = arb
            .base
            .shrink(&context.original_value, context.original_context.as_ref())
            .count();

        let all: Vec<Value<i32>> = arb.shrink(v.value_unchecked(), v.context()).collect();
        let Some(dependent) = all.get(base_candidates) else {
            return;
        };
        let nested = context_as::<IntChainContext>(dependent.context()).expect("chain context");
        assert!(nested.stopped_for_original);
        for candidate in arb.shrink(dependent.value_unchecked(), dependent.context()) {
            let inner = context_as::<IntChainContext>(candidate.context()).expect("chain context");
            assert_eq!(inner.original_value, context.original_value);
        }
    }
}
