//! The generate/shrink contract implemented by every value generator.

use std::fmt;
use std::rc::Rc;

use crate::combinators::chain::Chain;
use crate::combinators::filter::Filter;
use crate::combinators::map::Map;
use crate::combinators::modifiers::{CloneOnRead, NoBias, NoShrink};
use crate::random::Random;
use crate::stream::Shrinks;
use crate::value::{Context, Value};

/// A generator of random values that also knows how to shrink them.
///
/// Arbitraries are stateless descriptions: generating twice from two equal
/// [`Random`] states produces the same [`Value`], and shrinking the same
/// `(value, context)` pair twice yields the same stream.
pub trait Arbitrary: 'static {
    /// Type of the generated values
    type Value: Clone + fmt::Debug + 'static;

    /// Generate a value.
    ///
    /// `bias` is `Some(n)` when roughly one generation out of `n` should
    /// favour edge values (small magnitudes, bounds, short collections).
    /// `Some(0)` is treated like `None`.
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<Self::Value>;

    /// Whether `value` belongs to this arbitrary's domain and can be shrunk
    /// without the context recorded at generation time.
    fn can_shrink_without_context(&self, value: &Self::Value) -> bool;

    /// Candidates simpler than `value`, closest first.
    ///
    /// `context` is the one attached to `value` when it was produced by this
    /// arbitrary, or `None` for values coming from elsewhere.
    fn shrink(&self, value: &Self::Value, context: Option<&Context>) -> Shrinks<Self::Value>;

    /// Transform generated values. Values transformed this way cannot be
    /// shrunk without their generation context.
    fn map<U, F>(self, mapper: F) -> Map<Self, U>
    where
        Self: Sized,
        U: Clone + fmt::Debug + 'static,
        F: Fn(Self::Value) -> U + 'static,
    {
        Map::new(self, mapper, None)
    }

    /// Transform generated values, with an inverse mapping used to bring
    /// values produced elsewhere back into the base domain (`None` when the
    /// value is not reachable from the base).
    fn map_with_unmapper<U, F, G>(self, mapper: F, unmapper: G) -> Map<Self, U>
    where
        Self: Sized,
        U: Clone + fmt::Debug + 'static,
        F: Fn(Self::Value) -> U + 'static,
        G: Fn(&U) -> Option<Self::Value> + 'static,
    {
        let unmapper: Rc<dyn Fn(&U) -> Option<Self::Value>> = Rc::new(unmapper);
        Map::new(self, mapper, Some(unmapper))
    }

    /// Only keep values matching `predicate`, during generation and shrinking
    fn filter<F>(self, predicate: F) -> Filter<Self>
    where
        Self: Sized,
        F: Fn(&Self::Value) -> bool + 'static,
    {
        Filter::new(self, predicate)
    }

    /// Generate a value, then use it to pick the arbitrary generating the
    /// final value
    fn chain<B, F>(self, chainer: F) -> Chain<Self, B>
    where
        Self: Sized,
        B: Arbitrary + 'static,
        F: Fn(&Self::Value) -> B + 'static,
    {
        Chain::new(self, chainer)
    }

    /// Disable shrinking
    fn no_shrink(self) -> NoShrink<Self>
    where
        Self: Sized,
    {
        NoShrink::new(self)
    }

    /// Disable bias during generation
    fn no_bias(self) -> NoBias<Self>
    where
        Self: Sized,
    {
        NoBias::new(self)
    }

    /// Flag produced values as clone-on-read
    fn clone_on_read(self) -> CloneOnRead<Self>
    where
        Self: Sized,
    {
        CloneOnRead::new(self)
    }

    /// Erase the concrete type
    fn boxed(self) -> BoxedArbitrary<Self::Value>
    where
        Self: Sized + 'static,
    {
        BoxedArbitrary::new(self)
    }
}

/// Type-erased, cheaply clonable arbitrary
pub struct BoxedArbitrary<T> {
    inner: Rc<dyn Arbitrary<Value = T>>,
}

impl<T: Clone + fmt::Debug + 'static> BoxedArbitrary<T> {
    /// Erase an arbitrary's type
    pub fn new<A>(arbitrary: A) -> Self
    where
        A: Arbitrary<Value = T> + 'static,
    {
        Self {
            inner: Rc::new(arbitrary),
        }
    }
}

impl<T> Clone for BoxedArbitrary<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for BoxedArbitrary<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedArbitrary { .. }")
    }
}

impl<T: Clone + fmt::Debug + 'static> Arbitrary for BoxedArbitrary<T> {
    type Value = T;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        self.inner.generate(rng, bias)
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.inner.can_shrink_without_context(value)
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        self.inner.shrink(value, context)
    }

    fn boxed(self) -> BoxedArbitrary<T> {
        self
    }
}

impl<A: Arbitrary + ?Sized> Arbitrary for Rc<A> {
    type Value = A::Value;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<A::Value> {
        (**self).generate(rng, bias)
    }

    fn can_shrink_without_context(&self, value: &A::Value) -> bool {
        (**self).can_shrink_without_context(value)
    }

    fn shrink(&self, value: &A::Value, context: Option<&Context>) -> Shrinks<A::Value> {
        (**self).shrink(value, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::integer;

    #[test]
    fn test_boxed_delegates() {
        let boxed = integer(0i32, 10).boxed();
        let copy = boxed.clone();
        let mut rng = Random::new(1);
        let mut rng_copy = Random::new(1);

        let a = boxed.generate(&mut rng, None);
        let b = copy.generate(&mut rng_copy, None);
        assert_eq!(a.value_unchecked(), b.value_unchecked());
        assert!(boxed.can_shrink_without_context(&5));
        assert!(!boxed.can_shrink_without_context(&11));
        assert_eq!(boxed.shrink(&0, None).count(), 0);
    }

    #[test]
    fn test_rc_arbitrary_delegates() {
        let shared = Rc::new(integer(-5i64, 5));
        let mut rng = Random::new(3);
        let v = shared.generate(&mut rng, Some(2));
        assert!((-5..=5).contains(v.value_unchecked()));
        assert!(shared.can_shrink_without_context(&-5));
    }
}
