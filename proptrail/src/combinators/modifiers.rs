//! Wrappers adjusting how an arbitrary generates or shrinks.

use crate::arbitrary::Arbitrary;
use crate::random::Random;
use crate::stream::Shrinks;
use crate::value::{Context, Value};

/// Arbitrary whose values never shrink
#[derive(Debug, Clone)]
pub struct NoShrink<A> {
    inner: A,
}

impl<A: Arbitrary> NoShrink<A> {
    pub(crate) fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: Arbitrary> Arbitrary for NoShrink<A> {
    type Value = A::Value;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<A::Value> {
        self.inner.generate(rng, bias)
    }

    fn can_shrink_without_context(&self, value: &A::Value) -> bool {
        self.inner.can_shrink_without_context(value)
    }

    fn shrink(&self, _value: &A::Value, _context: Option<&Context>) -> Shrinks<A::Value> {
        Shrinks::nil()
    }
}

/// Arbitrary generating without bias whatever the run asks for
#[derive(Debug, Clone)]
pub struct NoBias<A> {
    inner: A,
}

impl<A: Arbitrary> NoBias<A> {
    pub(crate) fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: Arbitrary> Arbitrary for NoBias<A> {
    type Value = A::Value;

    fn generate(&self, rng: &mut Random, _bias: Option<u32>) -> Value<A::Value> {
        self.inner.generate(rng, None)
    }

    fn can_shrink_without_context(&self, value: &A::Value) -> bool {
        self.inner.can_shrink_without_context(value)
    }

    fn shrink(&self, value: &A::Value, context: Option<&Context>) -> Shrinks<A::Value> {
        self.inner.shrink(value, context)
    }
}

/// Arbitrary flagging its values, and their shrinks, as clone-on-read
#[derive(Debug, Clone)]
pub struct CloneOnRead<A> {
    inner: A,
}

impl<A: Arbitrary> CloneOnRead<A> {
    pub(crate) fn new(inner: A) -> Self {
        Self { inner }
    }
}

fn flag<T>(value: Value<T>) -> Value<T> {
    let (value, context) = value.into_parts();
    Value::with_clone_on_read(value, context)
}

impl<A: Arbitrary> Arbitrary for CloneOnRead<A> {
    type Value = A::Value;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<A::Value> {
        flag(self.inner.generate(rng, bias))
    }

    fn can_shrink_without_context(&self, value: &A::Value) -> bool {
        self.inner.can_shrink_without_context(value)
    }

    fn shrink(&self, value: &A::Value, context: Option<&Context>) -> Shrinks<A::Value> {
        self.inner.shrink(value, context).map(flag)
    }
}
