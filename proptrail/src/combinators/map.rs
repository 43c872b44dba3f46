//! Mapping generated values into another type.

use std::rc::Rc;

use crate::arbitrary::Arbitrary;
use crate::random::Random;
use crate::stream::Shrinks;
use crate::value::{Context, Value, context_as, into_context};

type Mapper<T, U> = Rc<dyn Fn(T) -> U>;
type Unmapper<T, U> = Rc<dyn Fn(&U) -> Option<T>>;

/// Arbitrary applying a function to the values of a base arbitrary
pub struct Map<A: Arbitrary, U> {
    base: A,
    mapper: Mapper<A::Value, U>,
    unmapper: Option<Unmapper<A::Value, U>>,
}

/// Base value a mapped value was computed from
struct MapContext<T> {
    original: T,
    original_context: Option<Context>,
}

impl<A, U> Map<A, U>
where
    A: Arbitrary,
    U: Clone + std::fmt::Debug + 'static,
{
    pub(crate) fn new<F>(base: A, mapper: F, unmapper: Option<Unmapper<A::Value, U>>) -> Self
    where
        F: Fn(A::Value) -> U + 'static,
    {
        Self {
            base,
            mapper: Rc::new(mapper),
            unmapper,
        }
    }

    fn map_value(mapper: &Mapper<A::Value, U>, value: Value<A::Value>) -> Value<U> {
        value.map_parts(|original, original_context| {
            let mapped = mapper(original.clone());
            let context = MapContext {
                original,
                original_context,
            };
            (mapped, Some(into_context(context)))
        })
    }

    fn map_stream(&self, stream: Shrinks<A::Value>) -> Shrinks<U> {
        let mapper = Rc::clone(&self.mapper);
        stream.map(move |value| Self::map_value(&mapper, value))
    }
}

impl<A, U> Arbitrary for Map<A, U>
where
    A: Arbitrary,
    U: Clone + std::fmt::Debug + 'static,
{
    type Value = U;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<U> {
        let source = self.base.generate(rng, bias);
        let claims_inverse = cfg!(debug_assertions)
            && self.unmapper.is_some()
            && self.base.can_shrink_without_context(source.value_unchecked());
        let generated = Self::map_value(&self.mapper, source);
        debug_assert!(
            !claims_inverse || self.can_shrink_without_context(generated.value_unchecked()),
            "unmapper does not invert the mapper on {:?}",
            generated.value_unchecked()
        );
        generated
    }

    fn can_shrink_without_context(&self, value: &U) -> bool {
        match &self.unmapper {
            Some(unmapper) => {
                unmapper(value).is_some_and(|base| self.base.can_shrink_without_context(&base))
            }
            None => false,
        }
    }

    fn shrink(&self, value: &U, context: Option<&Context>) -> Shrinks<U> {
        if let Some(context) = context_as::<MapContext<A::Value>>(context) {
            let stream = self
                .base
                .shrink(&context.original, context.original_context.as_ref());
            return self.map_stream(stream);
        }
        let Some(unmapper) = &self.unmapper else {
            tracing::trace!("mapped value without context or unmapper, nothing to shrink");
            return Shrinks::nil();
        };
        match unmapper(value) {
            Some(base) if self.base.can_shrink_without_context(&base) => {
                self.map_stream(self.base.shrink(&base, None))
            }
            _ => Shrinks::nil(),
        }
    }
}
