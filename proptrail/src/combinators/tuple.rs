//! Tuples of arbitraries are arbitraries of tuples.

use crate::arbitrary::Arbitrary;
use crate::random::Random;
use crate::stream::{Shrinks, Stream};
use crate::value::{Context, Value, context_as, into_context};

/// Per-position contexts of a generated tuple
#[derive(Clone)]
pub struct TupleContext {
    contexts: Vec<Option<Context>>,
    clone_on_read: bool,
}

fn tuple_value<T>(value: T, contexts: Vec<Option<Context>>, clone_on_read: bool) -> Value<T> {
    let context = Some(into_context(TupleContext {
        contexts,
        clone_on_read,
    }));
    if clone_on_read {
        Value::with_clone_on_read(value, context)
    } else {
        Value::new(value, context)
    }
}

macro_rules! impl_tuple_arbitrary {
    ($len:expr; $($name:ident $idx:tt),+) => {
        impl<$($name: Arbitrary),+> Arbitrary for ($($name,)+) {
            type Value = ($($name::Value,)+);

            fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<Self::Value> {
                let generated = ($(self.$idx.generate(&mut rng.split(), bias),)+);
                let clone_on_read = false $(|| generated.$idx.has_to_be_cloned())+;
                let parts = ($(generated.$idx.into_parts(),)+);
                let contexts = vec![$(parts.$idx.1),+];
                tuple_value(($(parts.$idx.0,)+), contexts, clone_on_read)
            }

            fn can_shrink_without_context(&self, value: &Self::Value) -> bool {
                true $(&& self.$idx.can_shrink_without_context(&value.$idx))+
            }

            fn shrink(&self, value: &Self::Value, context: Option<&Context>) -> Shrinks<Self::Value> {
                let (contexts, clone_on_read) = match context_as::<TupleContext>(context) {
                    Some(tuple) => (tuple.contexts.clone(), tuple.clone_on_read),
                    None => (vec![None; $len], false),
                };
                let mut shrinks = Stream::nil();
                $(
                    let current = value.clone();
                    let current_contexts = contexts.clone();
                    let position = self
                        .$idx
                        .shrink(&value.$idx, contexts[$idx].as_ref())
                        .map(move |candidate| {
                            let (item, item_context) = candidate.into_parts();
                            let mut next = current.clone();
                            next.$idx = item;
                            let mut next_contexts = current_contexts.clone();
                            next_contexts[$idx] = item_context;
                            tuple_value(next, next_contexts, clone_on_read)
                        });
                    shrinks = shrinks.join(position);
                )+
                shrinks
            }
        }
    };
}

impl_tuple_arbitrary!(1; A 0);
impl_tuple_arbitrary!(2; A 0, B 1);
impl_tuple_arbitrary!(3; A 0, B 1, C 2);
impl_tuple_arbitrary!(4; A 0, B 1, C 2, D 3);
impl_tuple_arbitrary!(5; A 0, B 1, C 2, D 3, E 4);
impl_tuple_arbitrary!(6; A 0, B 1, C 2, D 3, E 4, F 5);
impl_tuple_arbitrary!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_tuple_arbitrary!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
