//! Core arbitraries for integers, characters, strings and constants.

use std::fmt;
use std::marker::PhantomData;

use num_traits::PrimInt;

use crate::arbitrary::Arbitrary;
use crate::combinators::array::{ArrayArbitrary, array};
use crate::combinators::map::Map;
use crate::combinators::modifiers::NoBias;
use crate::combinators::oneof::{OneOf, one_of_weighted};
use crate::random::Random;
use crate::shrink::strategies::{bias_numeric_range, default_target, shrink_integer};
use crate::stream::{Shrinks, Stream};
use crate::value::{Context, Value, context_as, into_context};

/// Integer types that can be generated by [`IntegerArbitrary`].
///
/// Values are handled as `i128` internally, which covers every implementor
/// losslessly.
pub trait IntegerType: PrimInt + fmt::Debug + 'static {
    /// Widen to `i128`
    fn to_wide(self) -> i128;
    /// Narrow from `i128`, the value being known to fit
    fn from_wide(value: i128) -> Self;
}

macro_rules! impl_integer_type {
    ($($t:ty),*) => {
        $(
            impl IntegerType for $t {
                fn to_wide(self) -> i128 {
                    self as i128
                }

                fn from_wide(value: i128) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_integer_type!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Arbitrary for integers in an inclusive range.
///
/// Shrinks toward zero when the range contains it, otherwise toward the
/// bound closest to zero.
pub struct IntegerArbitrary<T> {
    min: i128,
    max: i128,
    _marker: PhantomData<fn() -> T>,
}

impl<T: IntegerType> IntegerArbitrary<T> {
    /// Integers in `[min, max]`.
    ///
    /// Panics if `min > max`.
    pub fn new(min: T, max: T) -> Self {
        assert!(min <= max, "integer arbitrary requires min <= max, got {min:?} > {max:?}");
        Self {
            min: min.to_wide(),
            max: max.to_wide(),
            _marker: PhantomData,
        }
    }

    /// Integers over the whole range of `T`
    pub fn full_range() -> Self {
        Self::new(T::min_value(), T::max_value())
    }

    /// Range actually drawn from for one generation
    fn compute_generate_range(&self, rng: &mut Random, bias: Option<u32>) -> (i128, i128) {
        let Some(bias) = bias.filter(|factor| *factor > 0) else {
            return (self.min, self.max);
        };
        if rng.next_int(1, i64::from(bias)) != 1 {
            return (self.min, self.max);
        }
        let ranges = bias_numeric_range(self.min, self.max);
        if ranges.len() == 1 {
            return ranges[0];
        }
        let len = ranges.len() as i64;
        let id = rng.next_int(-2 * (len - 1), len - 2);
        if id < 0 {
            ranges[0]
        } else {
            ranges[id as usize + 1]
        }
    }

    /// Whether the previous candidate sits right next to `current`, in which
    /// case re-trying it is the only move left
    fn is_last_chance_try(&self, current: i128, previous: i128) -> bool {
        if current > 0 {
            current == previous + 1 && current > self.min
        } else if current < 0 {
            current == previous - 1 && current < self.max
        } else {
            false
        }
    }

    fn shrink_toward(current: i128, target: i128, try_target_asap: bool) -> Shrinks<T> {
        Stream::new(
            shrink_integer(current, target, try_target_asap)
                .map(|(next, previous)| Value::new(T::from_wide(next), previous.map(into_context))),
        )
    }
}

impl<T> Clone for IntegerArbitrary<T> {
    fn clone(&self) -> Self {
        Self {
            min: self.min,
            max: self.max,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for IntegerArbitrary<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegerArbitrary")
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

impl<T: IntegerType> Arbitrary for IntegerArbitrary<T> {
    type Value = T;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        let (min, max) = self.compute_generate_range(rng, bias);
        Value::new(T::from_wide(rng.next_big_int(min, max)), None)
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        let value = value.to_wide();
        self.min <= value && value <= self.max
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        let current = value.to_wide();
        if let Some(&previous) = context_as::<i128>(context)
            && (previous == 0 || previous.signum() == current.signum())
        {
            if self.is_last_chance_try(current, previous) {
                return Stream::once(Value::new(T::from_wide(previous), None));
            }
            return Self::shrink_toward(current, previous, false);
        }
        Self::shrink_toward(current, default_target(self.min, self.max), true)
    }
}

/// Integers in `[min, max]`
pub fn integer<T: IntegerType>(min: T, max: T) -> IntegerArbitrary<T> {
    IntegerArbitrary::new(min, max)
}

/// Natural numbers in `[0, i32::MAX]`
pub fn nat() -> IntegerArbitrary<u32> {
    nat_max(i32::MAX as u32)
}

/// Natural numbers in `[0, max]`
pub fn nat_max(max: u32) -> IntegerArbitrary<u32> {
    IntegerArbitrary::new(0, max)
}

/// Arbitrary for booleans, shrinking `true` to `false`
pub type BooleanArbitrary = Map<NoBias<IntegerArbitrary<u8>>, bool>;

/// Booleans
pub fn boolean() -> BooleanArbitrary {
    integer(0u8, 1)
        .no_bias()
        .map_with_unmapper(|v| v == 1, |b: &bool| Some(u8::from(*b)))
}

/// Arbitrary for printable ASCII characters
pub type CharArbitrary = Map<IntegerArbitrary<u8>, char>;

/// Printable ASCII characters (`' '` to `'~'`), shrinking toward `' '`
pub fn char() -> CharArbitrary {
    integer(0x20u8, 0x7e).map_with_unmapper(char::from, |c: &char| u8::try_from(*c).ok())
}

/// Arbitrary for strings built from an array of characters
pub type StringArbitrary<A> = Map<ArrayArbitrary<A>, String>;

/// Strings of printable ASCII characters
pub fn string() -> StringArbitrary<CharArbitrary> {
    string_of(array(char()))
}

/// Strings whose characters and length come from `chars`.
///
/// ```rust
/// use proptrail::{array, char, string_of};
///
/// let short_words = string_of(array(char()).min_length(1).max_length(8));
/// # let _ = short_words;
/// ```
pub fn string_of<A>(chars: ArrayArbitrary<A>) -> StringArbitrary<A>
where
    A: Arbitrary<Value = char> + 'static,
{
    chars.map_with_unmapper(
        |chars: Vec<char>| chars.into_iter().collect(),
        |s: &String| Some(s.chars().collect()),
    )
}

/// Arbitrary always producing one of a fixed set of values.
///
/// Shrinks any value toward the first one.
#[derive(Debug, Clone)]
pub struct ConstantArbitrary<T> {
    values: Vec<T>,
}

impl<T: Clone + fmt::Debug + PartialEq + 'static> ConstantArbitrary<T> {
    /// Panics if `values` is empty.
    pub fn new(values: Vec<T>) -> Self {
        assert!(!values.is_empty(), "constant_from requires at least one value");
        Self { values }
    }
}

impl<T: Clone + fmt::Debug + PartialEq + 'static> Arbitrary for ConstantArbitrary<T> {
    type Value = T;

    fn generate(&self, rng: &mut Random, _bias: Option<u32>) -> Value<T> {
        if self.values.len() == 1 {
            return Value::new(self.values[0].clone(), Some(into_context(0usize)));
        }
        let index = rng.next_int(0, self.values.len() as i64 - 1) as usize;
        Value::new(self.values[index].clone(), Some(into_context(index)))
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.values.contains(value)
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        if context_as::<usize>(context) == Some(&0) || *value == self.values[0] {
            return Stream::nil();
        }
        Stream::once(Value::new(self.values[0].clone(), Some(into_context(0usize))))
    }
}

/// Always `value`
pub fn constant<T: Clone + fmt::Debug + PartialEq + 'static>(value: T) -> ConstantArbitrary<T> {
    ConstantArbitrary::new(vec![value])
}

/// One of `values`, picked uniformly
pub fn constant_from<T: Clone + fmt::Debug + PartialEq + 'static>(
    values: Vec<T>,
) -> ConstantArbitrary<T> {
    ConstantArbitrary::new(values)
}

struct NoneArbitrary<T>(PhantomData<fn() -> T>);

impl<T: Clone + fmt::Debug + 'static> Arbitrary for NoneArbitrary<T> {
    type Value = Option<T>;

    fn generate(&self, _rng: &mut Random, _bias: Option<u32>) -> Value<Option<T>> {
        Value::new(None, None)
    }

    fn can_shrink_without_context(&self, value: &Option<T>) -> bool {
        value.is_none()
    }

    fn shrink(&self, _value: &Option<T>, _context: Option<&Context>) -> Shrinks<Option<T>> {
        Stream::nil()
    }
}

/// `None` once in six draws, otherwise `Some` of a value from `arbitrary`.
///
/// `Some` values shrink to `None` first.
pub fn option<A>(arbitrary: A) -> OneOf<Option<A::Value>>
where
    A: Arbitrary + 'static,
{
    one_of_weighted(vec![
        (NoneArbitrary(PhantomData).boxed(), 1),
        (
            arbitrary
                .map_with_unmapper(Some, |v: &Option<A::Value>| v.clone())
                .boxed(),
            5,
        ),
    ])
    .with_cross_shrink()
    .first_fallback(None)
}
