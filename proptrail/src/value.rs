//! Generated values and their shrink contexts.

use std::any::Any;
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Opaque shrink state attached to a generated value.
///
/// Only the arbitrary that produced a context knows its concrete type and
/// downcasts it; everyone else passes it along untouched.
pub type Context = Rc<dyn Any>;

/// Downcast an optional context to the concrete type an arbitrary stored in it
pub fn context_as<C: 'static>(context: Option<&Context>) -> Option<&C> {
    context.and_then(|c| c.downcast_ref::<C>())
}

/// Wrap a concrete context
pub fn into_context<C: 'static>(context: C) -> Context {
    Rc::new(context)
}

/// A generated value paired with the private state needed to shrink it.
pub struct Value<T> {
    value: T,
    context: Option<Context>,
    has_to_be_cloned: bool,
    read_once: Cell<bool>,
}

impl<T> Value<T> {
    /// Create a value that is handed out as-is on every read
    pub fn new(value: T, context: Option<Context>) -> Self {
        Self {
            value,
            context,
            has_to_be_cloned: false,
            read_once: Cell::new(false),
        }
    }

    /// Create a value that is cloned on every read after the first one.
    ///
    /// Meant for types with interior mutability: a predicate mutating its
    /// input through a shared handle would otherwise corrupt the value the
    /// shrinker keeps working from.
    pub fn with_clone_on_read(value: T, context: Option<Context>) -> Self {
        Self {
            value,
            context,
            has_to_be_cloned: true,
            read_once: Cell::new(false),
        }
    }

    /// The raw value, never cloned. Reserved for shrinking and reporting.
    pub fn value_unchecked(&self) -> &T {
        &self.value
    }

    /// Shrink context attached by the producing arbitrary
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Whether reads after the first one produce a fresh clone
    pub fn has_to_be_cloned(&self) -> bool {
        self.has_to_be_cloned
    }

    /// Split into raw value and context
    pub fn into_parts(self) -> (T, Option<Context>) {
        (self.value, self.context)
    }

    /// Build a new value of another type, keeping the clone-on-read flag
    pub fn map_parts<U>(self, f: impl FnOnce(T, Option<Context>) -> (U, Option<Context>)) -> Value<U> {
        let has_to_be_cloned = self.has_to_be_cloned;
        let (value, context) = f(self.value, self.context);
        Value {
            value,
            context,
            has_to_be_cloned,
            read_once: Cell::new(false),
        }
    }
}

impl<T: Clone> Value<T> {
    /// Read the value.
    ///
    /// The first read borrows the raw value. Later reads clone it when the
    /// value was flagged clone-on-read.
    pub fn value(&self) -> Cow<'_, T> {
        if !self.has_to_be_cloned {
            return Cow::Borrowed(&self.value);
        }
        if !self.read_once.replace(true) {
            return Cow::Borrowed(&self.value);
        }
        Cow::Owned(self.value.clone())
    }
}

impl<T: Clone> Clone for Value<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            context: self.context.clone(),
            has_to_be_cloned: self.has_to_be_cloned,
            read_once: Cell::new(false),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("value", &self.value)
            .field("has_context", &self.context.is_some())
            .field("has_to_be_cloned", &self.has_to_be_cloned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_plain_value_is_borrowed_on_every_read() {
        let value = Value::new(vec![1, 2, 3], None);
        assert!(!value.has_to_be_cloned());
        assert!(matches!(value.value(), Cow::Borrowed(_)));
        assert!(matches!(value.value(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_clone_on_read_clones_after_first_read() {
        let value = Value::with_clone_on_read(vec![1, 2, 3], None);
        assert!(value.has_to_be_cloned());
        assert!(matches!(value.value(), Cow::Borrowed(_)));
        assert!(matches!(value.value(), Cow::Owned(_)));
        assert!(matches!(value.value(), Cow::Owned(_)));
    }

    #[test]
    fn test_clone_on_read_protects_against_interior_mutation() {
        #[derive(Debug)]
        struct Shared(Rc<RefCell<Vec<i32>>>);
        impl Clone for Shared {
            fn clone(&self) -> Self {
                Shared(Rc::new(RefCell::new(self.0.borrow().clone())))
            }
        }

        let value = Value::with_clone_on_read(Shared(Rc::new(RefCell::new(vec![1]))), None);
        let _first = value.value();

        let second = value.value().into_owned();
        second.0.borrow_mut().push(99);

        assert_eq!(*value.value_unchecked().0.borrow(), vec![1]);
    }

    #[test]
    fn test_context_downcast() {
        let value = Value::new(5u8, Some(into_context(17i128)));
        assert_eq!(context_as::<i128>(value.context()), Some(&17));
        assert_eq!(context_as::<u64>(value.context()), None);
        assert_eq!(context_as::<i128>(None), None);
    }

    #[test]
    fn test_map_parts_keeps_clone_flag() {
        let value = Value::with_clone_on_read(3, None);
        let mapped = value.map_parts(|v, ctx| (v.to_string(), ctx));
        assert!(mapped.has_to_be_cloned());
        assert_eq!(mapped.value_unchecked(), "3");
    }

    #[test]
    fn test_clone_resets_read_state() {
        let value = Value::with_clone_on_read(1, None);
        let _ = value.value();
        let copy = value.clone();
        assert!(matches!(copy.value(), Cow::Borrowed(_)));
    }
}
