//! Lazy shrink streams.

use std::fmt;

use crate::value::Value;

/// Lazy, possibly long sequence of items.
///
/// Shrinkers return a `Stream<Value<T>>` ordered from the candidate closest to
/// the current value to the most different one. Nothing is computed before
/// it is pulled, so a consumer that stops early pays only for what it used.
pub struct Stream<V> {
    inner: Box<dyn Iterator<Item = V>>,
}

/// Stream of shrink candidates for values of type `T`
pub type Shrinks<T> = Stream<Value<T>>;

impl<V: 'static> Stream<V> {
    /// Wrap any iterator
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = V> + 'static,
    {
        Self {
            inner: Box::new(iter),
        }
    }

    /// The empty stream
    pub fn nil() -> Self {
        Self::new(std::iter::empty())
    }

    /// A stream yielding a single item
    pub fn once(item: V) -> Self {
        Self::new(std::iter::once(item))
    }

    /// A stream over already computed items
    pub fn of(items: Vec<V>) -> Self {
        Self::new(items.into_iter())
    }

    /// Defer building a stream until its first item is requested
    pub fn lazy<F>(build: F) -> Self
    where
        F: FnOnce() -> Stream<V> + 'static,
    {
        Self::new(std::iter::once_with(build).flatten())
    }

    /// Append another stream after this one
    pub fn join(self, other: Stream<V>) -> Self {
        Self::new(self.inner.chain(other))
    }

    /// Transform every item
    pub fn map<U: 'static, F>(self, f: F) -> Stream<U>
    where
        F: FnMut(V) -> U + 'static,
    {
        Stream::new(self.inner.map(f))
    }

    /// Keep the items matching `predicate`
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: FnMut(&V) -> bool + 'static,
    {
        Self::new(self.inner.filter(predicate))
    }

    /// Skip the first `n` items
    pub fn drop(self, n: usize) -> Self {
        Self::new(self.inner.skip(n))
    }

    /// Keep at most `n` items
    pub fn take(self, n: usize) -> Self {
        Self::new(self.inner.take(n))
    }
}

impl<V> Iterator for Stream<V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.inner.next()
    }
}

impl<V> fmt::Debug for Stream<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Stream { .. }")
    }
}
