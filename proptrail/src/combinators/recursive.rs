//! Self-referential arbitraries.
//!
//! [`letrec`] declares a set of named arbitraries that may refer to each
//! other, [`memo`] builds one arbitrary per remaining depth.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::arbitrary::{Arbitrary, BoxedArbitrary};
use crate::random::Random;
use crate::stream::Shrinks;
use crate::value::{Context, Value};

struct Arena<T> {
    slots: RefCell<HashMap<String, BoxedArbitrary<T>>>,
}

/// Hands out references to slots of a [`letrec`] before they are defined
pub struct Tie<T> {
    arena: Weak<Arena<T>>,
}

impl<T: Clone + fmt::Debug + 'static> Tie<T> {
    /// Reference to the slot `name`, resolved on first use
    pub fn tie(&self, name: &str) -> TiedArbitrary<T> {
        TiedArbitrary {
            arena: Weak::clone(&self.arena),
            name: name.to_string(),
        }
    }
}

/// Deferred reference to a [`letrec`] slot.
///
/// Resolving a slot that was never defined panics: the definition itself is
/// broken, and the runner reports it as such.
pub struct TiedArbitrary<T> {
    arena: Weak<Arena<T>>,
    name: String,
}

impl<T> Clone for TiedArbitrary<T> {
    fn clone(&self) -> Self {
        Self {
            arena: Weak::clone(&self.arena),
            name: self.name.clone(),
        }
    }
}

impl<T: Clone + fmt::Debug + 'static> TiedArbitrary<T> {
    fn resolve(&self) -> BoxedArbitrary<T> {
        let Some(arena) = self.arena.upgrade() else {
            panic!("letrec slot `{}` used after its definitions were dropped", self.name);
        };
        let slot = arena.slots.borrow().get(&self.name).cloned();
        match slot {
            Some(arbitrary) => arbitrary,
            None => panic!("letrec slot `{}` is not defined", self.name),
        }
    }
}

impl<T: Clone + fmt::Debug + 'static> Arbitrary for TiedArbitrary<T> {
    type Value = T;

    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        self.resolve().generate(rng, bias)
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.resolve().can_shrink_without_context(value)
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        self.resolve().shrink(value, context)
    }
}

/// Named arbitraries produced by [`letrec`]
pub struct LetRec<T> {
    arena: Rc<Arena<T>>,
}

impl<T: Clone + fmt::Debug + 'static> LetRec<T> {
    /// The arbitrary defined under `name`.
    ///
    /// The returned arbitrary keeps every slot alive, so it can outlive the
    /// `LetRec`.
    pub fn get(&self, name: &str) -> Option<BoxedArbitrary<T>> {
        let defined = self.arena.slots.borrow().get(name).cloned()?;
        Some(
            Anchored {
                _arena: Rc::clone(&self.arena),
                inner: defined,
            }
            .boxed(),
        )
    }

    /// Names of the defined slots
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.arena.slots.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

/// A slot's arbitrary holding the arena alive
struct Anchored<T> {
    _arena: Rc<Arena<T>>,
    inner: BoxedArbitrary<T>,
}

impl<T: Clone + fmt::Debug + 'static> Arbitrary for Anchored<T> {
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
}

/// Define mutually recursive arbitraries.
///
/// `builder` receives a [`Tie`] to refer to any slot, defined or not yet, and
/// returns the definition of every slot.
///
/// ```rust
/// use proptrail::{Arbitrary, constant, letrec, one_of};
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Tree {
///     Leaf,
///     Node(Box<Tree>, Box<Tree>),
/// }
///
/// let defs = letrec(|tie| {
///     let node = (tie.tie("tree"), tie.tie("tree"))
///         .map(|(l, r)| Tree::Node(Box::new(l), Box::new(r)));
///     vec![(
///         "tree",
///         one_of(vec![constant(Tree::Leaf).boxed(), node.boxed()])
///             .max_depth(4)
///             .boxed(),
///     )]
/// });
/// let tree = defs.get("tree").unwrap();
/// # let _ = tree;
/// ```
pub fn letrec<T, F>(builder: F) -> LetRec<T>
where
    T: Clone + fmt::Debug + 'static,
    F: FnOnce(&Tie<T>) -> Vec<(&'static str, BoxedArbitrary<T>)>,
{
    let arena = Rc::new(Arena {
        slots: RefCell::new(HashMap::new()),
    });
    let tie = Tie {
        arena: Rc::downgrade(&arena),
    };
    let definitions = builder(&tie);
    {
        let mut slots = arena.slots.borrow_mut();
        for (name, arbitrary) in definitions {
            slots.insert(name.to_string(), arbitrary);
        }
    }
    tracing::trace!(slots = arena.slots.borrow().len(), "letrec defined");
    LetRec { arena }
}

/// Default remaining depth of [`Memo::default_depth`]
pub const DEFAULT_MEMO_DEPTH: usize = 10;

type MemoBuilder<T> = dyn Fn(&Memo<T>, usize) -> BoxedArbitrary<T>;

/// Depth-indexed family of arbitraries, see [`memo`]
pub struct Memo<T> {
    builder: Rc<MemoBuilder<T>>,
    cache: Rc<RefCell<HashMap<usize, BoxedArbitrary<T>>>>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            builder: Rc::clone(&self.builder),
            cache: Rc::clone(&self.cache),
        }
    }
}

impl<T: Clone + fmt::Debug + 'static> Memo<T> {
    /// Arbitrary for a remaining depth of `depth`, built once per depth
    pub fn at(&self, depth: usize) -> BoxedArbitrary<T> {
        if let Some(cached) = self.cache.borrow().get(&depth) {
            return cached.clone();
        }
        let built = (self.builder)(self, depth);
        self.cache
            .borrow_mut()
            .entry(depth)
            .or_insert(built)
            .clone()
    }

    /// Arbitrary for [`DEFAULT_MEMO_DEPTH`]
    pub fn default_depth(&self) -> BoxedArbitrary<T> {
        self.at(DEFAULT_MEMO_DEPTH)
    }
}

/// Build recursive arbitraries with an explicit remaining depth.
///
/// `builder` gets the memo itself and the remaining depth `n`, and refers to
/// smaller structures through `memo.at(n - 1)`. It must not recurse once `n`
/// reaches zero.
pub fn memo<T, F>(builder: F) -> Memo<T>
where
    T: Clone + fmt::Debug + 'static,
    F: Fn(&Memo<T>, usize) -> BoxedArbitrary<T> + 'static,
{
    Memo {
        builder: Rc::new(builder),
        cache: Rc::new(RefCell::new(HashMap::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::oneof::one_of;
    use crate::primitives::{constant, integer};

    #[derive(Debug, Clone, PartialEq)]
    enum Tree {
        Leaf(u8),
        Node(Box<Tree>, Box<Tree>),
    }

    impl Tree {
        fn depth(&self) -> usize {
            match self {
                Tree::Leaf(_) => 0,
                Tree::Node(l, r) => 1 + l.depth().max(r.depth()),
            }
        }
    }

    fn tree_letrec(max_depth: usize) -> LetRec<Tree> {
        letrec(move |tie| {
            let leaf = integer(0u8, 9).map(Tree::Leaf);
            let node = (tie.tie("tree"), tie.tie("tree"))
                .map(|(l, r)| Tree::Node(Box::new(l), Box::new(r)));
            vec![(
                "tree",
                one_of(vec![leaf.boxed(), node.boxed()])
                    .max_depth(max_depth)
                    .depth_identifier("recursive-tests-tree")
                    .boxed(),
            )]
        })
    }

    #[test]
    fn test_letrec_generates_bounded_trees() {
        let defs = tree_letrec(3);
        let tree = defs.get("tree").expect("tree slot");
        let mut rng = Random::new(4);
        let mut saw_node = false;
        for _ in 0..200 {
            let v = tree.generate(&mut rng, None);
            assert!(v.value_unchecked().depth() <= 3);
            saw_node |= matches!(v.value_unchecked(), Tree::Node(..));
        }
        assert!(saw_node);
    }

    #[test]
    fn test_letrec_handle_outlives_definitions() {
        let tree = tree_letrec(2).get("tree").expect("tree slot");
        let v = tree.generate(&mut Random::new(1), None);
        assert!(v.value_unchecked().depth() <= 2);
        let _ = tree.shrink(v.value_unchecked(), v.context()).count();
    }

    #[test]
    fn test_letrec_names_and_missing_slot() {
        let defs = letrec::<u8, _>(|_| vec![("a", constant(1u8).boxed()), ("b", constant(2u8).boxed())]);
        assert_eq!(defs.names(), vec!["a".to_string(), "b".to_string()]);
        assert!(defs.get("c").is_none());
    }

    #[test]
    #[should_panic(expected = "is not defined")]
    fn test_letrec_undefined_tie_panics_on_use() {
        let defs = letrec::<u8, _>(|tie| vec![("a", tie.tie("missing").boxed())]);
        let a = defs.get("a").expect("slot a");
        a.generate(&mut Random::new(0), None);
    }

    #[test]
    fn test_memo_builds_each_depth_once() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&calls);
        let tree = memo(move |memo: &Memo<Tree>, n| {
            log.borrow_mut().push(n);
            let leaf = integer(0u8, 9).map(Tree::Leaf).boxed();
            if n == 0 {
                return leaf;
            }
            let node = (memo.at(n - 1), memo.at(n - 1))
                .map(|(l, r)| Tree::Node(Box::new(l), Box::new(r)));
            one_of(vec![leaf, node.boxed()]).boxed()
        });

        let arb = tree.at(3);
        let _again = tree.at(3);
        assert_eq!(*calls.borrow(), vec![3, 2, 1, 0]);

        let mut rng = Random::new(8);
        for _ in 0..100 {
            assert!(arb.generate(&mut rng, None).value_unchecked().depth() <= 3);
        }
    }
}
