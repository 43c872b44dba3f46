//! Arbitraries built out of other arbitraries.

pub mod array;
pub mod chain;
pub mod filter;
pub mod map;
pub mod modifiers;
pub mod oneof;
pub mod recursive;
pub mod tuple;

pub use array::{ArrayArbitrary, array};
pub use chain::Chain;
pub use filter::Filter;
pub use map::Map;
pub use modifiers::{CloneOnRead, NoBias, NoShrink};
pub use oneof::{DepthContext, OneOf, one_of, one_of_weighted};
pub use recursive::{LetRec, Memo, Tie, TiedArbitrary, letrec, memo};
pub use tuple::TupleContext;
