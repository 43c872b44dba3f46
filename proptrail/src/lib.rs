#![allow(clippy::type_complexity)]

//! # Proptrail - Property-Based Testing for Rust
//!
//! Proptrail generates random inputs for a property, and when the property
//! fails, shrinks the input to a small counterexample. Every run is driven by
//! a seed; a failing run also reports a replay path, and the seed and path
//! together reproduce the counterexample without searching again.
//!
//! ## Quick Start
//!
//! ```rust
//! use proptrail::{Parameters, check, integer, property};
//!
//! let commutative = property((integer(-100i32, 100), integer(-100i32, 100)), |(a, b)| {
//!     a + b == b + a
//! });
//! let details = check(&commutative, Parameters::new().seed(42));
//! assert!(!details.failed);
//! ```
//!
//! A failing property reports its smallest counterexample:
//!
//! ```rust
//! use proptrail::{Parameters, array, check, nat, property};
//!
//! let short = property(array(nat()), |items| items.len() < 5);
//! let details = check(&short, Parameters::new().seed(1));
//! assert_eq!(details.counterexample.map(|items| items.len()), Some(5));
//! ```

pub mod arbitrary;
pub mod combinators;
pub mod config;
pub mod error;
pub mod execution;
pub mod path;
pub mod primitives;
pub mod property;
pub mod random;
pub mod shrink;
pub mod stream;
pub mod test_runner;
pub mod value;

pub use arbitrary::{Arbitrary, BoxedArbitrary};
pub use combinators::{
    ArrayArbitrary, Chain, CloneOnRead, DepthContext, Filter, LetRec, Map, Memo, NoBias, NoShrink,
    OneOf, Tie, TiedArbitrary, array, letrec, memo, one_of, one_of_weighted,
};
pub use config::{
    ConfigError, Parameters, QualifiedParameters, Verbosity, configure_global,
    read_configure_global, reset_configure_global,
};
pub use error::PropertyError;
pub use execution::{
    ExecutionStatus, ExecutionTree, RunDetails, assert, assert_async, check, check_async,
};
pub use path::{Decision, PathError, ReplayPath};
pub use primitives::*;
pub use property::{
    AsyncProperty, Outcome, PreconditionFailure, PredicateOutcome, Property, PropertyCore,
    async_property, pre, property,
};
pub use random::Random;
pub use shrink::{ShrinkConfig, ShrinkEngine, ShrinkResult, ShrinkSearch};
pub use stream::{Shrinks, Stream};
pub use test_runner::format_run_details;
pub use value::{Context, Value};
