//! Laws every shrinker must respect, checked over many generated values

use proptrail::{
    Arbitrary, Parameters, Random, Verbosity, array, char, check, constant_from, integer, nat,
    option, property, string, string_of,
};

const SAMPLES: usize = 200;
const CANDIDATES: usize = 50;

fn for_each_generated<A: Arbitrary>(
    arbitrary: &A,
    seed: u64,
    mut check: impl FnMut(&A::Value, Vec<A::Value>),
) {
    let mut rng = Random::new(seed);
    for run in 0..SAMPLES {
        let bias = (run % 2 == 0).then_some(2);
        let generated = arbitrary.generate(&mut rng, bias);
        let candidates = arbitrary
            .shrink(generated.value_unchecked(), generated.context())
            .take(CANDIDATES)
            .map(|candidate| candidate.value_unchecked().clone())
            .collect();
        check(generated.value_unchecked(), candidates);
    }
}

#[test]
fn test_integer_candidates_are_in_domain_and_closer_to_target() {
    let arb = integer(-300i32, 700);
    for_each_generated(&arb, 1, |value, candidates| {
        for candidate in candidates {
            assert!(arb.can_shrink_without_context(&candidate));
            assert!(
                candidate.abs() < value.abs(),
                "{candidate} is not simpler than {value}"
            );
        }
    });
}

#[test]
fn test_positive_range_shrinks_toward_min() {
    let arb = integer(50u16, 900);
    for_each_generated(&arb, 2, |value, candidates| {
        for candidate in candidates {
            assert!((50..=900).contains(&candidate));
            assert!(candidate < *value);
        }
    });
}

#[test]
fn test_array_candidates_are_in_domain_and_not_longer() {
    let arb = array(integer(0u8, 50)).min_length(2).max_length(12);
    for_each_generated(&arb, 3, |value, candidates| {
        for candidate in candidates {
            assert!(arb.can_shrink_without_context(&candidate));
            assert!(candidate.len() >= 2);
            assert!(candidate.len() <= value.len());
            if candidate.len() == value.len() {
                let total = |items: &[u8]| items.iter().map(|v| u32::from(*v)).sum::<u32>();
                assert!(
                    total(&candidate) <= total(value),
                    "{candidate:?} is not simpler than {value:?}"
                );
            }
        }
    });
}

#[test]
fn test_string_candidates_are_in_domain_and_not_longer() {
    let arb = string();
    for_each_generated(&arb, 4, |value, candidates| {
        for candidate in candidates {
            assert!(arb.can_shrink_without_context(&candidate));
            assert!(candidate.chars().count() <= value.chars().count());
            assert!(candidate.chars().all(|c| (' '..='~').contains(&c)));
        }
    });
}

#[test]
fn test_filter_never_yields_rejected_values() {
    let evens = integer(0i32, 10_000).filter(|v| v % 2 == 0);
    for_each_generated(&evens, 5, |value, candidates| {
        assert_eq!(value % 2, 0);
        for candidate in candidates {
            assert_eq!(candidate % 2, 0, "filter let {candidate} through");
        }
    });
}

#[test]
fn test_unmapper_inverts_mapper() {
    let doubled = integer(0i32, 100).map_with_unmapper(|n| n * 2, |m| (m % 2 == 0).then(|| m / 2));
    for_each_generated(&doubled, 6, |value, candidates| {
        assert!(doubled.can_shrink_without_context(value));
        for candidate in candidates {
            assert_eq!(candidate % 2, 0);
            assert!(doubled.can_shrink_without_context(&candidate));
        }
    });
    assert!(!doubled.can_shrink_without_context(&7));
    assert!(!doubled.can_shrink_without_context(&202));

    let from_outside: Vec<i32> = doubled
        .shrink(&40, None)
        .map(|candidate| *candidate.value_unchecked())
        .collect();
    assert_eq!(from_outside.first(), Some(&0));
    assert!(from_outside.iter().all(|v| v % 2 == 0 && *v < 40));
}

#[test]
fn test_contextless_shrinks_match_contextual_domain() {
    let letters = string_of(array(char()).max_length(6));
    assert!(letters.can_shrink_without_context(&"abc".to_string()));
    assert!(!letters.can_shrink_without_context(&"abcdefgh".to_string()));
    assert!(!letters.can_shrink_without_context(&"é".to_string()));

    let first = letters
        .shrink(&"abc".to_string(), None)
        .next()
        .map(|candidate| candidate.value_unchecked().clone());
    assert_eq!(first.as_deref(), Some(""));
}

#[test]
fn test_option_and_constants_shrink_to_their_simplest() {
    let maybe = option(integer(0i32, 10));
    for_each_generated(&maybe, 7, |value, candidates| {
        if value.is_some() {
            assert_eq!(candidates.first(), Some(&None));
        }
        for candidate in candidates {
            assert!(maybe.can_shrink_without_context(&candidate));
        }
    });

    let colours = constant_from(vec!["red", "green", "blue"]);
    let candidates: Vec<&str> = colours
        .shrink(&"blue", None)
        .map(|candidate| *candidate.value_unchecked())
        .collect();
    assert_eq!(candidates, vec!["red"]);
    assert!(colours.shrink(&"red", None).next().is_none());
}

/// Every accepted step of a search, oldest first
fn accepted_steps<A: Arbitrary>(
    arbitrary: A,
    seed: u64,
    predicate: impl Fn(A::Value) -> bool + 'static,
) -> Vec<A::Value>
where
    A::Value: PartialEq,
{
    let details = check(
        &property(arbitrary, predicate),
        Parameters::new().seed(seed).verbose(Verbosity::Verbose),
    );
    assert!(details.failed, "seed {seed} did not fail");
    assert_eq!(details.failures.len(), details.num_shrinks + 1);
    assert_eq!(details.failures.last(), details.counterexample.as_ref());
    details.failures
}

#[test]
fn test_array_search_never_grows() {
    let weight = |items: &Vec<u32>| items.iter().map(|v| u64::from(*v)).sum::<u64>();
    for seed in 0..20 {
        let steps = accepted_steps(array(nat()), seed, move |items| weight(&items) < 1000);
        for pair in steps.windows(2) {
            assert!(pair[1].len() <= pair[0].len(), "{:?} after {:?}", pair[1], pair[0]);
            assert!(weight(&pair[1]) <= weight(&pair[0]), "{:?} after {:?}", pair[1], pair[0]);
        }
    }
}

#[test]
fn test_string_search_never_grows() {
    let weight = |s: &String| s.chars().map(u32::from).sum::<u32>();
    for seed in 0..20 {
        let steps = accepted_steps(string(), seed, |s| s.chars().count() < 4);
        for pair in steps.windows(2) {
            assert!(pair[1].chars().count() <= pair[0].chars().count());
            assert!(weight(&pair[1]) <= weight(&pair[0]), "{:?} after {:?}", pair[1], pair[0]);
        }
        assert_eq!(steps.last().map(|s| s.chars().count()), Some(4));
    }
}
