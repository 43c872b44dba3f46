//! Replay paths: the decisions a run took, as a compact string.
//!
//! A path lists, in order, one decision per trial up to the failing one and
//! then one decision per shrink candidate evaluated:
//!
//! - `-`: the trial passed, or the shrink candidate was skipped
//! - `+`: the trial failed, or the shrink search descended into the candidate
//!
//! Runs of three or more identical decisions are written `<count><symbol>`,
//! so `"4-+2-+"` stands for `----+--+`. Together with the seed, a path is
//! enough to reproduce a counterexample without searching again.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One step of a replay path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Trial passed, or shrink candidate skipped
    Skip,
    /// Trial failed, or shrink candidate kept
    Descend,
}

impl Decision {
    fn symbol(self) -> char {
        match self {
            Decision::Skip => '-',
            Decision::Descend => '+',
        }
    }

    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '-' => Some(Decision::Skip),
            '+' => Some(Decision::Descend),
            _ => None,
        }
    }
}

/// Errors raised while parsing or replaying a path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("invalid character {character:?} at position {position} in replay path")]
    UnknownCharacter { character: char, position: usize },

    #[error("zero repeat count at position {position} in replay path")]
    ZeroCount { position: usize },

    #[error("repeat count at position {position} is not followed by a decision")]
    DanglingCount { position: usize },

    #[error("repeat count at position {position} is too large")]
    CountOverflow { position: usize },

    #[error("replay path does not select a failing trial")]
    NoFailingTrial,

    #[error("replay path refers to a shrink candidate that does not exist")]
    MissingCandidate,

    #[error("replay path selects trial {trial} but the property ran {available} trials")]
    TrialOutOfRange { trial: usize, available: usize },
}

/// Ordered sequence of decisions
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReplayPath {
    decisions: Vec<Decision>,
}

impl ReplayPath {
    /// The empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decision
    pub fn push(&mut self, decision: Decision) {
        self.decisions.push(decision);
    }

    /// All decisions in order
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Encode with run-length compression
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        let mut iter = self.decisions.iter().copied().peekable();
        while let Some(decision) = iter.next() {
            let mut count = 1usize;
            while iter.peek() == Some(&decision) {
                iter.next();
                count += 1;
            }
            if count >= 3 {
                out.push_str(&count.to_string());
                out.push(decision.symbol());
            } else {
                for _ in 0..count {
                    out.push(decision.symbol());
                }
            }
        }
        out
    }

    /// Decode a string produced by [`ReplayPath::stringify`].
    ///
    /// Counts are accepted in front of any decision, even when shorter than
    /// three.
    pub fn parse(encoded: &str) -> Result<Self, PathError> {
        let mut decisions = Vec::new();
        let mut count: Option<(usize, usize)> = None;

        for (position, character) in encoded.chars().enumerate() {
            if let Some(digit) = character.to_digit(10) {
                let (start, current) = count.unwrap_or((position, 0));
                let next = current
                    .checked_mul(10)
                    .and_then(|c| c.checked_add(digit as usize))
                    .ok_or(PathError::CountOverflow { position: start })?;
                count = Some((start, next));
                continue;
            }

            let Some(decision) = Decision::from_symbol(character) else {
                return Err(PathError::UnknownCharacter {
                    character,
                    position,
                });
            };
            match count.take() {
                Some((start, 0)) => return Err(PathError::ZeroCount { position: start }),
                Some((_, repeat)) => decisions.extend(std::iter::repeat_n(decision, repeat)),
                None => decisions.push(decision),
            }
        }

        if let Some((start, _)) = count {
            return Err(PathError::DanglingCount { position: start });
        }
        Ok(Self { decisions })
    }
}

impl fmt::Display for ReplayPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

impl FromStr for ReplayPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<Decision>> for ReplayPath {
    fn from(decisions: Vec<Decision>) -> Self {
        Self { decisions }
    }
}

/// Replay plan derived from a path: which trial failed and which shrink
/// candidates to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReplayPlan {
    /// Index of the failing trial
    pub failing_trial: usize,
    /// Decisions for shrink candidates, in evaluation order
    pub shrink: Vec<Decision>,
}

impl ReplayPlan {
    pub(crate) fn from_path(path: &ReplayPath) -> Result<Self, PathError> {
        let decisions = path.decisions();
        let failing_trial = decisions
            .iter()
            .position(|d| *d == Decision::Descend)
            .ok_or(PathError::NoFailingTrial)?;
        Ok(Self {
            failing_trial,
            shrink: decisions[failing_trial + 1..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Decision::{Descend as D, Skip as S};

    #[test]
    fn test_empty_path() {
        assert_eq!(ReplayPath::new().stringify(), "");
        assert_eq!(ReplayPath::parse("").unwrap(), ReplayPath::new());
    }

    #[test]
    fn test_short_runs_are_literal() {
        let path = ReplayPath::from(vec![S, S, D, D, S]);
        assert_eq!(path.stringify(), "--++-");
        assert_eq!(ReplayPath::parse("--++-").unwrap(), path);
    }

    #[test]
    fn test_long_runs_are_counted() {
        let path = ReplayPath::from(vec![S, S, S, S, D, S, S, S]);
        assert_eq!(path.stringify(), "4-+3-");
        assert_eq!(ReplayPath::parse("4-+3-").unwrap(), path);
    }

    #[test]
    fn test_multi_digit_counts() {
        let path = ReplayPath::from(vec![S; 1234]);
        assert_eq!(path.stringify(), "1234-");
        assert_eq!(ReplayPath::parse("1234-").unwrap().len(), 1234);
    }

    #[test]
    fn test_counts_below_three_are_accepted() {
        assert_eq!(
            ReplayPath::parse("2-1+").unwrap(),
            ReplayPath::from(vec![S, S, D])
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ReplayPath::parse("--x+"),
            Err(PathError::UnknownCharacter {
                character: 'x',
                position: 2
            })
        );
        assert_eq!(
            ReplayPath::parse("+0-"),
            Err(PathError::ZeroCount { position: 1 })
        );
        assert_eq!(
            ReplayPath::parse("+12"),
            Err(PathError::DanglingCount { position: 1 })
        );
        assert!(matches!(
            ReplayPath::parse("99999999999999999999999-"),
            Err(PathError::CountOverflow { position: 0 })
        ));
        assert!(ReplayPath::parse("1:0").is_err());
    }

    #[test]
    fn test_display_and_from_str() {
        let path: ReplayPath = "3+-".parse().unwrap();
        assert_eq!(path.to_string(), "3+-");
        assert_eq!(path.decisions(), &[D, D, D, S]);
    }

    #[test]
    fn test_replay_plan() {
        let plan = ReplayPlan::from_path(&"3-+-+".parse().unwrap()).unwrap();
        assert_eq!(plan.failing_trial, 3);
        assert_eq!(plan.shrink, vec![S, D]);

        assert_eq!(
            ReplayPlan::from_path(&"5-".parse().unwrap()),
            Err(PathError::NoFailingTrial)
        );
        assert_eq!(
            ReplayPlan::from_path(&ReplayPath::new()),
            Err(PathError::NoFailingTrial)
        );
    }
}
