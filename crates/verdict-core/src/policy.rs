//! Resolution policy: pros/cons comparison with an injectable tie-break.
//!
//! Pure and stateless apart from the tie-break strategy, which is a named
//! dependency specifically so tests can substitute a deterministic source.
//! Starred items are advisory display state and are never consulted here.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// The binary result of a resolved decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Yes,
    No,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Yes => write!(f, "YES"),
            Verdict::No => write!(f, "NO"),
        }
    }
}

/// Which list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Pro,
    Con,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Pro => write!(f, "pro"),
            Side::Con => write!(f, "con"),
        }
    }
}

/// Tie-break strategy, consulted only when pros and cons are equal in count.
pub trait TieBreak {
    fn flip(&mut self) -> Verdict;
}

/// Production tie-break: uniform 50/50 coin.
#[derive(Debug, Default)]
pub struct CoinFlip;

impl TieBreak for CoinFlip {
    fn flip(&mut self) -> Verdict {
        if rand::thread_rng().gen_bool(0.5) {
            Verdict::Yes
        } else {
            Verdict::No
        }
    }
}

/// Fixed tie-break for deterministic tests and forced flows.
#[derive(Debug, Clone, Copy)]
pub struct FixedTieBreak(pub Verdict);

impl TieBreak for FixedTieBreak {
    fn flip(&mut self) -> Verdict {
        self.0
    }
}

/// Majority wins; equal counts fall through to the tie-break.
pub fn resolve(pros: usize, cons: usize, tie: &mut dyn TieBreak) -> Verdict {
    if pros > cons {
        Verdict::Yes
    } else if cons > pros {
        Verdict::No
    } else {
        tie.flip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn majority_of_pros_wins() {
        let mut tie = FixedTieBreak(Verdict::No);
        assert_eq!(resolve(2, 1, &mut tie), Verdict::Yes);
    }

    #[test]
    fn majority_of_cons_wins() {
        let mut tie = FixedTieBreak(Verdict::Yes);
        assert_eq!(resolve(1, 3, &mut tie), Verdict::No);
    }

    #[test]
    fn tie_delegates_to_strategy() {
        assert_eq!(resolve(2, 2, &mut FixedTieBreak(Verdict::Yes)), Verdict::Yes);
        assert_eq!(resolve(2, 2, &mut FixedTieBreak(Verdict::No)), Verdict::No);
    }

    proptest! {
        #[test]
        fn unequal_counts_never_consult_the_coin(pros in 0usize..10, cons in 0usize..10) {
            prop_assume!(pros != cons);
            // Both fixed strategies must agree when counts differ.
            let yes = resolve(pros, cons, &mut FixedTieBreak(Verdict::Yes));
            let no = resolve(pros, cons, &mut FixedTieBreak(Verdict::No));
            prop_assert_eq!(yes, no);
            let expected = if pros > cons { Verdict::Yes } else { Verdict::No };
            prop_assert_eq!(yes, expected);
        }
    }
}
