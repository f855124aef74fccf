//! Verdict draws and vote aggregation

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::jury::member::Stance;

/// A member's answer to the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Yes,
    No,
    Maybe,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Yes => "yes",
            Verdict::No => "no",
            Verdict::Maybe => "maybe",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Draw one verdict from the stance's weight table.
pub fn draw_verdict<R: Rng + ?Sized>(stance: &Stance, rng: &mut R) -> Verdict {
    let weights = stance.verdict_weights();
    let dist = WeightedIndex::new(weights.iter().map(|(_, w)| *w))
        .expect("stance weight tables are static and non-zero");
    weights[dist.sample(rng)].0
}

/// Plurality vote over individual verdicts. Ties go to the verdict that
/// first reached the winning count in ballot order, so the result is stable
/// for a given input ordering. Returns `None` for an empty ballot.
pub fn plurality(verdicts: &[Verdict]) -> Option<Verdict> {
    let mut counts: Vec<(Verdict, usize)> = Vec::new();
    for verdict in verdicts {
        match counts.iter_mut().find(|(v, _)| v == verdict) {
            Some((_, n)) => *n += 1,
            None => counts.push((*verdict, 1)),
        }
    }

    let mut winner: Option<(Verdict, usize)> = None;
    for (verdict, count) in counts {
        // strictly greater keeps the first-encountered verdict on ties
        if winner.map_or(true, |(_, best)| count > best) {
            winner = Some((verdict, count));
        }
    }
    winner.map(|(verdict, _)| verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_plurality_majority_wins() {
        let final_verdict = plurality(&[Verdict::Yes, Verdict::Yes, Verdict::No]);
        assert_eq!(final_verdict, Some(Verdict::Yes));
    }

    #[test]
    fn test_plurality_three_way_tie_takes_first_cast() {
        let final_verdict = plurality(&[Verdict::Yes, Verdict::No, Verdict::Maybe]);
        assert_eq!(final_verdict, Some(Verdict::Yes));

        let reordered = plurality(&[Verdict::Maybe, Verdict::No, Verdict::Yes]);
        assert_eq!(reordered, Some(Verdict::Maybe));
    }

    #[test]
    fn test_plurality_two_way_tie_is_deterministic() {
        let ballot = [Verdict::No, Verdict::Yes, Verdict::Yes, Verdict::No];
        // repeated evaluation never flips the result
        for _ in 0..10 {
            assert_eq!(plurality(&ballot), Some(Verdict::No));
        }
    }

    #[test]
    fn test_plurality_empty_ballot() {
        assert_eq!(plurality(&[]), None);
    }

    #[test]
    fn test_draw_is_reproducible_for_a_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(
                draw_verdict(&Stance::Chaotic, &mut a),
                draw_verdict(&Stance::Chaotic, &mut b)
            );
        }
    }

    fn sample_rates(stance: Stance, trials: u32) -> (f64, f64, f64) {
        let mut rng = StdRng::seed_from_u64(42);
        let (mut yes, mut no, mut maybe) = (0u32, 0u32, 0u32);
        for _ in 0..trials {
            match draw_verdict(&stance, &mut rng) {
                Verdict::Yes => yes += 1,
                Verdict::No => no += 1,
                Verdict::Maybe => maybe += 1,
            }
        }
        let t = f64::from(trials);
        (
            f64::from(yes) / t,
            f64::from(no) / t,
            f64::from(maybe) / t,
        )
    }

    #[test]
    fn test_conservative_draw_matches_weights() {
        let (yes, no, maybe) = sample_rates(Stance::Conservative, 20_000);
        assert!((no - 0.60).abs() < 0.02, "no rate {no}");
        assert!((maybe - 0.25).abs() < 0.02, "maybe rate {maybe}");
        assert!((yes - 0.15).abs() < 0.02, "yes rate {yes}");
    }

    #[test]
    fn test_optimistic_draw_matches_weights() {
        let (yes, no, maybe) = sample_rates(Stance::Optimistic, 20_000);
        assert!((yes - 0.70).abs() < 0.02, "yes rate {yes}");
        assert!((maybe - 0.20).abs() < 0.02, "maybe rate {maybe}");
        assert!((no - 0.10).abs() < 0.02, "no rate {no}");
    }

    #[test]
    fn test_chaotic_draw_is_roughly_uniform() {
        let (yes, no, maybe) = sample_rates(Stance::Chaotic, 20_000);
        for rate in [yes, no, maybe] {
            assert!((rate - 1.0 / 3.0).abs() < 0.02, "rate {rate}");
        }
    }
}
