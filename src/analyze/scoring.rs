//! Score combination for the overall article rating.
//!
//! Sub-scores in [0, MAX_SCORE] are shifted onto [FLOOR, MAX_SCORE] and merged
//! with a power mean (exponent `POWER` < 1), then shifted back:
//!
//! overall = inverse( mean( transform(x_i)^p )^(1/p) )
//!
//! Low sub-scores pull the result down harder than an arithmetic mean would,
//! while a single 0 cannot drive the whole rating to 0.

use anyhow::{bail, Result};

use crate::{MAX_SCORE, MIN_SCORE};

/// Lowest value a sub-score is shifted to before combining.
pub const FLOOR: f64 = 0.1;
pub const POWER: f64 = 0.25;

/// Affine map [0, MAX_SCORE] → [FLOOR, MAX_SCORE].
pub fn transform(x: f64) -> f64 {
    x * (MAX_SCORE - FLOOR) / MAX_SCORE + FLOOR
}

/// Exact inverse of [`transform`].
pub fn inverse(y: f64) -> f64 {
    MAX_SCORE / (MAX_SCORE - FLOOR) * (y - FLOOR)
}

/// Merge one or more sub-scores into one overall score.
pub fn combine(scores: &[f64]) -> Result<f64> {
    if scores.is_empty() {
        bail!("cannot combine an empty list of scores");
    }
    let mean = scores
        .iter()
        .map(|&s| transform(s).powf(POWER))
        .sum::<f64>()
        / scores.len() as f64;
    Ok(inverse(mean.powf(1.0 / POWER)).clamp(MIN_SCORE, MAX_SCORE))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn transform_round_trips() {
        for x in [0.0, 0.1, 2.5, 5.0, 9.99, 10.0] {
            assert!((inverse(transform(x)) - x).abs() < EPS);
        }
        assert!((transform(0.0) - FLOOR).abs() < EPS);
        assert!((transform(MAX_SCORE) - MAX_SCORE).abs() < EPS);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(combine(&[]).is_err());
    }

    #[test]
    fn singleton_is_identity() {
        for i in 0..=100 {
            let x = i as f64 / 10.0;
            assert!((combine(&[x]).unwrap() - x).abs() < 1e-9, "x = {x}");
        }
    }

    #[test]
    fn boundaries_and_ordering() {
        let top = combine(&[10.0, 10.0, 10.0]).unwrap();
        let mid = combine(&[5.0, 5.0, 5.0]).unwrap();
        let low = combine(&[0.0, 0.0, 0.0]).unwrap();
        assert!((top - 10.0).abs() < EPS);
        assert!(low >= 0.0);
        assert!(low < mid && mid < top);
    }

    #[test]
    fn single_zero_does_not_collapse_result() {
        let r = combine(&[0.0, 9.0, 9.0]).unwrap();
        assert!(r > 2.5, "got {r}");
    }

    #[test]
    fn low_outlier_pulls_below_arithmetic_mean() {
        let r = combine(&[1.0, 9.0, 9.0]).unwrap();
        let arithmetic = (1.0 + 9.0 + 9.0) / 3.0;
        assert!(r < arithmetic);
        assert!(r > 1.0);
    }

    #[test]
    fn monotonic_in_each_input() {
        let base = combine(&[4.0, 6.0, 8.0]).unwrap();
        assert!(combine(&[4.5, 6.0, 8.0]).unwrap() > base);
        assert!(combine(&[4.0, 6.5, 8.0]).unwrap() > base);
        assert!(combine(&[4.0, 6.0, 8.5]).unwrap() > base);
    }
}
