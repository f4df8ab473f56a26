//! Ratio derivation from raw confusion counts.
//!
//! Ratios are only ever derived from summed counts (micro-averaging), so
//! every zero denominator resolves to `0.0` rather than `NaN`.

use crate::models::{Counts, MetricSet};

/// Derive precision, recall, F1 and accuracy from raw counts.
///
/// `fd` and `fa` pass through untouched alongside the ratios.
pub fn derive(counts: &Counts) -> MetricSet {
    let precision = ratio(counts.tp, counts.tp.saturating_add(counts.fp));
    let recall = ratio(counts.tp, counts.tp.saturating_add(counts.fn_));

    // Harmonic mean of the already-derived ratios.
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    let correct = counts.tp.saturating_add(counts.tn);
    let accuracy = ratio(
        correct,
        correct
            .saturating_add(counts.fp)
            .saturating_add(counts.fn_),
    );

    MetricSet {
        counts: *counts,
        precision,
        recall,
        f1,
        accuracy,
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_derive_basic() {
        let m = derive(&Counts::new(8, 2, 2, 0));
        assert!((m.precision - 0.8).abs() < EPS);
        assert!((m.recall - 0.8).abs() < EPS);
        assert!((m.f1 - 0.8).abs() < EPS);
        assert!((m.accuracy - 8.0 / 12.0).abs() < EPS);
    }

    #[test]
    fn test_derive_all_zero() {
        let m = derive(&Counts::default());
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
        assert_eq!(m.accuracy, 0.0);
    }

    #[test]
    fn test_derive_only_false_negatives() {
        let m = derive(&Counts::new(0, 0, 5, 0));
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
        assert!(!m.f1.is_nan());
        assert_eq!(m.accuracy, 0.0);
    }

    #[test]
    fn test_derive_true_negatives_only() {
        let m = derive(&Counts::new(0, 0, 0, 3));
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.accuracy, 1.0);
    }

    #[test]
    fn test_derive_passes_through_counts() {
        let counts = Counts {
            fd: 7,
            fa: 9,
            ..Counts::new(1, 1, 1, 1)
        };
        let m = derive(&counts);
        assert_eq!(m.counts, counts);
        assert_eq!(m.counts.fd, 7);
        assert_eq!(m.counts.fa, 9);
    }

    #[test]
    fn test_f1_from_derived_ratios() {
        // P = 1/3, R = 1/2
        let m = derive(&Counts::new(1, 2, 1, 0));
        let expected = 2.0 * (1.0 / 3.0) * 0.5 / (1.0 / 3.0 + 0.5);
        assert!((m.f1 - expected).abs() < EPS);
        assert!((m.f1 - 0.4).abs() < EPS);
    }
}
