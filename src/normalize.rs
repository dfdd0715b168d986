use serde::Serialize;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawScore<K> {
    pub id: K,
    pub raw_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedScore<K> {
    pub id: K,
    pub normalized_score: f64,
}

/// Min-max rescale the strictly positive scores onto [1, 10], one decimal.
/// Zero, negative and non-finite scores get 1. Output order follows input.
pub fn normalize<K: Clone>(results: &[RawScore<K>]) -> Vec<NormalizedScore<K>> {
    let positive = |s: f64| s.is_finite() && s > 0.0;

    let (min, max) = results
        .iter()
        .map(|r| r.raw_score)
        .filter(|s| positive(*s))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s), hi.max(s))
        });

    results
        .iter()
        .map(|r| {
            let normalized_score = if !positive(r.raw_score) {
                MIN_SCORE
            } else if max > min {
                let scaled = MIN_SCORE + (MAX_SCORE - MIN_SCORE) * (r.raw_score - min) / (max - min);
                (scaled * 10.0).round() / 10.0
            } else {
                // One positive score, or several identical ones.
                MAX_SCORE
            };
            NormalizedScore {
                id: r.id.clone(),
                normalized_score,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(scores: &[f64]) -> Vec<RawScore<usize>> {
        scores
            .iter()
            .enumerate()
            .map(|(id, &raw_score)| RawScore { id, raw_score })
            .collect()
    }

    fn scores(out: Vec<NormalizedScore<usize>>) -> Vec<f64> {
        out.into_iter().map(|n| n.normalized_score).collect()
    }

    #[test]
    fn endpoints_map_to_one_and_ten() {
        assert_eq!(scores(normalize(&raw(&[10.0, 100.0]))), vec![1.0, 10.0]);
    }

    #[test]
    fn single_positive_score_gets_ten() {
        assert_eq!(
            scores(normalize(&raw(&[-5.0, 42.0, 0.0]))),
            vec![1.0, 10.0, 1.0]
        );
    }

    #[test]
    fn no_positive_scores_is_all_ones() {
        assert_eq!(scores(normalize(&raw(&[0.0, -1.0, -300.0]))), vec![1.0, 1.0, 1.0]);
        assert!(normalize::<usize>(&[]).is_empty());
    }

    #[test]
    fn midpoints_round_to_one_decimal() {
        // 1 + 9 * 45 / 90 = 5.5; 1 + 9 * 10 / 90 = 2.0; 1 + 9 * 33 / 90 = 4.3
        assert_eq!(
            scores(normalize(&raw(&[10.0, 55.0, 20.0, 43.0, 100.0, -7.0]))),
            vec![1.0, 5.5, 2.0, 4.3, 10.0, 1.0]
        );
    }

    #[test]
    fn identical_positive_scores_all_get_ten() {
        assert_eq!(scores(normalize(&raw(&[7.0, 7.0, 0.0]))), vec![10.0, 10.0, 1.0]);
    }
}
