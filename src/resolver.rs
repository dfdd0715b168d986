use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use crate::config::EngineConfig;
use crate::model::Baselines;
use crate::outlier::{is_outlier, liquidity_volume, OutlierVerdict};
use crate::profit::Candidate;
use crate::recipe::PathShape;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub shape: PathShape,
    pub path_weight: f64,
    /// Hourly-scale volume of the output plus the consumed intermediate.
    pub liquidity: f64,
    pub outlier: OutlierVerdict,
    /// profit × liquidity × path weight, discounted when flagged.
    pub weighted_score: f64,
}

/// Every viable path of one group, with the selected one marked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    selected: usize,
    all: Vec<ScoredCandidate>,
}

impl Resolution {
    pub fn selected(&self) -> &ScoredCandidate {
        &self.all[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn all(&self) -> &[ScoredCandidate] {
        &self.all
    }

    /// Split into the selected path and the remaining ones, in definition order.
    pub fn into_parts(mut self) -> (ScoredCandidate, Vec<ScoredCandidate>) {
        let selected = self.all.remove(self.selected);
        (selected, self.all)
    }
}

pub fn score_candidate(
    candidate: Candidate,
    baselines: Option<&Baselines>,
    cfg: &EngineConfig,
) -> ScoredCandidate {
    let output = candidate.output();
    let mut liquidity = liquidity_volume(output, candidate.output_volume, baselines, &cfg.outlier);
    let mut outlier = is_outlier(output, baselines, &cfg.outlier);

    // High alchemy consumes the output item itself; count it once.
    if let Some(input) = candidate.primary_input().filter(|i| *i != output) {
        liquidity += liquidity_volume(input, candidate.input_volume, baselines, &cfg.outlier);
        let input_verdict = is_outlier(input, baselines, &cfg.outlier);
        if input_verdict.flagged && !outlier.flagged {
            outlier = input_verdict;
        }
    }

    let shape = candidate.recipe.shape();
    let path_weight = cfg.resolver.weight_for(shape);
    let mut weighted_score = candidate.profit as f64 * liquidity * path_weight;
    if outlier.flagged {
        weighted_score *= cfg.resolver.outlier_discount;
    }

    ScoredCandidate {
        candidate,
        shape,
        path_weight,
        liquidity,
        outlier,
        weighted_score,
    }
}

/// Pick the path with the greatest weighted score. Equal scores go to the
/// higher per-unit profit, then to the earlier-defined path. An empty input
/// (every path excluded) yields no result.
pub fn resolve_best(
    candidates: Vec<Candidate>,
    baselines: Option<&Baselines>,
    cfg: &EngineConfig,
) -> Option<Resolution> {
    let all: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|c| score_candidate(c, baselines, cfg))
        .collect();

    if all.is_empty() {
        return None;
    }

    let mut selected = 0;
    for (i, challenger) in all.iter().enumerate().skip(1) {
        let best = &all[selected];
        let wins = match challenger
            .weighted_score
            .partial_cmp(&best.weighted_score)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Greater => true,
            Ordering::Equal => challenger.candidate.profit > best.candidate.profit,
            Ordering::Less => false,
        };
        if wins {
            selected = i;
        }
    }

    let chosen = &all[selected];
    debug!(
        recipe = %chosen.candidate.recipe.name,
        output = %chosen.candidate.output(),
        score = chosen.weighted_score,
        paths = all.len(),
        "path selected"
    );

    Some(Resolution { selected, all })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Catalog, ItemId, PriceRecord, VolumeBaseline};
    use crate::profit::compute_profit;
    use crate::recipe::Recipe;
    use std::collections::HashMap;

    const FOUR: ItemId = ItemId(113);
    const TWO: ItemId = ItemId(117);
    const ONE: ItemId = ItemId(119);

    fn potion_catalog() -> Catalog {
        let price = |buy, sell| PriceRecord {
            buy,
            sell,
            volume: None,
            alch_value: None,
        };
        Catalog::from_records(
            1,
            [
                (FOUR, price(None, Some(989))),
                (ONE, price(Some(200), None)),
                (TWO, price(Some(450), None)),
            ],
        )
    }

    fn potion_candidates() -> Vec<Candidate> {
        let catalog = potion_catalog();
        [
            Recipe::new("(1) to (4)", FOUR, &[(ONE, 4)]).taxed(),
            Recipe::new("(2) to (4)", FOUR, &[(TWO, 2)]).taxed(),
        ]
        .iter()
        .map(|r| compute_profit(r, &catalog).unwrap())
        .collect()
    }

    fn hourly(volumes: &[(ItemId, u64)]) -> Baselines {
        volumes
            .iter()
            .map(|&(id, h)| {
                (
                    id,
                    VolumeBaseline {
                        hourly_volume: Some(h),
                        ..Default::default()
                    },
                )
            })
            .collect::<HashMap<_, _>>()
    }

    #[test]
    fn fixture_profits_match_dose_arithmetic() {
        let candidates = potion_candidates();
        assert_eq!(candidates[0].profit, 180);
        assert_eq!(candidates[1].profit, 80);
    }

    #[test]
    fn higher_weighted_score_wins_with_even_liquidity() {
        let baselines = hourly(&[(FOUR, 100), (ONE, 100), (TWO, 100)]);
        let resolution =
            resolve_best(potion_candidates(), Some(&baselines), &EngineConfig::default()).unwrap();

        let selected = resolution.selected();
        assert_eq!(selected.candidate.recipe.name, "(1) to (4)");
        assert_eq!(selected.liquidity, 200.0);
        assert!((selected.weighted_score - 180.0 * 200.0 * 0.7).abs() < 1e-9);
        assert_eq!(resolution.all().len(), 2);
    }

    #[test]
    fn liquidity_outweighs_raw_profit() {
        // The (1) dose barely trades; the (2) dose is liquid.
        let baselines = hourly(&[(FOUR, 100), (ONE, 10), (TWO, 900)]);
        let resolution =
            resolve_best(potion_candidates(), Some(&baselines), &EngineConfig::default()).unwrap();

        // 180 * 110 * 0.7 = 13860 < 80 * 1000 * 0.85 = 68000
        assert_eq!(resolution.selected().candidate.recipe.name, "(2) to (4)");
        assert_eq!(resolution.selected_index(), 1);
    }

    #[test]
    fn path_weight_alone_can_flip_selection() {
        let baselines = hourly(&[(FOUR, 100), (ONE, 100), (TWO, 100)]);
        let mut cfg = EngineConfig::default();
        cfg.resolver
            .path_weights
            .insert(PathShape { consumed: 4, produced: 1 }, 0.1);
        cfg.resolver
            .path_weights
            .insert(PathShape { consumed: 2, produced: 1 }, 1.0);

        let resolution = resolve_best(potion_candidates(), Some(&baselines), &cfg).unwrap();
        assert_eq!(resolution.selected().candidate.recipe.name, "(2) to (4)");
    }

    #[test]
    fn equal_scores_fall_back_to_profit_then_order() {
        // No volume anywhere: every score is zero, so profit decides.
        let candidates = potion_candidates();
        let resolution = resolve_best(candidates.clone(), None, &EngineConfig::default()).unwrap();
        assert_eq!(resolution.selected().candidate.recipe.name, "(1) to (4)");

        let reversed: Vec<_> = candidates.into_iter().rev().collect();
        let resolution = resolve_best(reversed, None, &EngineConfig::default()).unwrap();
        assert_eq!(resolution.selected().candidate.recipe.name, "(1) to (4)");

        // Identical candidates: the first defined wins.
        let twin = potion_candidates()[0].clone();
        let resolution =
            resolve_best(vec![twin.clone(), twin], None, &EngineConfig::default()).unwrap();
        assert_eq!(resolution.selected_index(), 0);
    }

    #[test]
    fn empty_group_yields_nothing() {
        assert!(resolve_best(Vec::new(), None, &EngineConfig::default()).is_none());
    }

    #[test]
    fn flagged_paths_are_surfaced_and_discounted() {
        let mut baselines = hourly(&[(FOUR, 100), (ONE, 100), (TWO, 100)]);
        // 1-dose volume spiking: 400/h against a 2400/day baseline.
        baselines.insert(
            ONE,
            VolumeBaseline {
                hourly_volume: Some(400),
                daily_volume: Some(2400),
                ..Default::default()
            },
        );

        let cfg = EngineConfig::default();
        let resolution = resolve_best(potion_candidates(), Some(&baselines), &cfg).unwrap();
        let flagged = &resolution.all()[0];
        assert!(flagged.outlier.flagged);
        assert!(!resolution.all()[1].outlier.flagged);

        let mut discounting = EngineConfig::default();
        discounting.resolver.outlier_discount = 0.0;
        let resolution = resolve_best(potion_candidates(), Some(&baselines), &discounting).unwrap();
        assert_eq!(resolution.selected().candidate.recipe.name, "(2) to (4)");
    }
}
