//! Batch lifecycle: snapshot in, candidates built, groups resolved, batch
//! normalized, results published. Each run starts from scratch; nothing from
//! an earlier batch is reused.

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, TaxRule};
use crate::error::Exclusion;
use crate::model::{Baselines, Catalog, ItemId};
use crate::normalize::{normalize, RawScore};
use crate::profit::{compute_profit_with, Candidate, ResolvedInput};
use crate::recipe::{RecipeCatalog, RecipeGroup};
use crate::resolver::{resolve_best, Resolution, ScoredCandidate};

/// A recipe that produced no candidate, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub family: String,
    pub recipe: String,
    pub reason: Exclusion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub family: String,
    pub selected: ScoredCandidate,
    /// Other viable paths, kept for display only.
    pub alternatives: Vec<ScoredCandidate>,
    pub profit: i64,
    pub raw_score: f64,
    pub normalized_score: f64,
    pub outlier_flag: bool,
}

/// One snapshot's complete, immutable result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    pub generation: u64,
    pub results: Vec<RankedResult>,
    pub skipped: Vec<Skipped>,
}

struct GroupOutcome {
    family: String,
    resolution: Option<Resolution>,
    skipped: Vec<Skipped>,
}

fn price_group(group: &RecipeGroup, catalog: &Catalog, tax: &TaxRule) -> (Vec<Candidate>, Vec<Skipped>) {
    let mut candidates = Vec::with_capacity(group.recipes.len());
    let mut skipped = Vec::new();

    for recipe in &group.recipes {
        match compute_profit_with(recipe, catalog, tax) {
            Ok(candidate) => candidates.push(candidate),
            Err(reason) => {
                debug!(family = %group.family, recipe = %recipe.name, %reason, "recipe excluded");
                skipped.push(Skipped {
                    family: group.family.clone(),
                    recipe: recipe.name.clone(),
                    reason,
                });
            }
        }
    }

    (candidates, skipped)
}

fn evaluate_group(
    group: &RecipeGroup,
    catalog: &Catalog,
    baselines: Option<&Baselines>,
    cfg: &EngineConfig,
) -> GroupOutcome {
    let (candidates, skipped) = price_group(group, catalog, &cfg.tax);
    GroupOutcome {
        family: group.family.clone(),
        resolution: resolve_best(candidates, baselines, cfg),
        skipped,
    }
}

/// Run the full pipeline over one snapshot. Groups are evaluated in
/// parallel; results are ordered by normalized score, then raw score, then
/// family name, so identical inputs always give identical output.
pub fn run_batch(
    catalog: &Catalog,
    baselines: Option<&Baselines>,
    recipes: &RecipeCatalog,
    cfg: &EngineConfig,
) -> Batch {
    let outcomes: Vec<GroupOutcome> = recipes
        .groups()
        .par_iter()
        .map(|group| evaluate_group(group, catalog, baselines, cfg))
        .collect();

    let mut skipped = Vec::new();
    let mut resolved = Vec::new();
    for outcome in outcomes {
        skipped.extend(outcome.skipped);
        match outcome.resolution {
            Some(resolution) => resolved.push((outcome.family, resolution)),
            None => debug!(family = %outcome.family, "no viable path"),
        }
    }

    let raw: Vec<RawScore<usize>> = resolved
        .iter()
        .enumerate()
        .map(|(id, (_, resolution))| RawScore {
            id,
            raw_score: resolution.selected().weighted_score,
        })
        .collect();
    let normalized = normalize(&raw);

    let mut results: Vec<RankedResult> = resolved
        .into_iter()
        .zip(normalized)
        .map(|((family, resolution), score)| {
            let (selected, alternatives) = resolution.into_parts();
            RankedResult {
                family,
                profit: selected.candidate.profit,
                raw_score: selected.weighted_score,
                normalized_score: score.normalized_score,
                outlier_flag: selected.outlier.flagged,
                selected,
                alternatives,
            }
        })
        .collect();
    results.sort_by(rank_order);

    info!(
        generation = catalog.generation(),
        ranked = results.len(),
        skipped = skipped.len(),
        flagged = results.iter().filter(|r| r.outlier_flag).count(),
        "batch computed"
    );

    Batch {
        generation: catalog.generation(),
        results,
        skipped,
    }
}

fn rank_order(a: &RankedResult, b: &RankedResult) -> Ordering {
    b.normalized_score
        .partial_cmp(&a.normalized_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.raw_score.partial_cmp(&a.raw_score).unwrap_or(Ordering::Equal))
        .then_with(|| a.family.cmp(&b.family))
}

/// Single-path listing row: what the plain profit pages show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitRow {
    pub family: String,
    pub recipe: String,
    pub output: ItemId,
    pub profit: i64,
    pub inputs_resolved: Vec<ResolvedInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitListing {
    pub rows: Vec<ProfitRow>,
    pub skipped: Vec<Skipped>,
}

/// Price every recipe on its own and sort by profit, highest first.
/// No path selection or liquidity weighting is involved.
pub fn rank_by_profit(recipes: &RecipeCatalog, catalog: &Catalog, tax: &TaxRule) -> ProfitListing {
    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for group in recipes.groups() {
        let (candidates, excluded) = price_group(group, catalog, tax);
        skipped.extend(excluded);
        rows.extend(candidates.into_iter().map(|c| ProfitRow {
            family: group.family.clone(),
            recipe: c.recipe.name.clone(),
            output: c.output(),
            profit: c.profit,
            inputs_resolved: c.inputs,
        }));
    }

    rows.sort_by(|a, b| {
        b.profit
            .cmp(&a.profit)
            .then_with(|| a.family.cmp(&b.family))
            .then_with(|| a.recipe.cmp(&b.recipe))
    });

    ProfitListing { rows, skipped }
}

/// Publishing boundary. Batches computed from an older snapshot than the
/// newest one observed are dropped, so readers never see a stale or mixed
/// result set.
#[derive(Debug, Default)]
pub struct Publisher {
    state: Mutex<PublishState>,
}

#[derive(Debug, Default)]
struct PublishState {
    latest_observed: u64,
    current: Option<Arc<Batch>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a snapshot with `generation` has arrived.
    pub fn observe(&self, generation: u64) {
        let mut state = self.state.lock();
        state.latest_observed = state.latest_observed.max(generation);
    }

    /// Publish `batch` unless a newer generation has been observed or
    /// published. Returns whether the batch was accepted.
    pub fn publish(&self, batch: Batch) -> bool {
        let mut state = self.state.lock();
        if batch.generation < state.latest_observed {
            warn!(
                generation = batch.generation,
                latest = state.latest_observed,
                "dropping stale batch"
            );
            return false;
        }
        state.latest_observed = batch.generation;
        state.current = Some(Arc::new(batch));
        true
    }

    pub fn current(&self) -> Option<Arc<Batch>> {
        self.state.lock().current.clone()
    }

    pub fn latest_observed(&self) -> u64 {
        self.state.lock().latest_observed
    }
}
