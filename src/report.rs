use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::pipeline::{Batch, ProfitListing, RankedResult, Skipped};

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub min_score: f64,
    pub flagged_only: bool,
    pub limit: Option<usize>,
}

impl ReportFilter {
    fn keeps(&self, r: &RankedResult) -> bool {
        r.normalized_score >= self.min_score && (!self.flagged_only || r.outlier_flag)
    }
}

#[derive(Tabled)]
struct RankRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Profit")]
    profit: String,
    #[tabled(rename = "Liquidity/h")]
    liquidity: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Alt")]
    alternatives: usize,
    #[tabled(rename = "Flag")]
    flag: &'static str,
}

#[derive(Tabled)]
struct ProfitTableRow {
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Recipe")]
    recipe: String,
    #[tabled(rename = "Output")]
    output: u32,
    #[tabled(rename = "Profit")]
    profit: String,
    #[tabled(rename = "Inputs")]
    inputs: String,
}

#[derive(Tabled)]
struct SkippedRow {
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Recipe")]
    recipe: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Ranked results that pass `filter`, best first. Rank numbers refer to the
/// full batch, so filtering never renumbers.
pub fn batch_rows<'a>(batch: &'a Batch, filter: &ReportFilter) -> Vec<(usize, &'a RankedResult)> {
    let kept = batch
        .results
        .iter()
        .enumerate()
        .filter(|(_, r)| filter.keeps(r))
        .map(|(i, r)| (i + 1, r));

    match filter.limit {
        Some(limit) => kept.take(limit).collect(),
        None => kept.collect(),
    }
}

pub fn render_batch(batch: &Batch, filter: &ReportFilter) -> String {
    let rows: Vec<RankRow> = batch_rows(batch, filter)
        .into_iter()
        .map(|(rank, r)| RankRow {
            rank,
            family: r.family.clone(),
            path: r.selected.candidate.recipe.name.clone(),
            profit: format_gp(r.profit as f64),
            liquidity: format!("{:.0}", r.selected.liquidity),
            score: format!("{:.1}", r.normalized_score),
            alternatives: r.alternatives.len(),
            flag: if r.outlier_flag { "SPIKE" } else { "" },
        })
        .collect();

    format!(
        "generation {} | {} ranked | {} skipped\n{}",
        batch.generation,
        batch.results.len(),
        batch.skipped.len(),
        Table::new(rows).with(Style::rounded())
    )
}

pub fn render_profits(listing: &ProfitListing, limit: Option<usize>) -> String {
    let rows: Vec<ProfitTableRow> = listing
        .rows
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|r| ProfitTableRow {
            family: r.family.clone(),
            recipe: r.recipe.clone(),
            output: r.output.0,
            profit: format_gp(r.profit as f64),
            inputs: r
                .inputs_resolved
                .iter()
                .map(|i| format!("{}x{} @{}", i.quantity, i.item, format_gp(i.unit_price as f64)))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn render_skipped(skipped: &[Skipped]) -> String {
    let rows: Vec<SkippedRow> = skipped
        .iter()
        .map(|s| SkippedRow {
            family: s.family.clone(),
            recipe: s.recipe.clone(),
            reason: s.reason.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn format_gp(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let value = value.abs();

    if value >= 1_000_000_000.0 {
        format!("{}{:.2}B", sign, value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{}{:.2}M", sign, value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{}{:.1}K", sign, value / 1_000.0)
    } else {
        format!("{}{:.0}", sign, value)
    }
}
