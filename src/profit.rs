use serde::Serialize;

use crate::config::TaxRule;
use crate::error::Exclusion;
use crate::model::{Catalog, ItemId};
use crate::recipe::{Recipe, RevenueSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedInput {
    pub item: ItemId,
    pub quantity: u32,
    pub unit_price: u64,
}

/// A recipe priced against one catalog snapshot. Money figures cover one
/// run of the recipe except `profit`, which is per output unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub recipe: Recipe,
    pub inputs: Vec<ResolvedInput>,
    pub input_cost: i64,
    pub fixed_cost: i64,
    /// Output value after tax.
    pub revenue: i64,
    pub profit: i64,
    pub output_volume: Option<u64>,
    pub input_volume: Option<u64>,
}

impl Candidate {
    pub fn output(&self) -> ItemId {
        self.recipe.output
    }

    /// The consumed intermediate counted for liquidity.
    pub fn primary_input(&self) -> Option<ItemId> {
        self.recipe.primary_input().map(|i| i.item)
    }
}

/// Price `recipe` against `catalog` under the canonical market tax.
pub fn compute_profit(recipe: &Recipe, catalog: &Catalog) -> Result<Candidate, Exclusion> {
    compute_profit_with(recipe, catalog, &TaxRule::default())
}

pub fn compute_profit_with(
    recipe: &Recipe,
    catalog: &Catalog,
    tax: &TaxRule,
) -> Result<Candidate, Exclusion> {
    let unit_value = match recipe.revenue {
        RevenueSource::Market => catalog
            .sell_price(recipe.output)
            .ok_or(Exclusion::MissingOutputPrice(recipe.output))?,
        RevenueSource::Alch => catalog
            .alch_value(recipe.output)
            .ok_or(Exclusion::MissingAlchValue(recipe.output))?,
    };
    let unit_revenue = if recipe.taxed {
        tax.after_tax(unit_value)
    } else {
        unit_value
    };

    let mut inputs = Vec::with_capacity(recipe.inputs.len());
    for input in &recipe.inputs {
        let unit_price = catalog
            .buy_price(input.item)
            .ok_or(Exclusion::MissingInputPrice(input.item))?;
        inputs.push(ResolvedInput {
            item: input.item,
            quantity: input.quantity,
            unit_price,
        });
    }

    let produced = i128::from(recipe.output_quantity);
    let revenue = i128::from(unit_revenue) * produced;
    let input_cost: i128 = inputs
        .iter()
        .map(|i| i128::from(i.quantity) * i128::from(i.unit_price))
        .sum();
    let fixed_cost = i128::from(recipe.fixed_cost) * produced;

    // Floor, not truncate: a loss of 10 over 3 units is -4 per unit.
    let profit = (revenue - input_cost - fixed_cost).div_euclid(produced);

    Ok(Candidate {
        recipe: recipe.clone(),
        inputs,
        input_cost: clamp(input_cost),
        fixed_cost: clamp(fixed_cost),
        revenue: clamp(revenue),
        profit: clamp(profit),
        output_volume: catalog.volume(recipe.output),
        input_volume: recipe
            .primary_input()
            .and_then(|i| catalog.volume(i.item)),
    })
}

fn clamp(v: i128) -> i64 {
    v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PriceRecord;

    fn priced(id: u32, buy: Option<u64>, sell: Option<u64>) -> (ItemId, PriceRecord) {
        (
            ItemId(id),
            PriceRecord {
                buy,
                sell,
                volume: None,
                alch_value: None,
            },
        )
    }

    #[test]
    fn one_percent_tax_is_floored_before_costs() {
        let catalog = Catalog::from_records(1, [priced(1, None, Some(1000)), priced(2, Some(500), None)]);
        let recipe = Recipe::new("Sell", ItemId(1), &[(ItemId(2), 1)]).taxed();

        let candidate = compute_profit(&recipe, &catalog).unwrap();
        assert_eq!(candidate.revenue, 990);
        assert_eq!(candidate.profit, 490);
    }

    #[test]
    fn missing_input_price_excludes() {
        let catalog = Catalog::from_records(1, [priced(1, None, Some(1000)), priced(2, None, Some(10))]);
        let recipe = Recipe::new("Sell", ItemId(1), &[(ItemId(2), 1)]);

        assert_eq!(
            compute_profit(&recipe, &catalog),
            Err(Exclusion::MissingInputPrice(ItemId(2)))
        );
    }

    #[test]
    fn missing_output_price_excludes() {
        let catalog = Catalog::from_records(1, [priced(2, Some(5), None)]);
        let recipe = Recipe::new("Sell", ItemId(1), &[(ItemId(2), 1)]);

        assert_eq!(
            compute_profit(&recipe, &catalog),
            Err(Exclusion::MissingOutputPrice(ItemId(1)))
        );
    }

    #[test]
    fn fixed_cost_and_quantities_are_charged() {
        // Varrock teleport shape: clay + 3 air + fire + law, plus a coin fee.
        let catalog = Catalog::from_records(
            1,
            [
                priced(8007, None, Some(800)),
                priced(1761, Some(150), None),
                priced(556, Some(5), None),
                priced(554, Some(4), None),
                priced(563, Some(120), None),
            ],
        );
        let recipe = Recipe::new(
            "Varrock teleport",
            ItemId(8007),
            &[(ItemId(1761), 1), (ItemId(556), 3), (ItemId(554), 1), (ItemId(563), 1)],
        )
        .with_fixed_cost(20)
        .taxed();

        let candidate = compute_profit(&recipe, &catalog).unwrap();
        assert_eq!(candidate.input_cost, 150 + 15 + 4 + 120);
        assert_eq!(candidate.revenue, 792);
        assert_eq!(candidate.profit, 792 - 289 - 20);
        assert_eq!(candidate.inputs.len(), 4);
    }

    #[test]
    fn rate_above_full_price_taxes_revenue_to_zero() {
        let catalog = Catalog::from_records(1, [priced(1, None, Some(1000)), priced(2, Some(500), None)]);
        let recipe = Recipe::new("Sell", ItemId(1), &[(ItemId(2), 1)]).taxed();
        let tax = TaxRule { rate_bps: 20_000, cap: 0 };

        let candidate = compute_profit_with(&recipe, &catalog, &tax).unwrap();
        assert_eq!(candidate.revenue, 0);
        assert_eq!(candidate.profit, -500);
    }

    #[test]
    fn negative_profit_is_kept() {
        let catalog = Catalog::from_records(1, [priced(1, None, Some(100)), priced(2, Some(300), None)]);
        let recipe = Recipe::new("Loss", ItemId(1), &[(ItemId(2), 1)]);

        assert_eq!(compute_profit(&recipe, &catalog).unwrap().profit, -200);
    }

    #[test]
    fn multi_unit_output_floors_per_unit_profit() {
        // Four 3-dose potions decant into three 4-dose potions.
        let catalog = Catalog::from_records(1, [priced(113, None, Some(989)), priced(115, Some(700), None)]);
        let recipe = Recipe::new("(3) to (4)", ItemId(113), &[(ItemId(115), 4)])
            .with_output_quantity(3)
            .taxed();

        let candidate = compute_profit(&recipe, &catalog).unwrap();
        assert_eq!(candidate.revenue, 980 * 3);
        assert_eq!(candidate.profit, (2940 - 2800) / 3);

        let catalog = Catalog::from_records(1, [priced(113, None, Some(989)), priced(115, Some(737), None)]);
        // 2940 - 2948 = -8 over three units floors to -3.
        assert_eq!(compute_profit(&recipe, &catalog).unwrap().profit, -3);
    }

    #[test]
    fn alch_revenue_uses_alch_value_untaxed() {
        let mut records: Vec<_> = vec![priced(561, Some(200), None)];
        records.push((
            ItemId(1127),
            PriceRecord {
                buy: Some(38_000),
                sell: Some(39_000),
                volume: Some(1_000),
                alch_value: Some(39_000),
            },
        ));
        let catalog = Catalog::from_records(1, records);
        let recipe = Recipe::new(
            "Alch rune platebody",
            ItemId(1127),
            &[(ItemId(1127), 1), (ItemId(561), 1)],
        )
        .with_revenue(RevenueSource::Alch);

        let candidate = compute_profit(&recipe, &catalog).unwrap();
        assert_eq!(candidate.profit, 39_000 - 38_000 - 200);
        assert_eq!(candidate.input_volume, Some(1_000));

        let bare = Catalog::from_records(1, [priced(1127, Some(1), Some(2)), priced(561, Some(200), None)]);
        assert_eq!(
            compute_profit(&recipe, &bare),
            Err(Exclusion::MissingAlchValue(ItemId(1127)))
        );
    }

    #[test]
    fn same_inputs_same_result() {
        let catalog = Catalog::from_records(1, [priced(1, None, Some(1234)), priced(2, Some(321), None)]);
        let recipe = Recipe::new("Sell", ItemId(1), &[(ItemId(2), 2)]).taxed();

        assert_eq!(compute_profit(&recipe, &catalog), compute_profit(&recipe, &catalog));
    }
}
