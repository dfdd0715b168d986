//! Conversion definitions and the recipe catalog.
//!
//! A recipe turns priced inputs plus a fixed coin fee into a priced output.
//! Recipes that reach the same logical output are grouped under one family
//! (e.g. every dose path of a potion); a single-path recipe is a family of one.
//! Catalogs are validated once, at load time: a malformed recipe is an error,
//! never silently dropped.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::ItemId;

const BUNDLED_RECIPES: &str = include_str!("../data/recipes.toml");

/// Where a recipe's revenue comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenueSource {
    /// Sell the output on the market.
    #[default]
    Market,
    /// Cast high alchemy on the output for its fixed alch value.
    Alch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecipeInput {
    pub item: ItemId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub name: String,
    pub output: ItemId,
    /// Units produced per run, e.g. four 3-dose potions decant into three 4-dose.
    pub output_quantity: u32,
    /// Ordered; the first input is the path's consumed intermediate.
    pub inputs: Vec<RecipeInput>,
    /// Coins paid per output unit (repair fees, tablet coin components).
    pub fixed_cost: u64,
    pub taxed: bool,
    pub revenue: RevenueSource,
}

impl Recipe {
    pub fn new(name: impl Into<String>, output: ItemId, inputs: &[(ItemId, u32)]) -> Self {
        Self {
            name: name.into(),
            output,
            output_quantity: 1,
            inputs: inputs
                .iter()
                .map(|&(item, quantity)| RecipeInput { item, quantity })
                .collect(),
            fixed_cost: 0,
            taxed: false,
            revenue: RevenueSource::Market,
        }
    }

    pub fn with_fixed_cost(mut self, fixed_cost: u64) -> Self {
        self.fixed_cost = fixed_cost;
        self
    }

    pub fn with_output_quantity(mut self, output_quantity: u32) -> Self {
        self.output_quantity = output_quantity;
        self
    }

    pub fn with_revenue(mut self, revenue: RevenueSource) -> Self {
        self.revenue = revenue;
        self
    }

    pub fn taxed(mut self) -> Self {
        self.taxed = true;
        self
    }

    pub fn primary_input(&self) -> Option<&RecipeInput> {
        self.inputs.first()
    }

    pub fn shape(&self) -> PathShape {
        PathShape::new(
            self.primary_input().map_or(0, |i| i.quantity),
            self.output_quantity,
        )
    }

    fn validate(&self, family: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidRecipe {
            family: family.to_string(),
            recipe: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("recipe name is empty".into()));
        }
        if self.output_quantity == 0 {
            return Err(invalid("output_quantity must be positive".into()));
        }
        if self.inputs.is_empty() {
            return Err(invalid("recipe has no inputs".into()));
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            if input.quantity == 0 {
                return Err(invalid(format!(
                    "input {} has non-positive quantity",
                    input.item
                )));
            }
            if !seen.insert(input.item) {
                return Err(invalid(format!("input {} listed twice", input.item)));
            }
        }
        Ok(())
    }
}

/// Lookup key for path weights: units of the consumed intermediate per run,
/// and units of output produced. Renders as `consumed:produced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PathShape {
    pub consumed: u32,
    pub produced: u32,
}

impl PathShape {
    /// Shape in lowest terms, so ten bolts in for ten out is `1:1`.
    pub fn new(consumed: u32, produced: u32) -> Self {
        let divisor = gcd(consumed, produced).max(1);
        PathShape {
            consumed: consumed / divisor,
            produced: produced / divisor,
        }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl fmt::Display for PathShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.consumed, self.produced)
    }
}

impl FromStr for PathShape {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (consumed, produced) = s
            .split_once(':')
            .ok_or_else(|| format!("'{s}' is not of the form consumed:produced"))?;
        let consumed: u32 = consumed
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' has a non-numeric consumed part"))?;
        let produced: u32 = produced
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' has a non-numeric produced part"))?;
        if consumed == 0 || produced == 0 {
            return Err(format!("'{s}' must have positive parts"));
        }
        Ok(PathShape::new(consumed, produced))
    }
}

/// Recipes sharing one logical output. Exactly one is selected per batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeGroup {
    pub family: String,
    pub recipes: Vec<Recipe>,
}

impl RecipeGroup {
    pub fn new(family: impl Into<String>, recipes: Vec<Recipe>) -> Self {
        Self {
            family: family.into(),
            recipes,
        }
    }

    pub fn single(recipe: Recipe) -> Self {
        Self::new(recipe.name.clone(), vec![recipe])
    }

    fn validate(&self) -> Result<()> {
        if self.family.trim().is_empty() {
            return Err(Error::InvalidRecipe {
                family: self.family.clone(),
                recipe: String::new(),
                reason: "family name is empty".into(),
            });
        }
        if self.recipes.is_empty() {
            return Err(Error::InvalidRecipe {
                family: self.family.clone(),
                recipe: String::new(),
                reason: "family has no recipes".into(),
            });
        }

        let mut names = HashSet::new();
        for recipe in &self.recipes {
            recipe.validate(&self.family)?;
            if !names.insert(recipe.name.as_str()) {
                return Err(Error::InvalidRecipe {
                    family: self.family.clone(),
                    recipe: recipe.name.clone(),
                    reason: "recipe name repeated within family".into(),
                });
            }
        }
        Ok(())
    }
}

/// A potion's four dose items, 1-dose first. Expands into the three
/// decanting paths that end in a 4-dose potion.
#[derive(Debug, Clone, Deserialize)]
pub struct DoseLadder {
    pub family: String,
    pub doses: [ItemId; 4],
}

impl DoseLadder {
    pub fn expand(&self) -> RecipeGroup {
        let [one, two, three, four] = self.doses;
        RecipeGroup::new(
            self.family.clone(),
            vec![
                Recipe::new("(1) to (4)", four, &[(one, 4)]).taxed(),
                Recipe::new("(2) to (4)", four, &[(two, 2)]).taxed(),
                Recipe::new("(3) to (4)", four, &[(three, 4)])
                    .with_output_quantity(3)
                    .taxed(),
            ],
        )
    }
}

/// Validated, immutable list of recipe groups.
#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    groups: Vec<RecipeGroup>,
}

impl RecipeCatalog {
    pub fn new(groups: Vec<RecipeGroup>) -> Result<Self> {
        let mut families = HashSet::new();
        for group in &groups {
            group.validate()?;
            if !families.insert(group.family.as_str()) {
                return Err(Error::InvalidRecipe {
                    family: group.family.clone(),
                    recipe: String::new(),
                    reason: "family defined twice".into(),
                });
            }
        }
        Ok(Self { groups })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The catalog shipped in `data/recipes.toml`.
    pub fn bundled() -> Result<Self> {
        Self::from_toml_str(BUNDLED_RECIPES)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: RecipeFile = toml::from_str(content)?;

        let mut groups = Vec::new();
        for raw in file.groups {
            let family = raw.family.unwrap_or_default();
            let recipes = raw
                .recipes
                .into_iter()
                .map(|r| r.into_recipe(&family))
                .collect::<Result<Vec<_>>>()?;
            groups.push(RecipeGroup::new(family, recipes));
        }
        for raw in file.recipes {
            let recipe = raw.into_recipe("")?;
            groups.push(RecipeGroup::single(recipe));
        }
        groups.extend(file.ladders.iter().map(DoseLadder::expand));

        Self::new(groups)
    }

    pub fn groups(&self) -> &[RecipeGroup] {
        &self.groups
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.groups.iter().flat_map(|g| g.recipes.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// On-disk shape. Numeric fields are read signed so that a negative quantity
// surfaces as an InvalidRecipe instead of an opaque parse failure.
#[derive(Debug, Deserialize)]
struct RecipeFile {
    #[serde(default, rename = "group")]
    groups: Vec<RawGroup>,
    #[serde(default, rename = "recipe")]
    recipes: Vec<RawRecipe>,
    #[serde(default, rename = "dose_ladder")]
    ladders: Vec<DoseLadder>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    family: Option<String>,
    #[serde(default, rename = "recipe")]
    recipes: Vec<RawRecipe>,
}

#[derive(Debug, Deserialize)]
struct RawRecipe {
    name: Option<String>,
    output: Option<i64>,
    output_quantity: Option<i64>,
    #[serde(default)]
    inputs: Vec<RawInput>,
    #[serde(default)]
    fixed_cost: i64,
    #[serde(default)]
    taxed: bool,
    #[serde(default)]
    revenue: RevenueSource,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    item: Option<i64>,
    quantity: Option<i64>,
}

impl RawRecipe {
    fn into_recipe(self, family: &str) -> Result<Recipe> {
        let label = self.name.clone().unwrap_or_default();
        let invalid = |reason: String| Error::InvalidRecipe {
            family: family.to_string(),
            recipe: label.clone(),
            reason,
        };

        let output = match self.output {
            Some(id) => item_id(id).ok_or_else(|| invalid(format!("output id {id} out of range")))?,
            None => return Err(invalid("missing output id".into())),
        };
        let name = self.name.unwrap_or_else(|| format!("item {output}"));

        let output_quantity = match self.output_quantity {
            None => 1,
            Some(q) => u32::try_from(q)
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| invalid(format!("output_quantity {q} must be positive")))?,
        };

        let fixed_cost = u64::try_from(self.fixed_cost)
            .map_err(|_| invalid(format!("fixed_cost {} is negative", self.fixed_cost)))?;

        let mut inputs = Vec::with_capacity(self.inputs.len());
        for raw in self.inputs {
            let item = match raw.item {
                Some(id) => item_id(id).ok_or_else(|| invalid(format!("input id {id} out of range")))?,
                None => return Err(invalid("input without item id".into())),
            };
            let quantity = raw
                .quantity
                .and_then(|q| u32::try_from(q).ok())
                .filter(|q| *q > 0)
                .ok_or_else(|| invalid(format!("input {item} has non-positive quantity")))?;
            inputs.push(RecipeInput { item, quantity });
        }

        Ok(Recipe {
            name,
            output,
            output_quantity,
            inputs,
            fixed_cost,
            taxed: self.taxed,
            revenue: self.revenue,
        })
    }
}

fn item_id(raw: i64) -> Option<ItemId> {
    u32::try_from(raw).ok().map(ItemId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dose_ladder_expands_to_three_taxed_paths() {
        let ladder = DoseLadder {
            family: "Strength potion".into(),
            doses: [ItemId(119), ItemId(117), ItemId(115), ItemId(113)],
        };
        let group = ladder.expand();

        assert_eq!(group.recipes.len(), 3);
        assert!(group.recipes.iter().all(|r| r.taxed && r.output == ItemId(113)));
        assert_eq!(group.recipes[0].shape(), PathShape { consumed: 4, produced: 1 });
        assert_eq!(group.recipes[1].shape(), PathShape { consumed: 2, produced: 1 });
        assert_eq!(group.recipes[2].shape(), PathShape { consumed: 4, produced: 3 });
    }

    #[test]
    fn parses_groups_singles_and_ladders() {
        let toml = r#"
[[group]]
family = "Ahrim's hood"

[[group.recipe]]
name = "Repair"
output = 4708
fixed_cost = 60000
taxed = true
inputs = [{ item = 4860, quantity = 1 }]

[[recipe]]
name = "Varrock teleport"
output = 8007
inputs = [
    { item = 1761, quantity = 1 },
    { item = 556, quantity = 3 },
    { item = 554, quantity = 1 },
    { item = 563, quantity = 1 },
]

[[dose_ladder]]
family = "Prayer potion"
doses = [143, 141, 139, 2434]
"#;
        let catalog = RecipeCatalog::from_toml_str(toml).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.groups()[0].recipes[0].fixed_cost, 60000);
        assert_eq!(catalog.groups()[1].family, "Varrock teleport");
        assert_eq!(catalog.groups()[1].recipes[0].inputs[1].quantity, 3);
        assert_eq!(catalog.recipes().count(), 5);
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let toml = r#"
[[recipe]]
name = "Bad"
output = 1
inputs = [{ item = 2, quantity = 0 }]
"#;
        let err = RecipeCatalog::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, Error::InvalidRecipe { ref recipe, .. } if recipe == "Bad"));

        let toml = r#"
[[recipe]]
name = "Negative"
output = 1
inputs = [{ item = 2, quantity = -3 }]
"#;
        assert!(matches!(
            RecipeCatalog::from_toml_str(toml),
            Err(Error::InvalidRecipe { .. })
        ));
    }

    #[test]
    fn rejects_missing_output() {
        let toml = r#"
[[recipe]]
name = "Orphan"
inputs = [{ item = 2, quantity = 1 }]
"#;
        match RecipeCatalog::from_toml_str(toml) {
            Err(Error::InvalidRecipe { reason, .. }) => assert!(reason.contains("output")),
            other => panic!("expected InvalidRecipe, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_families_and_inputs() {
        let a = RecipeGroup::single(Recipe::new("Plank", ItemId(960), &[(ItemId(1511), 1)]));
        let b = a.clone();
        assert!(RecipeCatalog::new(vec![a, b]).is_err());

        let dup = RecipeGroup::single(Recipe::new(
            "Twice",
            ItemId(1),
            &[(ItemId(2), 1), (ItemId(2), 1)],
        ));
        assert!(RecipeCatalog::new(vec![dup]).is_err());
    }

    #[test]
    fn path_shapes_parse() {
        assert_eq!("4:3".parse::<PathShape>(), Ok(PathShape { consumed: 4, produced: 3 }));
        assert!("4".parse::<PathShape>().is_err());
        assert!("0:1".parse::<PathShape>().is_err());
        assert_eq!("10:10".parse::<PathShape>(), Ok(PathShape { consumed: 1, produced: 1 }));
        assert_eq!("8:6".parse::<PathShape>(), Ok(PathShape { consumed: 4, produced: 3 }));
    }

    #[test]
    fn bundled_catalog_is_valid() {
        let catalog = RecipeCatalog::bundled().unwrap();
        assert!(!catalog.is_empty());
        assert!(catalog.groups().iter().any(|g| g.recipes.len() == 3));

        let bolts = catalog
            .recipes()
            .find(|r| r.name == "Ruby bolts (e)")
            .unwrap();
        assert_eq!(bolts.output_quantity, 10);
        assert_eq!(bolts.shape(), PathShape { consumed: 1, produced: 1 });
        assert!(catalog.recipes().any(|r| r.name == "Ring of recoil"));
    }
}
