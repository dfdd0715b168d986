//! Engine and logging configuration loaded from TOML.
//!
//! Every field has a default, so a missing file section (or no file at all)
//! yields the canonical rules.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ConfigError, Error};
use crate::recipe::PathShape;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    #[serde(flatten)]
    pub engine: EngineConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: format!("'{}' is not one of pretty, json", self.logging.format),
            });
        }
        self.engine.validate()
    }

    pub fn init_logging(&self) {
        self.logging.init();
    }
}

/// Everything the pure engine reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tax: TaxRule,
    pub outlier: OutlierConfig,
    pub resolver: ResolverConfig,
}

impl EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tax.rate_bps > 10_000 {
            return Err(ConfigError::InvalidValue {
                field: "tax.rate_bps",
                reason: format!("{} exceeds 10000 (100%)", self.tax.rate_bps),
            });
        }
        if !(self.outlier.spike_multiplier.is_finite() && self.outlier.spike_multiplier > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "outlier.spike_multiplier",
                reason: format!("{} must be a positive number", self.outlier.spike_multiplier),
            });
        }

        let resolver = &self.resolver;
        let weights = resolver
            .path_weights
            .values()
            .chain(std::iter::once(&resolver.default_path_weight));
        for weight in weights {
            if !(weight.is_finite() && *weight > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: "resolver.path_weights",
                    reason: format!("weight {weight} must be a positive number"),
                });
            }
        }
        if !(0.0..=1.0).contains(&resolver.outlier_discount) {
            return Err(ConfigError::InvalidValue {
                field: "resolver.outlier_discount",
                reason: format!("{} is outside [0, 1]", resolver.outlier_discount),
            });
        }
        Ok(())
    }
}

/// Market tax on the sale of one output unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaxRule {
    /// Basis points of the unit sell price; 100 = 1%.
    pub rate_bps: u32,
    /// Largest tax charged per unit; 0 disables the cap.
    pub cap: u64,
}

impl TaxRule {
    /// Tax owed on one unit, floored to whole coins. Rates above 100% are
    /// read as 100%.
    pub fn tax_on(&self, unit_price: u64) -> u64 {
        let rate = self.rate_bps.min(10_000);
        let tax = (u128::from(unit_price) * u128::from(rate) / 10_000) as u64;
        if self.cap > 0 {
            tax.min(self.cap)
        } else {
            tax
        }
    }

    pub fn after_tax(&self, unit_price: u64) -> u64 {
        unit_price.saturating_sub(self.tax_on(unit_price))
    }
}

impl Default for TaxRule {
    fn default() -> Self {
        Self {
            rate_bps: 100,
            cap: 5_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Hourly trades needed before hourly volume is trusted.
    pub min_hourly_volume: u64,
    /// Daily trades needed before daily volume is trusted.
    pub min_daily_volume: u64,
    /// Flag when hourly volume reaches this multiple of daily / 24.
    pub spike_multiplier: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            min_hourly_volume: 10,
            min_daily_volume: 20,
            spike_multiplier: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    #[serde(deserialize_with = "path_weights_from_keys")]
    pub path_weights: BTreeMap<PathShape, f64>,
    /// Weight for shapes missing from the table.
    pub default_path_weight: f64,
    /// Score multiplier for candidates whose volume is flagged as a spike.
    pub outlier_discount: f64,
}

impl ResolverConfig {
    pub fn weight_for(&self, shape: PathShape) -> f64 {
        self.path_weights
            .get(&shape)
            .copied()
            .unwrap_or(self.default_path_weight)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let path_weights = [((1, 1), 1.0), ((4, 3), 0.9), ((2, 1), 0.85), ((4, 1), 0.7)]
            .into_iter()
            .map(|((consumed, produced), w)| (PathShape { consumed, produced }, w))
            .collect();

        Self {
            path_weights,
            default_path_weight: 0.5,
            outlier_discount: 1.0,
        }
    }
}

fn path_weights_from_keys<'de, D>(deserializer: D) -> Result<BTreeMap<PathShape, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, weight)| {
            key.parse::<PathShape>()
                .map(|shape| (shape, weight))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}
