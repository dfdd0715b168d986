// Collectors hand over prices as numbers, comma-formatted strings ("1,234"),
// or nothing at all. Everything downstream only ever sees `Option<u64>`:
// a value that fails to parse is absent, never zero.

use serde::Deserialize;

use crate::model::{PriceRecord, VolumeBaseline};

/// A price as it arrives from a collector. `Other` catches booleans, arrays
/// and objects so one odd field never fails the row around it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawPrice {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, RawPrice::Other(_))
    }
}

pub fn parse_price(raw: &RawPrice) -> Option<u64> {
    match raw {
        RawPrice::Integer(v) => u64::try_from(*v).ok(),
        RawPrice::Float(v) => from_float(*v),
        RawPrice::Text(s) => parse_price_str(s),
        RawPrice::Other(_) => None,
    }
}

pub fn parse_price_str(s: &str) -> Option<u64> {
    let cleaned: String = s
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('-') {
        return None;
    }

    match cleaned.parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => cleaned.parse::<f64>().ok().and_then(from_float),
    }
}

// Fractional prices (averaged feeds) truncate like the collector's integer parse.
fn from_float(v: f64) -> Option<u64> {
    if v.is_finite() && v >= 0.0 && v < u64::MAX as f64 {
        Some(v.floor() as u64)
    } else {
        None
    }
}

/// One catalog row before parsing, keyed the way the price feed names things.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPriceRecord {
    pub high: Option<RawPrice>,
    pub low: Option<RawPrice>,
    pub volume: Option<RawPrice>,
    #[serde(alias = "alchValue", alias = "highAlch")]
    pub highalch: Option<RawPrice>,
}

impl RawPriceRecord {
    pub fn parse(&self) -> PriceRecord {
        PriceRecord {
            buy: self.low.as_ref().and_then(parse_price),
            sell: self.high.as_ref().and_then(parse_price),
            volume: self.volume.as_ref().and_then(parse_price),
            alch_value: self.highalch.as_ref().and_then(parse_price),
        }
    }

    /// Names of fields holding a value no price can be read from.
    pub fn unsupported_fields(&self) -> Vec<&'static str> {
        [
            ("high", &self.high),
            ("low", &self.low),
            ("volume", &self.volume),
            ("highalch", &self.highalch),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_ref().is_some_and(RawPrice::is_unsupported))
        .map(|(name, _)| name)
        .collect()
    }
}

/// Volume figures as they arrive in a baselines file. Counts go through the
/// same parsing as prices, so "1,234" and 12.5 are read like any price.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawVolumeBaseline {
    pub hourly_volume: Option<RawPrice>,
    pub daily_volume: Option<RawPrice>,
    pub high_price_volume: Option<RawPrice>,
    pub low_price_volume: Option<RawPrice>,
}

impl RawVolumeBaseline {
    pub fn parse(&self) -> VolumeBaseline {
        VolumeBaseline {
            hourly_volume: self.hourly_volume.as_ref().and_then(parse_price),
            daily_volume: self.daily_volume.as_ref().and_then(parse_price),
            high_price_volume: self.high_price_volume.as_ref().and_then(parse_price),
            low_price_volume: self.low_price_volume.as_ref().and_then(parse_price),
        }
    }
}
