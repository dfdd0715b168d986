use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Grand Exchange item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ItemId)
    }
}

/// One item's prices at snapshot time. Absent prices stay `None`, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriceRecord {
    /// Instant-buy price ("low").
    pub buy: Option<u64>,
    /// Instant-sell price ("high").
    pub sell: Option<u64>,
    pub volume: Option<u64>,
    pub alch_value: Option<u64>,
}

/// Read-only, point-in-time price snapshot. The generation tags every batch
/// computed from it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    generation: u64,
    items: HashMap<ItemId, PriceRecord>,
}

impl Catalog {
    pub fn new(generation: u64, items: HashMap<ItemId, PriceRecord>) -> Self {
        Self { generation, items }
    }

    pub fn from_records<I>(generation: u64, records: I) -> Self
    where
        I: IntoIterator<Item = (ItemId, PriceRecord)>,
    {
        Self::new(generation, records.into_iter().collect())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: ItemId) -> Option<&PriceRecord> {
        self.items.get(&id)
    }

    pub fn buy_price(&self, id: ItemId) -> Option<u64> {
        self.get(id).and_then(|r| r.buy)
    }

    pub fn sell_price(&self, id: ItemId) -> Option<u64> {
        self.get(id).and_then(|r| r.sell)
    }

    pub fn alch_value(&self, id: ItemId) -> Option<u64> {
        self.get(id).and_then(|r| r.alch_value)
    }

    pub fn volume(&self, id: ItemId) -> Option<u64> {
        self.get(id).and_then(|r| r.volume)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-item trade volume figures used for liquidity weighting and outlier checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBaseline {
    pub hourly_volume: Option<u64>,
    pub daily_volume: Option<u64>,
    pub high_price_volume: Option<u64>,
    pub low_price_volume: Option<u64>,
}

pub type Baselines = HashMap<ItemId, VolumeBaseline>;

/// One 5-minute volume bucket as recorded by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSample {
    pub item_id: ItemId,
    /// Unix seconds at the start of the bucket.
    pub timestamp: i64,
    pub high_price_volume: u64,
    pub low_price_volume: u64,
}

impl VolumeSample {
    pub fn total(&self) -> u64 {
        self.high_price_volume + self.low_price_volume
    }
}
