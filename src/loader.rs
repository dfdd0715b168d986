use rusqlite::types::Value;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use crate::error::Result;
use crate::model::{Baselines, Catalog, ItemId, PriceRecord, VolumeSample};
use crate::price::{RawPrice, RawPriceRecord, RawVolumeBaseline};

// The price feed sometimes wraps its map in `{ "data": ... }`. Rows stay
// untyped here so a malformed row only costs that row.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped { data: HashMap<String, serde_json::Value> },
    Plain(HashMap<String, serde_json::Value>),
}

pub fn load_catalog_json<P: AsRef<Path>>(path: P, generation: u64) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)?;
    parse_catalog_json(&content, generation)
}

pub fn parse_catalog_json(content: &str, generation: u64) -> Result<Catalog> {
    let raw = match serde_json::from_str(content)? {
        CatalogFile::Wrapped { data } => data,
        CatalogFile::Plain(map) => map,
    };

    let records = raw.into_iter().filter_map(|(key, value)| {
        let id = item_key(&key)?;
        let record: RawPriceRecord = row(id, value)?;
        let unsupported = record.unsupported_fields();
        if !unsupported.is_empty() {
            warn!(%id, fields = ?unsupported, "treating unreadable price fields as absent");
        }
        Some((id, record.parse()))
    });

    Ok(Catalog::from_records(generation, records))
}

pub fn load_baselines_json<P: AsRef<Path>>(path: P) -> Result<Baselines> {
    let content = std::fs::read_to_string(path)?;
    parse_baselines_json(&content)
}

pub fn parse_baselines_json(content: &str) -> Result<Baselines> {
    let raw: HashMap<String, serde_json::Value> = serde_json::from_str(content)?;

    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| {
            let id = item_key(&key)?;
            let baseline: RawVolumeBaseline = row(id, value)?;
            Some((id, baseline.parse()))
        })
        .collect())
}

fn item_key(key: &str) -> Option<ItemId> {
    match key.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(key, "dropping catalog row with malformed item id");
            None
        }
    }
}

fn row<T: DeserializeOwned>(id: ItemId, value: serde_json::Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(row) => Some(row),
        Err(e) => {
            warn!(%id, error = %e, "dropping unreadable catalog row");
            None
        }
    }
}

/// Read the collector's latest prices. Price columns may hold integers,
/// reals or comma-formatted text; anything unparseable is absent.
pub fn load_catalog_sqlite<P: AsRef<Path>>(db_path: P, generation: u64) -> Result<Catalog> {
    let conn = Connection::open(db_path)?;

    let mut stmt = conn.prepare(
        "SELECT item_id, high, low, volume, highalch
         FROM prices
         ORDER BY item_id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            RawPriceRecord {
                high: raw_price(row.get(1)?),
                low: raw_price(row.get(2)?),
                volume: raw_price(row.get(3)?),
                highalch: raw_price(row.get(4)?),
            },
        ))
    })?;

    let mut records: Vec<(ItemId, PriceRecord)> = Vec::new();
    for row in rows {
        let (id, raw) = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "dropping unreadable price row");
                continue;
            }
        };
        match u32::try_from(id) {
            Ok(id) => records.push((ItemId(id), raw.parse())),
            Err(_) => warn!(id, "dropping price row with out-of-range item id"),
        }
    }

    Ok(Catalog::from_records(generation, records))
}

fn raw_price(value: Value) -> Option<RawPrice> {
    match value {
        Value::Integer(v) => Some(RawPrice::Integer(v)),
        Value::Real(v) => Some(RawPrice::Float(v)),
        Value::Text(s) => Some(RawPrice::Text(s)),
        Value::Null | Value::Blob(_) => None,
    }
}

/// 5-minute volume buckets recorded at or after `since` (unix seconds).
pub fn load_volume_samples<P: AsRef<Path>>(db_path: P, since: i64) -> Result<Vec<VolumeSample>> {
    let conn = Connection::open(db_path)?;

    let mut stmt = conn.prepare(
        "SELECT item_id, timestamp, high_price_volume, low_price_volume
         FROM volume_samples
         WHERE timestamp >= ?1
         ORDER BY timestamp",
    )?;

    let rows = stmt.query_map([since], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    let mut samples = Vec::new();
    for row in rows {
        let (id, timestamp, high, low) = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "dropping unreadable volume sample");
                continue;
            }
        };
        match volume_sample(id, timestamp, high, low) {
            Some(sample) => samples.push(sample),
            None => warn!(id, timestamp, high, low, "dropping out-of-range volume sample"),
        }
    }

    Ok(samples)
}

fn volume_sample(id: i64, timestamp: i64, high: i64, low: i64) -> Option<VolumeSample> {
    Some(VolumeSample {
        item_id: ItemId(u32::try_from(id).ok()?),
        timestamp,
        high_price_volume: u64::try_from(high).ok()?,
        low_price_volume: u64::try_from(low).ok()?,
    })
}
