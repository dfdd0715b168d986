use statrs::statistics::Statistics;
use crate::model::{Baselines, ItemId, VolumeBaseline, VolumeSample};
use std::collections::HashMap;

const HOUR: i64 = 60 * 60;
const DAY: i64 = 24 * HOUR;
const BUCKETS_PER_HOUR: usize = 12;

/// Roll 5-minute volume buckets up into per-item hourly and daily baselines
/// as of `now` (unix seconds). Only the trailing 24 hours are used.
pub fn build_baselines(samples: &[VolumeSample], now: i64) -> Baselines {
    let mut map: HashMap<ItemId, Vec<&VolumeSample>> = HashMap::new();

    for sample in samples {
        if sample.timestamp > now - DAY && sample.timestamp <= now {
            map.entry(sample.item_id).or_default().push(sample);
        }
    }

    let mut baselines = Baselines::new();

    for (id, records) in map {
        let daily: u64 = records.iter().map(|s| s.total()).sum();
        let high: u64 = records.iter().map(|s| s.high_price_volume).sum();
        let low: u64 = records.iter().map(|s| s.low_price_volume).sum();

        let last_hour: Vec<f64> = records
            .iter()
            .filter(|s| s.timestamp > now - HOUR)
            .map(|s| s.total() as f64)
            .collect();

        // A partly covered hour is extrapolated from its average bucket.
        let hourly = if last_hour.is_empty() {
            None
        } else if last_hour.len() >= BUCKETS_PER_HOUR {
            Some(last_hour.iter().sum::<f64>() as u64)
        } else {
            Some((last_hour.iter().mean() * BUCKETS_PER_HOUR as f64).round() as u64)
        };

        baselines.insert(
            id,
            VolumeBaseline {
                hourly_volume: hourly,
                daily_volume: Some(daily),
                high_price_volume: Some(high),
                low_price_volume: Some(low),
            },
        );
    }

    baselines
}
