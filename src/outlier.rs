use serde::Serialize;

use crate::config::OutlierConfig;
use crate::model::{Baselines, ItemId, VolumeBaseline};

/// The volume figure trusted for an item, hourly preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "window", content = "volume", rename_all = "lowercase")]
pub enum VolumeReading {
    Hourly(u64),
    Daily(u64),
    Insufficient,
}

impl VolumeReading {
    /// Volume on the hourly scale; daily figures are spread over 24 hours.
    pub fn hourly_equivalent(&self) -> f64 {
        match self {
            VolumeReading::Hourly(v) => *v as f64,
            VolumeReading::Daily(v) => *v as f64 / 24.0,
            VolumeReading::Insufficient => 0.0,
        }
    }
}

pub fn current_volume(baseline: &VolumeBaseline, cfg: &OutlierConfig) -> VolumeReading {
    match (baseline.hourly_volume, baseline.daily_volume) {
        (Some(h), _) if h >= cfg.min_hourly_volume => VolumeReading::Hourly(h),
        (_, Some(d)) if d >= cfg.min_daily_volume => VolumeReading::Daily(d),
        _ => VolumeReading::Insufficient,
    }
}

/// Hourly-scale volume used for liquidity weighting. Items without a baseline
/// fall back to the catalog's own volume, read as a daily figure.
pub fn liquidity_volume(
    item: ItemId,
    catalog_volume: Option<u64>,
    baselines: Option<&Baselines>,
    cfg: &OutlierConfig,
) -> f64 {
    if let Some(baseline) = baselines.and_then(|b| b.get(&item)) {
        return current_volume(baseline, cfg).hourly_equivalent();
    }
    match catalog_volume {
        Some(d) if d >= cfg.min_daily_volume => VolumeReading::Daily(d).hourly_equivalent(),
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OutlierReason {
    VolumeSpike { observed_hourly: u64, expected_hourly: f64 },
    WithinBaseline { observed_hourly: u64, expected_hourly: f64 },
    InsufficientData,
    NoBaseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierVerdict {
    pub flagged: bool,
    pub reason: OutlierReason,
}

impl OutlierVerdict {
    fn clear(reason: OutlierReason) -> Self {
        Self {
            flagged: false,
            reason,
        }
    }
}

// Advisory: never fails and never touches a profit figure.
pub fn is_outlier(item: ItemId, baselines: Option<&Baselines>, cfg: &OutlierConfig) -> OutlierVerdict {
    match baselines.and_then(|b| b.get(&item)) {
        Some(baseline) => check_baseline(baseline, cfg),
        None => OutlierVerdict::clear(OutlierReason::NoBaseline),
    }
}

pub fn check_baseline(baseline: &VolumeBaseline, cfg: &OutlierConfig) -> OutlierVerdict {
    let observed = match current_volume(baseline, cfg) {
        VolumeReading::Hourly(h) => h,
        _ => return OutlierVerdict::clear(OutlierReason::InsufficientData),
    };
    let Some(daily) = baseline.daily_volume else {
        return OutlierVerdict::clear(OutlierReason::InsufficientData);
    };

    let expected = (daily as f64 / 24.0).max(1.0);
    if observed as f64 >= cfg.spike_multiplier * expected {
        OutlierVerdict {
            flagged: true,
            reason: OutlierReason::VolumeSpike {
                observed_hourly: observed,
                expected_hourly: expected,
            },
        }
    } else {
        OutlierVerdict::clear(OutlierReason::WithinBaseline {
            observed_hourly: observed,
            expected_hourly: expected,
        })
    }
}
