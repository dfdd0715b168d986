//! Conversion profit and arbitrage ranking for Grand Exchange items.
//!
//! A snapshot of prices goes in; every recipe is priced after tax, the most
//! attractive path per family is selected with liquidity and volume-spike
//! checks, and the batch is ranked on a 1-10 scale.

pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod outlier;
pub mod pipeline;
pub mod price;
pub mod profit;
pub mod recipe;
pub mod report;
pub mod resolver;
pub mod stats;

pub use error::{Error, Result};
