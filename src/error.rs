use std::fmt;

use thiserror::Error;

use crate::model::ItemId;

/// Configuration errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid recipe '{recipe}' in '{family}': {reason}")]
    InvalidRecipe {
        family: String,
        recipe: String,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a recipe produced no candidate. Exclusions are values, never errors:
/// the recipe is dropped from the result set and reported alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exclusion {
    MissingOutputPrice(ItemId),
    MissingInputPrice(ItemId),
    MissingAlchValue(ItemId),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::MissingOutputPrice(_) => write!(f, "missing-output-price"),
            Exclusion::MissingInputPrice(id) => write!(f, "missing-input-price:{id}"),
            Exclusion::MissingAlchValue(id) => write!(f, "missing-alch-value:{id}"),
        }
    }
}

impl serde::Serialize for Exclusion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
