use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Rank Grand Exchange conversion opportunities from a price snapshot.
#[derive(Parser, Debug)]
#[command(name = "ge_convert")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: select the best path per family and rank the batch
    Rank(RankArgs),

    /// List every recipe's profit on its own, highest first
    Profits(ProfitArgs),

    /// Validate a recipe file and the configuration
    Check(CheckArgs),
}

/// Where the snapshot and recipes come from.
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Price catalog as JSON ({"<id>": {"high", "low", "volume", "highalch"}})
    #[arg(long, required_unless_present = "db", conflicts_with = "db")]
    pub prices: Option<PathBuf>,

    /// SQLite database with `prices` and `volume_samples` tables
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Volume baselines as JSON; overrides baselines derived from --db
    #[arg(long)]
    pub volumes: Option<PathBuf>,

    /// Recipe catalog (TOML); the bundled catalog when omitted
    #[arg(long)]
    pub recipes: Option<PathBuf>,

    /// Snapshot generation; defaults to the current unix time
    #[arg(long)]
    pub generation: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct RankArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Show at most this many families
    #[arg(long)]
    pub limit: Option<usize>,

    /// Hide families scoring below this (1-10)
    #[arg(long, default_value_t = 1.0)]
    pub min_score: f64,

    /// Only show families whose selected path has a volume spike
    #[arg(long)]
    pub flagged_only: bool,

    /// Also list recipes excluded for missing prices
    #[arg(long)]
    pub show_skipped: bool,

    /// Re-read the snapshot every N seconds and publish each new batch
    #[arg(long, value_name = "SECONDS")]
    pub watch: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ProfitArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub show_skipped: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Recipe catalog (TOML); the bundled catalog when omitted
    #[arg(long)]
    pub recipes: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rank_requires_a_price_source() {
        assert!(Cli::try_parse_from(["ge_convert", "rank"]).is_err());
        assert!(Cli::try_parse_from(["ge_convert", "rank", "--prices", "p.json", "--db", "m.db"]).is_err());

        let cli = Cli::try_parse_from(["ge_convert", "rank", "--db", "m.db", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Rank(args) => {
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.min_score, 1.0);
            }
            other => panic!("expected rank, got {other:?}"),
        }
    }
}
