use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info};

use ge_convert::cli::{CheckArgs, Cli, Commands, OutputFormat, ProfitArgs, RankArgs, SnapshotArgs};
use ge_convert::config::Config;
use ge_convert::loader::{
    load_baselines_json, load_catalog_json, load_catalog_sqlite, load_volume_samples,
};
use ge_convert::model::{Baselines, Catalog};
use ge_convert::pipeline::{rank_by_profit, run_batch, Batch, Publisher};
use ge_convert::recipe::RecipeCatalog;
use ge_convert::report::{batch_rows, render_batch, render_profits, render_skipped, ReportFilter};
use ge_convert::stats::build_baselines;

const DAY: i64 = 24 * 60 * 60;

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            std::process::exit(1);
        }
    };
    config.init_logging();

    if let Err(e) = run(cli.command, &config) {
        error!(error = %e, "command failed");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("reading {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Rank(args) => rank(args, config),
        Commands::Profits(args) => profits(args, config),
        Commands::Check(args) => check(args),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn load_recipes(args: &SnapshotArgs) -> Result<RecipeCatalog> {
    match &args.recipes {
        Some(path) => RecipeCatalog::load(path).with_context(|| format!("reading {}", path.display())),
        None => RecipeCatalog::bundled().context("bundled recipe catalog"),
    }
}

fn load_snapshot(args: &SnapshotArgs, generation: u64) -> Result<(Catalog, Option<Baselines>)> {
    let now = unix_now();

    let catalog = match (&args.db, &args.prices) {
        (Some(db), _) => load_catalog_sqlite(db, generation)
            .with_context(|| format!("reading prices from {}", db.display()))?,
        (None, Some(prices)) => load_catalog_json(prices, generation)
            .with_context(|| format!("reading {}", prices.display()))?,
        (None, None) => bail!("either --prices or --db is required"),
    };

    let baselines = match (&args.volumes, &args.db) {
        (Some(volumes), _) => Some(
            load_baselines_json(volumes).with_context(|| format!("reading {}", volumes.display()))?,
        ),
        (None, Some(db)) => {
            let samples = load_volume_samples(db, now - DAY)
                .with_context(|| format!("reading volume samples from {}", db.display()))?;
            (!samples.is_empty()).then(|| build_baselines(&samples, now))
        }
        (None, None) => None,
    };

    info!(
        generation,
        items = catalog.len(),
        baselines = baselines.as_ref().map_or(0, |b| b.len()),
        "snapshot loaded"
    );
    Ok((catalog, baselines))
}

fn rank(args: RankArgs, config: &Config) -> Result<()> {
    let recipes = load_recipes(&args.snapshot)?;
    let filter = ReportFilter {
        min_score: args.min_score,
        flagged_only: args.flagged_only,
        limit: args.limit,
    };

    let Some(interval) = args.watch else {
        let generation = args.snapshot.generation.unwrap_or(unix_now() as u64);
        let (catalog, baselines) = load_snapshot(&args.snapshot, generation)?;
        let batch = run_batch(&catalog, baselines.as_ref(), &recipes, &config.engine);
        return print_batch(&batch, &filter, &args);
    };

    let publisher = Publisher::new();
    let mut generation = args.snapshot.generation.unwrap_or(unix_now() as u64);
    loop {
        publisher.observe(generation);
        match load_snapshot(&args.snapshot, generation) {
            Ok((catalog, baselines)) => {
                let batch = run_batch(&catalog, baselines.as_ref(), &recipes, &config.engine);
                if publisher.publish(batch) {
                    if let Some(current) = publisher.current() {
                        print_batch(&current, &filter, &args)?;
                    }
                }
            }
            // A bad tick keeps the last published batch.
            Err(e) => error!(error = %format!("{e:#}"), generation, "snapshot refresh failed"),
        }
        std::thread::sleep(Duration::from_secs(interval));
        generation += 1;
    }
}

fn print_batch(batch: &Batch, filter: &ReportFilter, args: &RankArgs) -> Result<()> {
    match args.format {
        OutputFormat::Table => {
            println!("{}", render_batch(batch, filter));
            if args.show_skipped && !batch.skipped.is_empty() {
                println!("{}", render_skipped(&batch.skipped));
            }
        }
        OutputFormat::Json => {
            let results: Vec<_> = batch_rows(batch, filter).into_iter().map(|(_, r)| r).collect();
            let skipped: &[_] = if args.show_skipped { &batch.skipped } else { &[] };
            let view = serde_json::json!({
                "generation": batch.generation,
                "results": results,
                "skipped": skipped,
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }
    Ok(())
}

fn profits(args: ProfitArgs, config: &Config) -> Result<()> {
    let recipes = load_recipes(&args.snapshot)?;
    let generation = args.snapshot.generation.unwrap_or(unix_now() as u64);
    let (catalog, _) = load_snapshot(&args.snapshot, generation)?;
    let mut listing = rank_by_profit(&recipes, &catalog, &config.engine.tax);

    match args.format {
        OutputFormat::Table => {
            println!("{}", render_profits(&listing, args.limit));
            if args.show_skipped && !listing.skipped.is_empty() {
                println!("{}", render_skipped(&listing.skipped));
            }
        }
        OutputFormat::Json => {
            if let Some(limit) = args.limit {
                listing.rows.truncate(limit);
            }
            if !args.show_skipped {
                listing.skipped.clear();
            }
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
    }
    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let recipes = match &args.recipes {
        Some(path) => RecipeCatalog::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => RecipeCatalog::bundled().context("bundled recipe catalog")?,
    };

    let multi_path = recipes.groups().iter().filter(|g| g.recipes.len() > 1).count();
    println!(
        "recipes ok: {} families ({} multi-path), {} recipes",
        recipes.len(),
        multi_path,
        recipes.recipes().count()
    );
    println!("config ok");
    Ok(())
}
