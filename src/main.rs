use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pairfeed::codec::epoch_dir;
use pairfeed::{log_dataset_info, save_merged, DataConfig, PairedLoader};

/// Fetch test batches through the paired loader and write them to disk.
#[derive(Parser, Debug)]
#[command(name = "pairfeed")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON settings file.
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Number of test batches to fetch.
    #[arg(short, long, default_value = "1", value_name = "INT")]
    batches: usize,

    /// Test batch size, defaults to the configured one.
    #[arg(long, value_name = "INT")]
    batch_size: Option<usize>,

    /// Epoch directory to write into.
    #[arg(short, long, default_value = "0", value_name = "INT")]
    epoch: usize,

    /// Also write each batch as one tiled image, e.g. 4x5.
    #[arg(long, value_name = "ROWSxCOLS", value_parser = parse_grid)]
    grid: Option<(usize, usize)>,

    /// Seed for shuffling and flips.
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_grid(value: &str) -> std::result::Result<(usize, usize), String> {
    let (rows, cols) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got {value}"))?;
    let rows = rows.trim().parse::<usize>().map_err(|e| format!("rows: {e}"))?;
    let cols = cols.trim().parse::<usize>().map_err(|e| format!("cols: {e}"))?;
    if rows == 0 || cols == 0 {
        return Err("grid needs at least one row and one column".to_string());
    }
    Ok((rows, cols))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("pairfeed={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    let mut config = DataConfig::from_json_file(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    if args.seed.is_some() {
        config.shuffle_seed = args.seed;
    }
    let results_dir = config.results_dir.clone();

    let mut loader = PairedLoader::new(config).context("building the paired loader")?;
    log_dataset_info(&loader);

    let out_dir = epoch_dir(&results_dir, args.epoch);
    for n in 0..args.batches {
        let batch = loader
            .get_test_batch(args.batch_size)
            .with_context(|| format!("fetching test batch {n}"))?;

        let written = loader.save_images_as(batch.front.view(), &batch.profile_names(), args.epoch)?;
        tracing::info!(batch = n, images = written.len(), dir = %out_dir.display(), "saved test batch");

        if let Some((rows, cols)) = args.grid {
            let path = out_dir.join(format!("grid_{n}.png"));
            save_merged(batch.front.view(), rows, cols, &path)
                .with_context(|| format!("writing grid {}", path.display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_argument_parses() {
        assert_eq!(parse_grid("4x5"), Ok((4, 5)));
        assert_eq!(parse_grid("2X3"), Ok((2, 3)));
        assert!(parse_grid("4").is_err());
        assert!(parse_grid("0x3").is_err());
    }
}
