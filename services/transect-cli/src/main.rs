//! Transect CLI
//!
//! Samples a dataset along paths and writes the sections as JSON.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use grid_resampler::{CancelFlag, MemoryDataset, SpatialIndexCache};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use transect_cli::{load_batch, BatchItem, CliConfig, Operation, PersistPool, Runner};

/// Transect CLI
#[derive(Parser, Debug)]
#[command(name = "transect-cli")]
#[command(about = "Sample ocean-model fields along transects, hovmoller sections and tracks")]
struct Args {
    /// Dataset file (.json, .yaml or .yml)
    #[arg(short, long, env = "TRANSECT_DATASET")]
    dataset: PathBuf,

    /// Directory results are written to
    #[arg(short, long, default_value = "output", env = "TRANSECT_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    json_logs: bool,

    /// Number of concurrent result writers (overrides PERSIST_WORKERS)
    #[arg(long)]
    persist_workers: Option<usize>,

    /// Number of worker threads
    #[arg(long, env = "TRANSECT_WORKER_THREADS")]
    worker_threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single query
    Run {
        #[arg(value_enum)]
        operation: Operation,

        /// Output file name, without extension
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        query: QueryArgs,
    },
    /// Run every query in a batch file
    Batch {
        /// Batch file (.json, .yaml or .yml)
        file: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
struct QueryArgs {
    /// Waypoints as "lat,lon;lat,lon;..."
    #[arg(long)]
    points: String,

    /// Variable name, or "u,v" for velocity
    #[arg(long)]
    variable: String,

    /// Depth level index or "bottom"
    #[arg(long)]
    depth: Option<String>,

    /// Time index or ISO 8601 timestamp
    #[arg(long)]
    time: Option<String>,

    /// Range start for hovmoller
    #[arg(long)]
    starttime: Option<String>,

    /// Range end for hovmoller
    #[arg(long)]
    endtime: Option<String>,

    /// Comma separated timestamps, one per track point
    #[arg(long)]
    times: Option<String>,

    /// Resampling method: nearest, bilinear or inverse_square
    #[arg(long)]
    interp: Option<String>,

    /// Neighbours for inverse-square weighting
    #[arg(long)]
    neighbours: Option<usize>,

    /// Radius of influence in meters
    #[arg(long)]
    radius: Option<f64>,

    /// Points along the discretized path
    #[arg(short, long)]
    n: Option<usize>,
}

impl QueryArgs {
    fn into_params(self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("points".to_string(), self.points);
        params.insert("variable".to_string(), self.variable);
        let optional = [
            ("depth", self.depth),
            ("time", self.time),
            ("starttime", self.starttime),
            ("endtime", self.endtime),
            ("times", self.times),
            ("interp", self.interp),
            ("neighbours", self.neighbours.map(|n| n.to_string())),
            ("radius", self.radius.map(|r| r.to_string())),
            ("n", self.n.map(|n| n.to_string())),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.insert(key.to_string(), value);
            }
        }
        params
    }
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = match runtime_builder.build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(args)) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = CliConfig::from_env();
    if let Some(workers) = args.persist_workers {
        config.persist_workers = workers;
    }
    config.validate().map_err(|e| anyhow!("invalid configuration: {}", e))?;

    let dataset = MemoryDataset::from_path(&args.dataset)
        .with_context(|| format!("loading dataset {}", args.dataset.display()))?;
    info!(
        id = %dataset.id,
        variables = dataset.variables.len(),
        timesteps = dataset.timestamps.len(),
        "Dataset loaded"
    );

    let items = match args.command {
        Command::Run {
            operation,
            name,
            query,
        } => vec![BatchItem {
            name: name.unwrap_or_else(|| operation.as_str().to_string()),
            operation,
            params: query.into_params(),
        }],
        Command::Batch { file } => load_batch(&file)?,
    };

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running query");
            on_signal.cancel();
        }
    });

    let dataset = Arc::new(dataset);
    let cache = Arc::new(SpatialIndexCache::new(config.resampler.index_cache_capacity));
    let resampler_config = Arc::new(config.resampler.clone());
    let mut pool = PersistPool::new(config.persist_workers);
    let mut query_failures = 0usize;

    for item in items {
        if cancel.is_cancelled() {
            break;
        }
        let (dataset, cache, resampler_config, flag) = (
            dataset.clone(),
            cache.clone(),
            resampler_config.clone(),
            cancel.clone(),
        );
        let operation = item.operation;
        let params = item.params;
        let outcome = tokio::task::spawn_blocking(move || {
            Runner::new(&dataset, &cache, &resampler_config)
                .with_cancel_flag(flag)
                .run(operation, &params)
        })
        .await
        .context("query task panicked")?;

        match outcome {
            Ok(value) => {
                let path = args.output_dir.join(format!("{}.json", item.name));
                pool.submit(path, &value).await;
            }
            Err(e) => {
                warn!(name = %item.name, error = %format!("{:#}", e), "Query failed");
                query_failures += 1;
            }
        }
    }

    let stats = cache.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate(),
        "Index cache"
    );

    let summary = pool.finish().await;
    if query_failures > 0 || summary.failed > 0 {
        return Err(anyhow!(
            "{} queries failed, {} results could not be written",
            query_failures,
            summary.failed
        ));
    }
    Ok(())
}
