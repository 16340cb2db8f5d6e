use clap::Parser;
use std::path::PathBuf;
use tabular_loader::runner::{
    DEFAULT_BATCH_SIZE, DEFAULT_DB_HOST, DEFAULT_DB_NAME, DEFAULT_DB_PASSWORD, DEFAULT_DB_PORT,
    DEFAULT_DB_USER, DEFAULT_INPUT_FOLDER, LoadArgs, PairSpec, PairStatus, run_load,
};

/// Load delimited files into database tables, creating each table if absent
#[derive(Parser, Clone)]
#[command(version, about)]
struct Args {
    /// Database host
    #[arg(long, env = "DB_HOST", default_value = DEFAULT_DB_HOST)]
    host: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    port: u16,

    /// Database username
    #[arg(short, long, env = "DB_USER", default_value = DEFAULT_DB_USER)]
    username: String,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", default_value = DEFAULT_DB_PASSWORD, hide_env_values = true)]
    password: String,

    /// Database name
    #[arg(short, long, env = "DB_NAME", default_value = DEFAULT_DB_NAME)]
    database: String,

    /// Folder containing the input files
    #[arg(short, long, default_value = DEFAULT_INPUT_FOLDER)]
    folder: PathBuf,

    /// Number of rows inserted and committed together
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE, value_parser = cli::parse_batch_size)]
    batch_size: usize,

    /// Input file and destination table (format: file.csv:table). Repeat for
    /// several pairs; replaces the built-in list.
    #[arg(short, long = "pair", value_name = "FILE:TABLE")]
    pairs: Vec<PairSpec>,

    /// Quiet mode - only warnings, errors and the summary
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply
    dotenv::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing based on quiet mode
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let default_filter = if args.quiet {
        "tabular_loader=warn,sqlx=off"
    } else {
        "tabular_loader=info,sqlx=off"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let pairs = if args.pairs.is_empty() {
        LoadArgs::default_pairs()
    } else {
        args.pairs.clone()
    };

    if !args.quiet {
        println!("Tabular Loader");
        println!("==============");
        println!("Database: {}@{}:{}/{}", args.username, args.host, args.port, args.database);
        println!("Folder: {}", args.folder.display());
        println!("Files: {}", pairs.len());
        println!("Batch size: {}", args.batch_size);
        println!();
    }

    let load_args = LoadArgs {
        host: args.host,
        port: args.port,
        username: args.username,
        password: args.password,
        database: args.database,
        input_folder: args.folder,
        pairs,
        batch_size: args.batch_size,
    };

    // Connection failure is the only error that ends the process early
    let summary = run_load(load_args).await?;

    println!();
    println!("Load Summary");
    println!("============");
    println!("Run ID: {}", summary.run_id);
    for outcome in &summary.outcomes {
        let status = match &outcome.status {
            PairStatus::Loaded {
                rows_inserted,
                batches,
            } => format!("loaded {} rows in {} batch(es)", rows_inserted, batches),
            PairStatus::Skipped { path } => format!("skipped, {} not found", path.display()),
            PairStatus::Failed {
                stage,
                rows_committed,
                error,
            } => format!(
                "failed while {:?} ({} rows committed): {}",
                stage, rows_committed, error
            ),
        };
        println!(
            "  {} -> {}: {} [{:.2}s]",
            outcome.pair.source,
            outcome.pair.table,
            status,
            outcome.duration.as_secs_f64()
        );
    }
    println!("Rows inserted: {}", summary.rows_inserted());
    println!(
        "Files: {} loaded, {} skipped, {} failed",
        summary.stats.pairs_loaded, summary.stats.pairs_skipped, summary.stats.pairs_failed
    );
    let (p50, p90, p99) = summary.stats.get_percentiles();
    if let (Some(p50), Some(p90), Some(p99)) = (p50, p90, p99) {
        println!(
            "Batch time: p50: {}ms, p90: {}ms, p99: {}ms",
            p50, p90, p99
        );
    }
    println!("Duration: {:.2}s", summary.duration.as_secs_f64());

    Ok(())
}

/// CLI utility functions for parsing command-line arguments
mod cli {
    /// Parse a batch size, rejecting zero
    pub fn parse_batch_size(s: &str) -> anyhow::Result<usize> {
        let size: usize = s
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid batch size '{}': {}", s, e))?;

        if size == 0 {
            return Err(anyhow::anyhow!("Batch size must be at least 1"));
        }

        Ok(size)
    }
}
