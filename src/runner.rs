//! High-level runner API for the tabular loader.
//!
//! This module provides a simplified public interface that encapsulates
//! opening the database connection, loading every configured pair, and
//! releasing the connection.
//!
//! This is the primary API for external users and for the CLI.

use anyhow::Result;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::db::connection::{self, Connection};
use crate::db::ConnectArgsBuilder;
use crate::loading::{Loader, LoaderConfig};

pub use crate::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_DB_HOST, DEFAULT_DB_NAME, DEFAULT_DB_PASSWORD, DEFAULT_DB_PORT,
    DEFAULT_DB_USER, DEFAULT_INPUT_FOLDER, DEFAULT_PAIRS,
};
pub use crate::loading::{LoadSummary, PairOutcome, PairSpec, PairStage, PairStatus};

/// Arguments for running a load
#[derive(Clone)]
pub struct LoadArgs {
    // Connection configuration
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,

    // Source configuration
    pub input_folder: PathBuf,
    pub pairs: Vec<PairSpec>,

    // Performance tuning
    pub batch_size: usize,
}

impl LoadArgs {
    /// The built-in pair list, in processing order
    pub fn default_pairs() -> Vec<PairSpec> {
        DEFAULT_PAIRS
            .iter()
            .map(|(source, table)| PairSpec::new(*source, *table))
            .collect()
    }
}

impl Default for LoadArgs {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            username: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            database: DEFAULT_DB_NAME.to_string(),
            input_folder: PathBuf::from(DEFAULT_INPUT_FOLDER),
            pairs: Self::default_pairs(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Run a load with the specified arguments
///
/// A connection failure is the only error returned; it happens before any
/// pair is touched. Per-pair failures are reported in the summary.
///
/// # Example
///
/// ```no_run
/// use tabular_loader::runner::{LoadArgs, PairSpec, run_load};
///
/// # async fn example() -> anyhow::Result<()> {
/// let args = LoadArgs {
///     host: "db.internal".to_string(),
///     database: "warehouse".to_string(),
///     input_folder: "exports".into(),
///     pairs: vec![PairSpec::new("orders.csv", "orders")],
///     ..LoadArgs::default()
/// };
///
/// let summary = run_load(args).await?;
/// println!("Inserted {} rows", summary.rows_inserted());
/// # Ok(())
/// # }
/// ```
pub async fn run_load(args: LoadArgs) -> Result<LoadSummary> {
    let connect_args = ConnectArgsBuilder::default()
        .host(&args.host)
        .port(args.port)
        .username(&args.username)
        .password(&args.password)
        .database(&args.database)
        .build()?;

    let conn = match connection::connect(connect_args).await {
        Ok(conn) => {
            info!("Database connection successful");
            conn
        }
        Err(e) => {
            error!("Error: {:#}", e);
            return Err(e);
        }
    };

    Ok(load_with_connection(conn, &args).await)
}

/// Load every pair over an already open connection, then close it
pub(crate) async fn load_with_connection(conn: Connection, args: &LoadArgs) -> LoadSummary {
    let mut loader = Loader::new(
        conn,
        LoaderConfig {
            input_folder: args.input_folder.clone(),
            batch_size: args.batch_size,
        },
    );

    let summary = loader.run(&args.pairs).await;

    match loader.into_sink().close().await {
        Ok(()) => info!("Database connection closed"),
        Err(e) => warn!("Failed to close database connection cleanly: {}", e),
    }

    summary
}
