use anyhow::anyhow;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::batch::Batch;
use crate::db::{TableSchema, TableSink};
use crate::error::{LoadError, LoadResult};
use crate::formats::value::normalize_row;
use crate::formats::{DelimitedConfig, DelimitedFile, read_delimited};
use crate::telemetry::{ProgressStats, TelemetryEvent};

/// A configured (input file, destination table) mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSpec {
    /// File name, resolved against the input folder
    pub source: String,
    /// Destination table, used verbatim
    pub table: String,
}

impl PairSpec {
    pub fn new(source: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            table: table.into(),
        }
    }
}

impl FromStr for PairSpec {
    type Err = anyhow::Error;

    /// Parse `file:table`, e.g. `orders.csv:orders`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, table) = s.rsplit_once(':').ok_or_else(|| {
            anyhow!(
                "Invalid pair '{}'. Expected format: 'file.csv:table'",
                s
            )
        })?;

        let source = source.trim();
        let table = table.trim();

        if source.is_empty() || table.is_empty() {
            return Err(anyhow!(
                "File and table names cannot be empty in pair '{}'",
                s
            ));
        }

        Ok(Self::new(source, table))
    }
}

/// Where a pair was in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PairStage {
    #[default]
    NotStarted,
    Reading,
    SchemaEnsured,
    Batching,
    Done,
}

/// Terminal state of one pair
#[derive(Debug)]
pub enum PairStatus {
    /// Every row was inserted and committed
    Loaded { rows_inserted: u64, batches: usize },
    /// The input file was absent; nothing was sent to the database
    Skipped { path: PathBuf },
    /// The pair was abandoned. Batches committed before the failure persist.
    Failed {
        stage: PairStage,
        rows_committed: u64,
        error: LoadError,
    },
}

/// Result of processing a single pair
#[derive(Debug)]
pub struct PairOutcome {
    pub pair: PairSpec,
    pub status: PairStatus,
    pub duration: Duration,
}

impl PairOutcome {
    /// Rows of this pair that are persisted in the destination table
    pub fn rows_committed(&self) -> u64 {
        match &self.status {
            PairStatus::Loaded { rows_inserted, .. } => *rows_inserted,
            PairStatus::Skipped { .. } => 0,
            PairStatus::Failed { rows_committed, .. } => *rows_committed,
        }
    }
}

/// Aggregated result of a whole run
#[derive(Debug)]
pub struct LoadSummary {
    pub run_id: String,
    pub outcomes: Vec<PairOutcome>,
    pub stats: ProgressStats,
    pub duration: Duration,
}

impl LoadSummary {
    pub fn rows_inserted(&self) -> u64 {
        self.stats.rows_inserted
    }

    pub fn has_failures(&self) -> bool {
        self.stats.pairs_failed > 0
    }
}

/// Loader settings shared by all pairs of a run
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub input_folder: PathBuf,
    pub batch_size: usize,
}

/// Progress of the pair currently being loaded
#[derive(Debug, Default)]
struct PairProgress {
    stage: PairStage,
    rows_committed: u64,
    batches: usize,
}

/// Loads pairs one after another into a table sink
///
/// Pairs are processed strictly in order; a pair is fully loaded (or
/// abandoned) before the next one starts.
pub struct Loader<S: TableSink> {
    sink: S,
    config: LoaderConfig,
    stats: ProgressStats,
}

impl<S: TableSink> Loader<S> {
    pub fn new(sink: S, config: LoaderConfig) -> Self {
        Self {
            sink,
            config,
            stats: ProgressStats::new(),
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Give the sink back so the caller can release it
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Process every pair and aggregate the outcomes
    ///
    /// Never fails as a whole: each pair's error is contained in its outcome.
    pub async fn run(&mut self, pairs: &[PairSpec]) -> LoadSummary {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        info!("Starting load run {} for {} file(s)", run_id, pairs.len());

        self.stats = ProgressStats::new();
        let mut outcomes = Vec::with_capacity(pairs.len());
        for pair in pairs {
            outcomes.push(self.load_pair(pair).await);
        }

        let duration = start_time.elapsed();
        info!(
            "Load run complete: {} loaded, {} skipped, {} failed, {} rows inserted in {:.2}s",
            self.stats.pairs_loaded,
            self.stats.pairs_skipped,
            self.stats.pairs_failed,
            self.stats.rows_inserted,
            duration.as_secs_f64()
        );

        LoadSummary {
            run_id,
            outcomes,
            stats: std::mem::take(&mut self.stats),
            duration,
        }
    }

    /// Load a single pair, containing any failure in the returned outcome
    pub async fn load_pair(&mut self, pair: &PairSpec) -> PairOutcome {
        let start_time = Instant::now();
        self.stats.update(&TelemetryEvent::PairStarted);

        let mut progress = PairProgress::default();
        let status = match self.load_file(pair, &mut progress).await {
            Ok(()) => {
                self.stats.update(&TelemetryEvent::PairLoaded);
                PairStatus::Loaded {
                    rows_inserted: progress.rows_committed,
                    batches: progress.batches,
                }
            }
            Err(LoadError::MissingInput { path }) => {
                warn!("{} not found in the specified folder.", pair.source);
                self.stats.update(&TelemetryEvent::PairSkipped);
                PairStatus::Skipped { path }
            }
            Err(error) => {
                error!("Error processing {}: {}", pair.source, error);
                if progress.rows_committed > 0 {
                    warn!(
                        "{} rows of {} were already committed to {}",
                        progress.rows_committed, pair.source, pair.table
                    );
                }
                self.stats.update(&TelemetryEvent::PairFailed);
                PairStatus::Failed {
                    stage: progress.stage,
                    rows_committed: progress.rows_committed,
                    error,
                }
            }
        };

        PairOutcome {
            pair: pair.clone(),
            status,
            duration: start_time.elapsed(),
        }
    }

    /// Read, infer, ensure the table, then insert the rows in batches
    async fn load_file(&mut self, pair: &PairSpec, progress: &mut PairProgress) -> LoadResult<()> {
        progress.stage = PairStage::Reading;

        let path = self.config.input_folder.join(&pair.source);
        if !tokio::fs::try_exists(&path).await? {
            return Err(LoadError::MissingInput { path });
        }

        info!("Processing {}", pair.source);
        let DelimitedFile { headers, rows } =
            read_delimited(&path, &DelimitedConfig::for_path(&path))?;
        let file = DelimitedFile {
            headers,
            rows: rows.into_iter().map(normalize_row).collect(),
        };

        let schema = TableSchema::infer(&file)?;
        warn_missing_values(pair, &schema);

        let existing_columns = self.sink.ensure_table(&pair.table, &schema).await?;
        progress.stage = PairStage::SchemaEnsured;
        check_table_columns(&pair.table, &schema, &existing_columns)?;
        info!(
            "Table {} ready with columns: {}",
            pair.table,
            schema.column_names().join(", ")
        );

        progress.stage = PairStage::Batching;
        let mut batch = Batch::new(self.config.batch_size);
        for row in file.rows {
            if batch.push(row) {
                self.flush(&pair.table, &schema, &mut batch, progress, false)
                    .await?;
            }
        }

        // Insert any remaining rows
        if !batch.is_empty() {
            self.flush(&pair.table, &schema, &mut batch, progress, true)
                .await?;
        }

        progress.stage = PairStage::Done;
        Ok(())
    }

    /// Insert and commit the buffered rows, then empty the batch
    async fn flush(
        &mut self,
        table: &str,
        schema: &TableSchema,
        batch: &mut Batch,
        progress: &mut PairProgress,
        remainder: bool,
    ) -> LoadResult<()> {
        let start = Instant::now();
        let inserted = self.sink.insert_batch(table, schema, batch.rows()).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        progress.rows_committed += inserted;
        progress.batches += 1;
        self.stats.update(&TelemetryEvent::BatchCommitted {
            rows: inserted,
            duration_ms,
        });

        if remainder {
            info!("Inserted remaining {} rows into {}", inserted, table);
        } else {
            info!("Inserted {} rows into {}", inserted, table);
        }

        batch.clear();
        Ok(())
    }
}

fn warn_missing_values(pair: &PairSpec, schema: &TableSchema) {
    if let Some(columns) = missing_value_columns(schema) {
        warn!(
            "{} contains missing data in column(s): {}",
            pair.source, columns
        );
    }
}

/// Columns holding null cells, with their counts, e.g. `Note (1)`
fn missing_value_columns(schema: &TableSchema) -> Option<String> {
    if schema.null_count() == 0 {
        return None;
    }

    let columns: Vec<String> = schema
        .columns
        .iter()
        .filter(|c| c.null_count > 0)
        .map(|c| format!("{} ({})", c.source_name, c.null_count))
        .collect();

    Some(columns.join(", "))
}

/// Fail early when a pre-existing table lacks columns this file would insert
///
/// Names compare case-insensitively, as MySQL column names do. Types are not
/// reconciled.
fn check_table_columns(table: &str, schema: &TableSchema, existing: &[String]) -> LoadResult<()> {
    let missing: Vec<String> = schema
        .columns
        .iter()
        .filter(|col| !existing.iter().any(|e| e.eq_ignore_ascii_case(&col.name)))
        .map(|col| col.name.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::SchemaMismatch {
            table: table.to_string(),
            missing,
        })
    }
}
