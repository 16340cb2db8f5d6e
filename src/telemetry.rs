/// Telemetry events emitted by the loader while it works through pairs
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// Loader started processing a pair
    PairStarted,
    /// A batch was inserted and committed
    BatchCommitted { rows: u64, duration_ms: u64 },
    /// Pair input was absent
    PairSkipped,
    /// Pair was abandoned after an error
    PairFailed,
    /// All rows of a pair were committed
    PairLoaded,
}

/// Statistics aggregated from telemetry events
#[derive(Debug, Default, Clone)]
pub struct ProgressStats {
    pub pairs_started: usize,
    pub pairs_loaded: usize,
    pub pairs_skipped: usize,
    pub pairs_failed: usize,
    pub rows_inserted: u64,
    pub batch_durations_ms: Vec<u64>,
}

impl ProgressStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a telemetry event
    pub fn update(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::PairStarted => {
                self.pairs_started += 1;
            }
            TelemetryEvent::BatchCommitted { rows, duration_ms } => {
                self.rows_inserted += rows;
                self.batch_durations_ms.push(*duration_ms);
            }
            TelemetryEvent::PairSkipped => {
                self.pairs_skipped += 1;
            }
            TelemetryEvent::PairFailed => {
                // Rows from batches committed before the failure are already counted
                self.pairs_failed += 1;
            }
            TelemetryEvent::PairLoaded => {
                self.pairs_loaded += 1;
            }
        }
    }

    pub fn batches_committed(&self) -> usize {
        self.batch_durations_ms.len()
    }

    /// Calculate percentile from batch durations
    pub fn percentile(&self, p: f64) -> Option<u64> {
        if self.batch_durations_ms.is_empty() {
            return None;
        }

        let mut sorted = self.batch_durations_ms.clone();
        sorted.sort_unstable();

        let index = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        let index = index.saturating_sub(1).min(sorted.len() - 1);

        Some(sorted[index])
    }

    /// Get p50, p90, p99 percentiles
    pub fn get_percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        (
            self.percentile(50.0),
            self.percentile(90.0),
            self.percentile(99.0),
        )
    }
}
