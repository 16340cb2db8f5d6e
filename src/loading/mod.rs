//! Sequential per-pair loading: read, infer, ensure table, insert in batches

pub mod batch;
pub mod loader;

pub use loader::{
    LoadSummary, Loader, LoaderConfig, PairOutcome, PairSpec, PairStage, PairStatus,
};
