// Public API - the runner plus the pure schema helpers it is built on
pub mod runner;

pub use db::schema::{SemanticType, infer_type, sanitize_column_name};
pub use formats::value::{ValueKind, classify, normalize_row};

// Internal modules - organized by subsystem
mod config;
mod db;
mod error;
mod formats;
mod loading;
mod telemetry;
