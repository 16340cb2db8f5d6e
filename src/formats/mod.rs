//! Delimited file parsing and cell-level value handling

pub mod delimited;
pub mod reader;
pub mod value;

pub use delimited::{DelimitedFile, read_delimited};
pub use reader::DelimitedConfig;
pub use value::Row;
