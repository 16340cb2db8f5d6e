//! Database layer - connection handling, schema inference, and the table sink seam

pub mod connection;
pub mod schema;
pub mod sink;

pub use connection::ConnectArgsBuilder;
pub use schema::TableSchema;
pub use sink::TableSink;
