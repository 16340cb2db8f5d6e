//! Configuration constants for the tabular loader
//!
//! This module centralizes all tunable parameters and defaults used throughout
//! the application.

use std::time::Duration;

// ============================================================================
// Connection Configuration
// ============================================================================

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(45);

pub const DEFAULT_DB_HOST: &str = "your_host";

pub const DEFAULT_DB_USER: &str = "your_username";

pub const DEFAULT_DB_PASSWORD: &str = "your_password";

pub const DEFAULT_DB_NAME: &str = "your_database";

pub const DEFAULT_DB_PORT: u16 = 3306;

// ============================================================================
// Load Configuration
// ============================================================================

/// Number of rows inserted and committed together
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Folder the configured input files are resolved against
pub const DEFAULT_INPUT_FOLDER: &str = "path_to_your_folder";

/// Input files and their destination tables, processed in this order
pub const DEFAULT_PAIRS: &[(&str, &str)] = &[
    ("customers.csv", "customers"),
    ("orders.csv", "orders"),
    ("sales.csv", "sales"),
    ("products.csv", "products"),
    ("delivery.csv", "delivery"),
    ("payments.csv", "payments"),
];

/// Upper bound on bind parameters in a single INSERT statement
///
/// SQLite caps host parameters at 32766 and MySQL at 65535; batches whose
/// `rows * columns` exceed this are split into several statements inside the
/// same transaction.
pub const MAX_BIND_PARAMS: usize = 32766;
