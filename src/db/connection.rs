//! Database connection handle backed by sqlx.
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use derive_builder::Builder;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::query::Query;
use sqlx::{ConnectOptions, Connection as _, Database, Encode, Type};

use super::schema::{TableSchema, generate_ddl};
use super::sink::{SqlValue, TableSink, build_insert_statements};
use crate::config::{CONNECT_TIMEOUT, DEFAULT_DB_PORT};
use crate::error::LoadResult;
use crate::formats::Row;

/// Inner connection variants
enum ConnectionInner {
    MySql(MySqlConnection),
    #[cfg(test)]
    Sqlite(sqlx::SqliteConnection),
}

/// The single connection a run uses, reused serially for every pair
pub struct Connection {
    inner: ConnectionInner,
}

#[derive(Builder)]
pub struct ConnectArgs {
    #[builder(setter(into))]
    host: String,
    #[builder(default = "DEFAULT_DB_PORT")]
    port: u16,
    #[builder(setter(into))]
    username: String,
    #[builder(setter(into))]
    password: String,
    #[builder(setter(into))]
    database: String,
}

pub async fn connect(args: ConnectArgs) -> Result<Connection> {
    let ConnectArgs {
        host,
        port,
        username,
        password,
        database,
    } = args;

    let connect_options = MySqlConnectOptions::new()
        .host(&host)
        .port(port)
        .username(&username)
        .password(&password)
        .database(&database);

    let conn = tokio::time::timeout(CONNECT_TIMEOUT, connect_options.connect())
        .await
        .map_err(|_| {
            anyhow!(
                "Timed out after {}s connecting to {}:{}",
                CONNECT_TIMEOUT.as_secs(),
                host,
                port
            )
        })?
        .with_context(|| format!("Failed to connect to database '{}' on {}", database, host))?;

    Ok(Connection {
        inner: ConnectionInner::MySql(conn),
    })
}

impl Connection {
    /// Create an in-memory SQLite connection for testing
    #[cfg(test)]
    pub async fn sqlite_in_memory() -> Result<Self, sqlx::Error> {
        let conn = sqlx::SqliteConnection::connect("sqlite::memory:").await?;
        Ok(Connection {
            inner: ConnectionInner::Sqlite(conn),
        })
    }

    /// Execute a statement without bind parameters (DDL)
    pub async fn execute(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        match &mut self.inner {
            ConnectionInner::MySql(conn) => {
                sqlx::query(sql).execute(conn).await?;
            }
            #[cfg(test)]
            ConnectionInner::Sqlite(conn) => {
                sqlx::query(sql).execute(conn).await?;
            }
        }
        Ok(())
    }

    /// Fetch a single integer, e.g. `SELECT COUNT(*) ...`
    #[cfg(test)]
    pub async fn fetch_count(&mut self, sql: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = match &mut self.inner {
            ConnectionInner::MySql(conn) => sqlx::query_as(sql).fetch_one(conn).await?,
            ConnectionInner::Sqlite(conn) => sqlx::query_as(sql).fetch_one(conn).await?,
        };
        Ok(count)
    }

    /// List the column names of a table in ordinal order (empty if absent)
    pub async fn table_columns(&mut self, table_name: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = match &mut self.inner {
            ConnectionInner::MySql(conn) => {
                // information_schema columns are reported as binary strings on some servers
                let query = r#"
                    SELECT CAST(column_name AS CHAR)
                    FROM information_schema.columns
                    WHERE table_schema = DATABASE() AND table_name = ?
                    ORDER BY ordinal_position
                "#;
                sqlx::query_as(query)
                    .bind(table_name)
                    .fetch_all(conn)
                    .await?
            }
            #[cfg(test)]
            ConnectionInner::Sqlite(conn) => {
                sqlx::query_as("SELECT name FROM pragma_table_info(?) ORDER BY cid")
                    .bind(table_name)
                    .fetch_all(conn)
                    .await?
            }
        };

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Close the connection, flushing the protocol shutdown to the server
    pub async fn close(self) -> Result<(), sqlx::Error> {
        match self.inner {
            ConnectionInner::MySql(conn) => conn.close().await,
            #[cfg(test)]
            ConnectionInner::Sqlite(conn) => conn.close().await,
        }
    }
}

#[async_trait]
impl TableSink for Connection {
    async fn ensure_table(
        &mut self,
        table: &str,
        schema: &TableSchema,
    ) -> LoadResult<Vec<String>> {
        let ddl = generate_ddl(table, schema);
        tracing::debug!(table, %ddl, "ensuring table");

        self.execute(&ddl).await?;
        Ok(self.table_columns(table).await?)
    }

    async fn insert_batch(
        &mut self,
        table: &str,
        schema: &TableSchema,
        rows: &[Row],
    ) -> LoadResult<u64> {
        let statements = build_insert_statements(table, schema, rows)?;
        let inserted: usize = statements.iter().map(|s| s.row_count).sum();

        // One transaction per batch: dropping it on error rolls the batch back
        match &mut self.inner {
            ConnectionInner::MySql(conn) => {
                let mut tx = conn.begin().await?;
                for statement in &statements {
                    bind_values(sqlx::query(&statement.sql), &statement.values)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await?;
            }
            #[cfg(test)]
            ConnectionInner::Sqlite(conn) => {
                let mut tx = conn.begin().await?;
                for statement in &statements {
                    bind_values(sqlx::query(&statement.sql), &statement.values)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await?;
            }
        }

        Ok(inserted as u64)
    }
}

/// Bind converted values in placeholder order
fn bind_values<'q, DB>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    values: &'q [SqlValue],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    bool: Encode<'q, DB> + Type<DB>,
    NaiveDateTime: Encode<'q, DB> + Type<DB>,
    &'q str: Encode<'q, DB> + Type<DB>,
    Option<&'q str>: Encode<'q, DB> + Type<DB>,
{
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(None::<&'q str>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Boolean(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{ColumnDescriptor, SemanticType};

    fn schema() -> TableSchema {
        let column = |name: &str, semantic_type| ColumnDescriptor {
            name: name.to_string(),
            source_name: name.to_string(),
            semantic_type,
            null_count: 0,
        };
        TableSchema {
            columns: vec![
                column("id", SemanticType::Integer),
                column("price", SemanticType::Float),
                column("active", SemanticType::Boolean),
                column("seen_at", SemanticType::Timestamp),
                column("note", SemanticType::Text),
            ],
        }
    }

    #[test]
    fn test_connect_args_default_port() {
        let args = ConnectArgsBuilder::default()
            .host("localhost")
            .username("loader")
            .password("secret")
            .database("warehouse")
            .build()
            .unwrap();

        assert_eq!(args.port, DEFAULT_DB_PORT);
        assert_eq!(args.host, "localhost");
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let mut conn = Connection::sqlite_in_memory().await.unwrap();

        let columns = conn.ensure_table("items", &schema()).await.unwrap();
        assert_eq!(columns, vec!["id", "price", "active", "seen_at", "note"]);

        // Second call must not fail or change the table
        let columns = conn.ensure_table("items", &schema()).await.unwrap();
        assert_eq!(columns.len(), 5);
    }

    #[tokio::test]
    async fn test_table_columns_of_absent_table() {
        let mut conn = Connection::sqlite_in_memory().await.unwrap();

        let columns = conn.table_columns("nope").await.unwrap();

        assert!(columns.is_empty());
    }

    #[tokio::test]
    async fn test_insert_batch_binds_typed_values() {
        let mut conn = Connection::sqlite_in_memory().await.unwrap();
        conn.ensure_table("items", &schema()).await.unwrap();

        let rows: Vec<Row> = vec![
            vec![
                Some("1".to_string()),
                Some("9.5".to_string()),
                Some("true".to_string()),
                Some("2025-01-01 08:00:00".to_string()),
                Some("first".to_string()),
            ],
            vec![Some("2".to_string()), None, None, None, None],
        ];

        let inserted = conn.insert_batch("items", &schema(), &rows).await.unwrap();
        assert_eq!(inserted, 2);

        let count = conn
            .fetch_count("SELECT COUNT(*) FROM items")
            .await
            .unwrap();
        assert_eq!(count, 2);

        let nulls = conn
            .fetch_count("SELECT COUNT(*) FROM items WHERE note IS NULL AND price IS NULL")
            .await
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[tokio::test]
    async fn test_insert_batch_counts_rows_across_split_statements() {
        let mut conn = Connection::sqlite_in_memory().await.unwrap();
        let two_columns = TableSchema {
            columns: vec![schema().columns[0].clone(), schema().columns[4].clone()],
        };
        conn.ensure_table("wide_batch", &two_columns).await.unwrap();

        // More rows than fit into one statement's bind parameters
        let rows: Vec<Row> = (0..20_000)
            .map(|i| vec![Some(i.to_string()), Some(format!("row_{}", i))])
            .collect();

        let inserted = conn
            .insert_batch("wide_batch", &two_columns, &rows)
            .await
            .unwrap();
        assert_eq!(inserted, 20_000);

        let count = conn
            .fetch_count("SELECT COUNT(*) FROM wide_batch")
            .await
            .unwrap();
        assert_eq!(count, 20_000);
    }

    #[tokio::test]
    async fn test_failed_batch_is_rolled_back() {
        let mut conn = Connection::sqlite_in_memory().await.unwrap();
        conn.execute("CREATE TABLE strict_items (id INTEGER NOT NULL)")
            .await
            .unwrap();

        let id_only = TableSchema {
            columns: vec![schema().columns[0].clone()],
        };
        let rows: Vec<Row> = vec![vec![Some("1".to_string())], vec![None]];

        let result = conn.insert_batch("strict_items", &id_only, &rows).await;
        assert!(result.is_err());

        let count = conn
            .fetch_count("SELECT COUNT(*) FROM strict_items")
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
