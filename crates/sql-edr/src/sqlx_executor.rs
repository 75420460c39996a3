//! [`QueryExecutor`] over sqlx connection pools.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ColumnIndex, Decode, Type};
use tracing::{debug, info, instrument, warn};

use crate::dialect::Backend;
use crate::error::{ProviderError, ProviderResult};
use crate::executor::{QueryExecutor, Row, SqlValue, Statement};
use crate::mapping::ConnectionConfig;

const MAX_CONNECTIONS: u32 = 10;

/// Bind every statement parameter in order.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Text(v) => query.bind(v.as_str()),
                SqlValue::Float(v) => query.bind(*v),
                SqlValue::Integer(v) => query.bind(*v),
                SqlValue::Timestamp(v) => query.bind(*v),
            };
        }
        query
    }};
}

/// A pooled database connection for one backend.
#[derive(Debug, Clone)]
pub enum SqlxExecutor {
    Postgres(PgPool),
    MySql(MySqlPool),
}

impl SqlxExecutor {
    /// Open a pool for the backend using the provider's connection settings.
    pub async fn connect(backend: Backend, data: &ConnectionConfig) -> ProviderResult<Self> {
        let executor = match backend {
            Backend::Postgres => {
                let mut options = PgConnectOptions::new()
                    .host(&data.host)
                    .port(data.port.unwrap_or(5432))
                    .database(&data.dbname)
                    .username(&data.user);
                if let Some(password) = &data.password {
                    options = options.password(password);
                }
                if !data.search_path.is_empty() {
                    options = options.options([("search_path", data.search_path.join(","))]);
                }

                let pool = PgPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        ProviderError::QueryExecution(format!("Connection failed: {}", e))
                    })?;
                SqlxExecutor::Postgres(pool)
            }
            Backend::MySql => {
                let mut options = MySqlConnectOptions::new()
                    .host(&data.host)
                    .port(data.port.unwrap_or(3306))
                    .database(&data.dbname)
                    .username(&data.user);
                if let Some(password) = &data.password {
                    options = options.password(password);
                }
                if !data.search_path.is_empty() {
                    warn!("search_path is not supported on MySQL, ignoring");
                }

                let pool = MySqlPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        ProviderError::QueryExecution(format!("Connection failed: {}", e))
                    })?;
                SqlxExecutor::MySql(pool)
            }
        };

        info!(backend = %backend, host = %data.host, dbname = %data.dbname, "Connected to database");
        Ok(executor)
    }

    /// Open a Postgres pool from a connection URL.
    pub async fn connect_postgres_url(database_url: &str) -> ProviderResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| ProviderError::QueryExecution(format!("Connection failed: {}", e)))?;
        Ok(SqlxExecutor::Postgres(pool))
    }

    /// Run a statement that returns no rows, such as fixture setup.
    pub async fn execute(&self, sql: &str) -> ProviderResult<u64> {
        let result = match self {
            SqlxExecutor::Postgres(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            SqlxExecutor::MySql(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        };
        result.map_err(|e| ProviderError::QueryExecution(format!("Statement failed: {}", e)))
    }
}

#[async_trait]
impl QueryExecutor for SqlxExecutor {
    #[instrument(skip(self, statement), fields(params = statement.params.len()))]
    async fn fetch_all(&self, statement: &Statement) -> ProviderResult<Vec<Row>> {
        let rows = match self {
            SqlxExecutor::Postgres(pool) => {
                bind_params!(sqlx::query(&statement.sql), &statement.params)
                    .fetch(pool)
                    .map_ok(|row| decode_row(&row))
                    .try_collect::<Vec<_>>()
                    .await
            }
            SqlxExecutor::MySql(pool) => {
                bind_params!(sqlx::query(&statement.sql), &statement.params)
                    .fetch(pool)
                    .map_ok(|row| decode_row(&row))
                    .try_collect::<Vec<_>>()
                    .await
            }
        }
        .map_err(|e| ProviderError::QueryExecution(format!("Query failed: {}", e)))?;

        debug!(rows = rows.len(), "Fetched rows");
        Ok(rows)
    }
}

/// Decode every cell, trying the types the builder's projection produces.
fn decode_row<'r, R>(row: &'r R) -> Row
where
    R: sqlx::Row,
    usize: ColumnIndex<R>,
    Option<NaiveDateTime>: Decode<'r, R::Database> + Type<R::Database>,
    Option<f64>: Decode<'r, R::Database> + Type<R::Database>,
    Option<i64>: Decode<'r, R::Database> + Type<R::Database>,
    Option<i32>: Decode<'r, R::Database> + Type<R::Database>,
    Option<String>: Decode<'r, R::Database> + Type<R::Database>,
    Option<Vec<u8>>: Decode<'r, R::Database> + Type<R::Database>,
{
    use sqlx::Column as _;

    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            v.into()
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            v.into()
        } else if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            v.into()
        } else if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
            v.map(i64::from).into()
        } else if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(index) {
            v.into()
        } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
            v.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()).into()
        } else {
            debug!(column = column.name(), "Undecodable column, using null");
            SqlValue::Null
        };
        out.push(column.name(), value);
    }
    out
}
