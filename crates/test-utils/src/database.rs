//! Database-backed fixture setup.

use tokio::sync::OnceCell;

use sql_edr::{ProviderResult, SqlxExecutor};

use crate::fixtures::{seed_sql, SCHEMA_SQL};

/// Environment variable naming the PostGIS database for integration tests.
pub const DATABASE_URL_ENV: &str = "EDR_TEST_DATABASE_URL";

static SEEDED: OnceCell<()> = OnceCell::const_new();

/// Connect to the test database, creating and seeding the airport fixture
/// once per test binary.
pub async fn connect_seeded(database_url: &str) -> ProviderResult<SqlxExecutor> {
    let executor = SqlxExecutor::connect_postgres_url(database_url).await?;

    SEEDED
        .get_or_try_init(|| async {
            for statement in SCHEMA_SQL.split(';') {
                let trimmed = statement.trim();
                if !trimmed.is_empty() {
                    executor.execute(trimmed).await?;
                }
            }
            for statement in seed_sql() {
                executor.execute(&statement).await?;
            }
            Ok::<_, sql_edr::ProviderError>(())
        })
        .await?;

    Ok(executor)
}
