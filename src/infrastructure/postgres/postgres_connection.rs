use anyhow::{Context, Result};
use diesel::{
    Connection, PgConnection,
    connection::CacheSize,
    r2d2::{Builder, ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
};
use std::time::Duration;

/// How long a checkout waits for a free connection before the store call fails.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Keeps the pool usable behind pgbouncer in transaction mode.
#[derive(Debug, Default)]
struct DisablePreparedStatements;

impl CustomizeConnection<PgConnection, R2d2Error> for DisablePreparedStatements {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.set_prepared_statement_cache_size(CacheSize::Disabled);
        Ok(())
    }
}

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

pub fn pool_builder(connection_timeout: Duration) -> Builder<ConnectionManager<PgConnection>> {
    Pool::builder()
        .connection_timeout(connection_timeout)
        .connection_customizer(Box::new(DisablePreparedStatements))
}

pub fn establish_connection(database_url: &str) -> Result<PgPoolSquad> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    pool_builder(CONNECTION_TIMEOUT)
        .build(manager)
        .context("failed to build the postgres connection pool")
}
