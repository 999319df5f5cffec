pub mod transaction;

pub use transaction::{deferred, run_atomic, PendingWrite};

use crate::config::DatabaseConfig;
use crate::error::AppResult;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.url.clone());
    options.max_connections(config.max_connections);
    let pool = Database::connect(options).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DatabaseConnection) -> AppResult<()> {
    Migrator::up(pool, None).await?;
    Ok(())
}

/// Clones a connection handle. sea-orm's `mock` feature removes the `Clone`
/// derive from `DatabaseConnection`, so under that feature the (cheap,
/// handle-only) clone is written out per variant; without it this is exactly
/// `Clone::clone`.
#[cfg(not(feature = "mock"))]
pub fn clone_conn(db: &DatabaseConnection) -> DatabaseConnection {
    db.clone()
}

#[cfg(feature = "mock")]
pub fn clone_conn(db: &DatabaseConnection) -> DatabaseConnection {
    match db {
        DatabaseConnection::SqlxPostgresPoolConnection(conn) => {
            DatabaseConnection::SqlxPostgresPoolConnection(conn.clone())
        }
        DatabaseConnection::MockDatabaseConnection(conn) => {
            DatabaseConnection::MockDatabaseConnection(std::sync::Arc::clone(conn))
        }
        DatabaseConnection::Disconnected => DatabaseConnection::Disconnected,
    }
}
