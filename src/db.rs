use crate::config::AppConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for the database connection pool
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database.
pub async fn establish_connection(config: &DbConfig) -> Result<DbPool, DbErr> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .sqlx_logging(false);

    let pool = Database::connect(opt).await?;
    info!(
        "Database connection pool established (max_connections={})",
        config.max_connections
    );

    Ok(pool)
}

/// Establish a DB pool using AppConfig tuning.
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection(&db_cfg).await
}

/// Apply any pending schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbErr> {
    info!("Running database migrations");
    crate::migrator::Migrator::up(pool, None).await
}
