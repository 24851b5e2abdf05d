//! Database connection management
//!
//! Pool creation (with TLS for managed hosts) and schema bootstrap.

pub mod queries;
mod store;

pub use store::PgProposalStore;

use crate::config::DatabaseConfig;
use crate::error::AppError;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

/// Build the pool and check it answers
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool, AppError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.pool = Some(deadpool_postgres::PoolConfig::new(config.max_pool_size));
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let use_tls = config.requires_tls();
    let pool = if use_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| AppError::Internal(format!("Failed to create TLS pool: {}", e)))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::Internal(format!("Failed to create pool: {}", e)))?
    };

    // Test connection
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    drop(client);

    info!(
        "✅ Database connection successful ({}:{}/{}, TLS: {})",
        config.host, config.port, config.database, use_tls
    );
    Ok(pool)
}

/// Create tables and indexes if they don't exist
pub async fn init_schema(pool: &Pool) -> Result<(), AppError> {
    let client = pool.get().await?;
    client.batch_execute(queries::CREATE_PROPOSALS_TABLE).await?;
    client.batch_execute(queries::CREATE_PROPOSALS_INDEXES).await?;
    info!("✅ Database tables initialized");
    Ok(())
}
