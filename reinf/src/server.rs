use std::future::Future;

use tokio::net::TcpListener;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::prometheus::setup_metrics_recorder;
use crate::router;
use crate::stores::memory::MemoryStore;
use crate::stores::postgres::PgStore;

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let catalog = Catalog::from_path(&config.catalog_path)?;
    tracing::info!(
        service_types = catalog.service_types.len(),
        individual_income_natures = catalog.individual_income_natures.len(),
        organization_income_natures = catalog.organization_income_natures.len(),
        "loaded enumeration tables"
    );

    // Don't install metrics unless asked to
    let metrics = if config.export_prometheus {
        Some(setup_metrics_recorder()?)
    } else {
        None
    };

    let app = if config.memory_store {
        tracing::warn!("using the in-memory store, records will not survive a restart");
        router::router(MemoryStore::new(), catalog, metrics)
    } else {
        let store = PgStore::new(
            &config.database_url,
            config.max_pg_connections,
            config.pg_acquire_timeout.0,
        )?;
        router::router(store, catalog, metrics)
    };

    tracing::info!("listening on {:?}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
