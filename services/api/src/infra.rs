use connxt::config::StorageConfig;
use connxt::error::AppError;
use connxt::store::{InMemoryStore, SqliteStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store selected by `APP_DATABASE_PATH`.
pub(crate) enum Backend {
    Memory(Arc<InMemoryStore>),
    Sqlite(Arc<SqliteStore>),
}

pub(crate) fn open_backend(config: &StorageConfig) -> Result<Backend, AppError> {
    if config.is_in_memory() {
        info!("using in-memory job board store");
        return Ok(Backend::Memory(Arc::new(InMemoryStore::new())));
    }

    let store = SqliteStore::open(&config.database_path)?;
    info!(path = %config.database_path.display(), "opened sqlite job board store");
    Ok(Backend::Sqlite(Arc::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use connxt::config::IN_MEMORY_DATABASE;
    use std::path::PathBuf;

    #[test]
    fn memory_path_selects_the_in_memory_store() {
        let config = StorageConfig {
            database_path: PathBuf::from(IN_MEMORY_DATABASE),
            superuser: None,
        };
        assert!(matches!(
            open_backend(&config).expect("opens"),
            Backend::Memory(_)
        ));
    }
}
