use std::sync::Arc;

use crm_api::CrmContext;
use storage::{HttpRecordBackend, RecordBackend, Storage};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::config::{prepare_database_url, Backend, Settings};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) crm: CrmContext,
}

impl AppState {
    pub(crate) fn new(backend: Arc<dyn RecordBackend>, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer);
        Self {
            crm: CrmContext::new(backend, events),
        }
    }
}

pub(crate) async fn open_backend(settings: &Settings) -> anyhow::Result<Arc<dyn RecordBackend>> {
    match settings.backend {
        Backend::Sqlite => {
            let database_url = prepare_database_url(&settings.database_url)?;
            let storage = Storage::new(&database_url).await.map_err(|error| {
                error!(
                    %database_url,
                    %error,
                    "failed to open SQLite database; verify parent directory exists and permissions are correct"
                );
                error
            })?;
            info!(%database_url, "using sqlite record store");
            Ok(Arc::new(storage))
        }
        Backend::Remote => {
            let remote = settings.remote()?;
            info!(base_url = %remote.base_url, project = %remote.project_id, "using hosted record store");
            Ok(Arc::new(HttpRecordBackend::new(remote)?))
        }
    }
}
