use crate::application::ports::{AuthProvider, ProgressCache, RemoteGateway};
use crate::application::services::{ActionQueue, SyncEngine, SyncScheduler};
use crate::infrastructure::cache::MemoryProgressCache;
use crate::infrastructure::database::SqlitePendingActionStore;
use crate::infrastructure::media::FsMediaSource;
use crate::shared::config::AppConfig;
use std::sync::Arc;
use tokio::sync::watch;

/// Composition root for the sync core. The platform shells construct one of
/// these at startup, handing in their gateway and auth adapters; everything
/// else is wired here explicitly, with no global singletons.
pub struct AppState {
    pub queue: Arc<ActionQueue>,
    pub engine: Arc<SyncEngine>,
    pub progress: Arc<dyn ProgressCache>,
    scheduler: SyncScheduler,
}

impl AppState {
    pub async fn new(
        config: AppConfig,
        gateway: Arc<dyn RemoteGateway>,
        auth: Arc<dyn AuthProvider>,
        connectivity: watch::Receiver<bool>,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(
            SqlitePendingActionStore::open_or_recover(
                &config.database.resolve_path(),
                config.database.max_connections,
            )
            .await?,
        );
        let progress: Arc<dyn ProgressCache> = Arc::new(MemoryProgressCache::new());
        let media = Arc::new(FsMediaSource::new());

        let queue = Arc::new(ActionQueue::new(store.clone(), progress.clone()));
        let engine = Arc::new(SyncEngine::new(
            store,
            gateway,
            auth,
            media,
            config.sync.clone(),
        ));
        let scheduler = SyncScheduler::spawn(engine.clone(), &config.sync, connectivity);

        Ok(Self {
            queue,
            engine,
            progress,
            scheduler,
        })
    }

    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
    }
}
