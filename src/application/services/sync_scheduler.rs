use crate::application::services::sync_engine::SyncEngine;
use crate::shared::config::SyncConfig;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Trigger sources for the sync engine: a connectivity edge (offline back to
/// online) and an optional periodic tick. Platform schedulers plug in by
/// feeding the watch channel or calling `trigger_sync` directly; their
/// unique-work semantics stay outside, the engine's single-flight guard
/// already makes redundant triggers safe.
pub struct SyncScheduler {
    tasks: Vec<JoinHandle<()>>,
}

impl SyncScheduler {
    pub fn spawn(
        engine: Arc<SyncEngine>,
        config: &SyncConfig,
        connectivity: watch::Receiver<bool>,
    ) -> Self {
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(Self::watch_connectivity(
            Arc::clone(&engine),
            connectivity,
        )));

        if config.auto_sync {
            tasks.push(tokio::spawn(Self::tick(engine, config.sync_interval())));
        }

        Self { tasks }
    }

    async fn watch_connectivity(engine: Arc<SyncEngine>, mut connectivity: watch::Receiver<bool>) {
        let mut was_online = *connectivity.borrow();
        while connectivity.changed().await.is_ok() {
            let online = *connectivity.borrow_and_update();
            if online && !was_online {
                tracing::debug!("connectivity restored, triggering sync");
                engine.trigger_sync();
            }
            was_online = online;
        }
    }

    async fn tick(engine: Arc<SyncEngine>, period: std::time::Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately; skip that so the first drain comes from
        // an explicit trigger or the first reconnect.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            engine.trigger_sync();
        }
    }

    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
