use crate::{Archiver, ArchiverError, ArchiverEvent, ArchiverSource, SchedulerError};
use archiver_l1::L1View;
use archiver_store::ArchiverStore;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
};

/// The periodic sync task.
#[derive(Debug)]
struct SyncTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives the [`Archiver`] sync passes, once or periodically.
///
/// Passes never overlap: the periodic driver waits for a pass to complete before sleeping for
/// the polling interval.
#[derive(Debug)]
pub struct SyncScheduler<L1, S> {
    archiver: Arc<Mutex<Archiver<L1, S>>>,
    source: ArchiverSource<S>,
    events: broadcast::Sender<ArchiverEvent>,
    polling_interval: Duration,
    task: Option<SyncTask>,
}

impl<L1, S> SyncScheduler<L1, S>
where
    L1: L1View + 'static,
    S: ArchiverStore + Clone + 'static,
{
    /// Returns a new [`SyncScheduler`] driving the archiver.
    pub fn new(archiver: Archiver<L1, S>) -> Self {
        Self {
            source: archiver.source(),
            events: archiver.events.clone(),
            polling_interval: archiver.config.polling_interval,
            archiver: Arc::new(Mutex::new(archiver)),
            task: None,
        }
    }

    /// Returns the query surface of the driven archiver.
    pub const fn source(&self) -> &ArchiverSource<S> {
        &self.source
    }

    /// Returns a receiver for the archiver events.
    pub fn subscribe(&self) -> broadcast::Receiver<ArchiverEvent> {
        self.events.subscribe()
    }

    /// Returns true if the periodic driver is running.
    pub const fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Runs a single sync pass, waiting for any in-flight pass first.
    pub async fn sync_once(&self) -> Result<(), ArchiverError> {
        self.archiver.lock().await.sync(false).await
    }

    /// Starts the periodic driver. If `block_until_synced` is set, a first pass is retried every
    /// polling interval until it succeeds before the driver is armed.
    pub async fn start(&mut self, block_until_synced: bool) -> Result<(), SchedulerError> {
        if self.task.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        if block_until_synced {
            tracing::info!(target: "archiver::scheduler", "performing initial archiver sync");
            loop {
                let res = self.archiver.lock().await.sync(true).await;
                let Err(err) = res else { break };
                tracing::warn!(
                    target: "archiver::scheduler",
                    %err,
                    retry_in = ?self.polling_interval,
                    "initial archiver sync failed"
                );
                tokio::time::sleep(self.polling_interval).await;
            }
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let archiver = self.archiver.clone();
        let polling_interval = self.polling_interval;
        let handle = tokio::spawn(async move {
            loop {
                // failures are logged and counted by the archiver, the next pass retries.
                let _ = archiver.lock().await.sync(false).await;

                tokio::select! {
                    _ = tokio::time::sleep(polling_interval) => {}
                    _ = shutdown_rx.changed() => break,
                }
            }
            tracing::info!(target: "archiver::scheduler", "archiver sync stopped");
        });

        tracing::info!(target: "archiver::scheduler", ?polling_interval, "started archiver sync");
        self.task = Some(SyncTask { shutdown, handle });

        Ok(())
    }

    /// Stops the periodic driver, waiting for the in-flight pass to complete.
    pub async fn stop(&mut self) -> Result<(), SchedulerError> {
        let Some(SyncTask { shutdown, handle }) = self.task.take() else {
            return Ok(());
        };

        tracing::debug!(target: "archiver::scheduler", "stopping archiver sync");
        shutdown.send_replace(true);
        handle.await?;

        Ok(())
    }
}
