//! Batch Accumulation Service
//!
//! Holds the single open batch and closes it when either the size limit or
//! the timeout is reached first. All mutations go through one async mutex, so
//! exactly one close path runs for any batch.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::batcher::batch::{Batch, BatchConfig, CloseFailure, CloseTrigger, SealedBatch};
use crate::crypto::{BatchMetadata, RootSigner};
use crate::error::{Result, SealError};
use crate::hash::{hash_from_slice, Hash};
use crate::merkle::MerkleTree;

#[derive(Default)]
struct BatchState {
    events: Vec<(i64, Hash)>,
    timer: Option<JoinHandle<()>>,
    /// Bumped every time a timer is armed; a timer only acts on its own epoch.
    epoch: u64,
}

struct Inner {
    config: BatchConfig,
    signer: Arc<dyn RootSigner>,
    state: Mutex<BatchState>,
    subscribers: std::sync::Mutex<Vec<mpsc::UnboundedSender<SealedBatch>>>,
    failure_subscribers: std::sync::Mutex<Vec<mpsc::UnboundedSender<CloseFailure>>>,
}

/// Accumulates event hashes into signed batches.
///
/// Cloning yields another handle to the same open batch.
#[derive(Clone)]
pub struct Batcher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Batcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batcher")
            .field("config", &self.inner.config)
            .field("backend", &self.inner.signer.backend())
            .finish()
    }
}

impl Batcher {
    pub fn new(config: BatchConfig, signer: Arc<dyn RootSigner>) -> Result<Self> {
        config.validate()?;
        info!(
            "Batcher configured: size_limit={}, timeout={:?}, backend={}",
            config.size_limit,
            config.timeout,
            signer.backend()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                signer,
                state: Mutex::new(BatchState::default()),
                subscribers: std::sync::Mutex::new(Vec::new()),
                failure_subscribers: std::sync::Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.inner.config
    }

    /// Receive every sealed batch, whichever path closed it.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SealedBatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.inner.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Receive every failed close attempt, whichever path made it.
    ///
    /// Timer-driven closes have no caller, so this is the only place their
    /// failures surface.
    pub fn subscribe_failures(&self) -> mpsc::UnboundedReceiver<CloseFailure> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.inner.failure_subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Append an event to the open batch.
    ///
    /// Arms the timeout whenever no timer is running, including after a failed
    /// close left events pending. When the batch reaches the size limit it is
    /// closed and signed before this call returns.
    pub async fn add_event(&self, event_id: i64, event_hash: &[u8]) -> Result<Option<SealedBatch>> {
        if event_id < 0 {
            return Err(SealError::InvalidInput(format!(
                "event id must be non-negative, got {}",
                event_id
            )));
        }
        let event_hash = hash_from_slice(event_hash, "event hash")?;

        let mut state = self.inner.state.lock().await;
        if state.timer.is_none() {
            self.inner.arm_timer(&mut state);
        }
        state.events.push((event_id, event_hash));
        debug!(
            "Added event {} to open batch ({}/{})",
            event_id,
            state.events.len(),
            self.inner.config.size_limit
        );

        if state.events.len() >= self.inner.config.size_limit {
            return self
                .inner
                .close_locked(&mut state, CloseTrigger::Size)
                .await
                .map(Some);
        }

        Ok(None)
    }

    /// Close the open batch now. Does nothing when no events are pending.
    pub async fn close_batch(&self) -> Result<Option<SealedBatch>> {
        let mut state = self.inner.state.lock().await;
        if state.events.is_empty() {
            return Ok(None);
        }
        self.inner
            .close_locked(&mut state, CloseTrigger::Manual)
            .await
            .map(Some)
    }

    /// Cancel the timer and seal whatever is pending.
    ///
    /// Safe to call repeatedly. On success no timer is armed and no batch is
    /// open when this returns.
    pub async fn shutdown(&self) -> Result<Option<SealedBatch>> {
        let mut state = self.inner.state.lock().await;
        Inner::cancel_timer(&mut state).await;

        if state.events.is_empty() {
            debug!("Batcher shutdown with no pending events");
            return Ok(None);
        }

        info!(
            "Batcher shutdown sealing {} pending events",
            state.events.len()
        );
        self.inner
            .close_locked(&mut state, CloseTrigger::Shutdown)
            .await
            .map(Some)
    }

    /// Number of events in the open batch.
    pub async fn current_size(&self) -> usize {
        self.inner.state.lock().await.events.len()
    }

    /// Event ids in the open batch, in insertion order.
    pub async fn pending_event_ids(&self) -> Vec<i64> {
        self.inner
            .state
            .lock()
            .await
            .events
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    pub async fn is_timer_armed(&self) -> bool {
        self.inner.state.lock().await.timer.is_some()
    }
}

impl Inner {
    fn arm_timer(self: &Arc<Self>, state: &mut BatchState) {
        state.epoch = state.epoch.wrapping_add(1);
        let epoch = state.epoch;
        let inner = Arc::clone(self);
        let timeout = self.config.timeout;

        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            inner.on_timeout(epoch).await;
        }));
        debug!("Armed batch timer (epoch {}, {:?})", epoch, timeout);
    }

    async fn on_timeout(&self, epoch: u64) {
        let mut state = self.state.lock().await;
        if state.epoch != epoch || state.timer.is_none() {
            debug!("Ignoring stale batch timer (epoch {})", epoch);
            return;
        }
        // This task is the timer; drop its own handle instead of aborting it.
        state.timer = None;
        if state.events.is_empty() {
            return;
        }

        // Failures are logged and published by close_locked.
        let _ = self.close_locked(&mut state, CloseTrigger::Timeout).await;
    }

    /// Abort the timer task and wait until it has actually stopped.
    async fn cancel_timer(state: &mut BatchState) {
        if let Some(handle) = state.timer.take() {
            handle.abort();
            // The task is either sleeping or queued on the state lock we hold.
            let _ = handle.await;
        }
    }

    /// Shared close logic for every trigger. The caller holds the state lock.
    ///
    /// On failure the pending events are left untouched for a later retry and
    /// the failure is published to failure subscribers.
    async fn close_locked(
        &self,
        state: &mut MutexGuard<'_, BatchState>,
        trigger: CloseTrigger,
    ) -> Result<SealedBatch> {
        if trigger != CloseTrigger::Timeout {
            Self::cancel_timer(state).await;
        }

        match self.seal(state, trigger) {
            Ok(sealed) => {
                state.events.clear();
                info!("{}", sealed.summary());
                self.publish(&sealed);
                Ok(sealed)
            }
            Err(e) => {
                let failure = CloseFailure {
                    trigger,
                    event_ids: state.events.iter().map(|(id, _)| *id).collect(),
                    error: e.clone(),
                };
                error!("{}", failure.summary());
                self.publish_failure(&failure);
                Err(e)
            }
        }
    }

    fn seal(&self, state: &BatchState, trigger: CloseTrigger) -> Result<SealedBatch> {
        let (event_ids, event_hashes): (Vec<i64>, Vec<Hash>) =
            state.events.iter().copied().unzip();

        let tree = MerkleTree::build(&event_hashes)?;
        let root = tree.root();

        let batch = Batch {
            id: Uuid::new_v4(),
            event_count: event_ids.len(),
            event_ids,
            event_hashes,
            root,
            created_at: Utc::now(),
        };

        let metadata = BatchMetadata::new(batch.id, batch.event_ids.clone());
        let signed_root = self.signer.sign_root(&root, &metadata)?;

        Ok(SealedBatch {
            batch,
            signed_root,
            trigger,
        })
    }

    fn publish(&self, sealed: &SealedBatch) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(sealed.clone()).is_ok());
        }
    }

    fn publish_failure(&self, failure: &CloseFailure) {
        if let Ok(mut subscribers) = self.failure_subscribers.lock() {
            subscribers.retain(|tx| tx.send(failure.clone()).is_ok());
        }
    }
}
