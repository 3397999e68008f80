//! Live migration between two stores.
//!
//! [`MoveStore`] wraps a source and a destination and is itself a [`Store`].
//! Calling [`MoveStore::move_all`] copies every source key into the
//! destination while reads and writes keep working:
//!
//! | Phase  | `get`       | `set`                    | `keys`      |
//! |--------|-------------|--------------------------|-------------|
//! | Before | source      | source                   | source      |
//! | Moving | source      | source, then destination | source      |
//! | After  | destination | destination              | destination |
//!
//! A `set` racing with the copy of the same key can be overwritten on the
//! destination by the value the copy loop read just before it. This happens
//! at most once per key, only while that key is being copied.

use crate::error::{Error, Result};
use crate::store::{KeyStream, SharedStore, Store};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, watch};
use tracing::{Instrument, debug, info, info_span, warn};

/// Observable migration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `move_all` has not been called; everything uses the source.
    Before,
    /// A copy pass is running, or the last one failed and awaits a retry.
    Moving,
    /// Every key has been copied; everything uses the destination.
    After,
}

/// Outcome broadcast to callers waiting on a copy pass.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PassStatus {
    Running,
    Finished,
    Failed(String),
}

enum State {
    Before,
    /// `pass` is the receiver of the most recent copy pass. Once its sender
    /// is gone no pass is running and the next `move_all` starts one.
    Moving {
        pass: Option<watch::Receiver<PassStatus>>,
    },
    After,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            Self::Before => Phase::Before,
            Self::Moving { .. } => Phase::Moving,
            Self::After => Phase::After,
        }
    }
}

/// A store that migrates its contents from `source` to `destination`.
///
/// # Thread Safety
///
/// The phase lives behind a `tokio::sync::RwLock`. `get` and `set` hold a
/// read guard across their backend I/O and phase transitions take the write
/// guard, so no write can straddle a transition. The copy loop itself runs
/// without holding the lock.
///
/// # Example
///
/// ```ignore
/// use kvshift::migrate::MoveStore;
/// use std::sync::Arc;
///
/// let mover = Arc::new(MoveStore::new(old_store, new_store));
/// // hand `mover` to consumers, then:
/// mover.move_all().await?;
/// ```
pub struct MoveStore {
    source: SharedStore,
    destination: SharedStore,
    state: RwLock<State>,
    /// Set when a dual-write reached the source but not the destination.
    /// The running pass then cannot finish.
    destination_behind: AtomicBool,
}

impl MoveStore {
    /// Wraps two already constructed stores.
    pub fn new(source: SharedStore, destination: SharedStore) -> Self {
        Self {
            source,
            destination,
            state: RwLock::new(State::Before),
            destination_behind: AtomicBool::new(false),
        }
    }

    /// Returns the current phase.
    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase()
    }

    /// Returns the store being migrated from.
    pub fn source(&self) -> &SharedStore {
        &self.source
    }

    /// Returns the store being migrated to.
    pub fn destination(&self) -> &SharedStore {
        &self.destination
    }

    /// Discards the wrapper, returning the destination store.
    ///
    /// Call after `move_all` has returned so consumers can switch to the
    /// destination directly.
    pub fn into_destination(self) -> SharedStore {
        self.destination
    }

    /// Copies every source key into the destination.
    ///
    /// - In `After`, returns `Ok(false)` without touching either store.
    /// - While another caller's copy pass is running, waits for it and
    ///   returns its outcome.
    /// - Otherwise enters `Moving`, copies all keys, enters `After` and
    ///   returns `Ok(true)`.
    ///
    /// # Errors
    ///
    /// If the copy fails the phase stays `Moving`, the caller running the
    /// pass gets the underlying error and every waiter gets
    /// [`Error::MigrationFailed`]. A later call restarts the copy from the
    /// beginning.
    ///
    /// A `set` during the pass that reached the source but failed on the
    /// destination also fails the pass with [`Error::MigrationFailed`], so
    /// the retry copies that key again.
    pub async fn move_all(&self) -> Result<bool> {
        let sender = {
            let mut state = self.state.write().await;
            if let State::Moving { pass: Some(rx) } = &*state
                && rx.has_changed().is_ok()
            {
                let rx = rx.clone();
                drop(state);
                return wait_for_pass(rx).await;
            }
            if matches!(*state, State::After) {
                return Ok(false);
            }
            let (tx, rx) = watch::channel(PassStatus::Running);
            *state = State::Moving { pass: Some(rx) };
            self.destination_behind.store(false, Ordering::SeqCst);
            tx
        };

        let guard = PassGuard {
            sender: Some(sender),
        };
        let span = info_span!("move_store.copy");
        let outcome = self.copy_pass().instrument(span).await;

        // In-flight writes hold read guards, so every dual-write of this
        // pass has settled once the write guard is held.
        let mut state = self.state.write().await;
        let outcome = match outcome {
            Ok(_) if self.destination_behind.load(Ordering::SeqCst) => Err(
                Error::migration_failed("destination missed a write during the copy pass"),
            ),
            other => other,
        };
        match outcome {
            Ok(copied) => {
                *state = State::After;
                drop(state);
                guard.complete(PassStatus::Finished);
                info!(copied, "migration finished");
                Ok(true)
            },
            Err(e) => {
                *state = State::Moving { pass: None };
                drop(state);
                warn!(error = %e, "migration pass failed; phase stays Moving");
                guard.complete(PassStatus::Failed(e.to_string()));
                Err(e)
            },
        }
    }

    /// One full pass over the source keys. Holds no lock.
    async fn copy_pass(&self) -> Result<usize> {
        info!("migration started");
        let mut keys = self.source.keys();
        let mut copied = 0usize;
        while let Some(key) = keys.try_next().await? {
            let value = self.source.get(&key).await?;
            self.destination.set(&key, &value).await?;
            copied += 1;
            debug!(key = %key, copied, "key copied");
        }
        Ok(copied)
    }
}

/// Waits for a running pass to finish and maps its outcome.
async fn wait_for_pass(mut rx: watch::Receiver<PassStatus>) -> Result<bool> {
    let status = rx
        .wait_for(|status| *status != PassStatus::Running)
        .await
        .map(|status| status.clone());
    match status {
        Ok(PassStatus::Finished) => Ok(true),
        Ok(PassStatus::Failed(reason)) => Err(Error::migration_failed(reason)),
        Ok(PassStatus::Running) | Err(_) => Err(Error::migration_failed("copy pass interrupted")),
    }
}

/// Releases waiters even if the future running a pass is dropped.
struct PassGuard {
    sender: Option<watch::Sender<PassStatus>>,
}

impl PassGuard {
    fn complete(mut self, status: PassStatus) {
        if let Some(sender) = self.sender.take() {
            sender.send_replace(status);
        }
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            warn!("migration pass dropped before completion");
            sender.send_replace(PassStatus::Failed("copy pass interrupted".to_string()));
        }
    }
}

#[async_trait]
impl Store for MoveStore {
    async fn get(&self, key: &str) -> Result<String> {
        let state = self.state.read().await;
        match *state {
            State::After => self.destination.get(key).await,
            State::Before | State::Moving { .. } => self.source.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let state = self.state.read().await;
        match *state {
            State::Before => self.source.set(key, value).await,
            State::Moving { .. } => {
                self.source.set(key, value).await?;
                if let Err(e) = self.destination.set(key, value).await {
                    self.destination_behind.store(true, Ordering::SeqCst);
                    warn!(key, error = %e, "destination write failed during migration");
                    return Err(e);
                }
                Ok(())
            },
            State::After => self.destination.set(key, value).await,
        }
    }

    fn keys(&self) -> KeyStream<'_> {
        stream::once(async move {
            match self.phase().await {
                Phase::After => self.destination.keys(),
                Phase::Before | Phase::Moving => self.source.keys(),
            }
        })
        .flatten()
        .boxed()
    }
}
