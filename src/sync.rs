//! Reconciliation between the local ledger and its remote mirror.
//!
//! A login merges once: every non-empty local field overwrites the remote
//! one, the result is written back, and exactly that written document becomes
//! the new local state. The local apply is guarded by the ledger revision, so
//! writes that land while the remote round-trips are in flight are never
//! silently dropped; the merge starts over instead.

use crate::models::{EventKind, RemoteDocument};
use crate::remote::{RemoteError, RemoteStore};
use crate::state::AppState;
use crate::storage::StorageError;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const MAX_MERGE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub document: RemoteDocument,
    pub pushed: bool,
}

/// Whole-field, local-wins combination of the two copies.
pub fn reconcile(local: RemoteDocument, remote: RemoteDocument) -> Reconciled {
    let mut document = remote;
    let mut pushed = false;
    if !local.worship_history.is_empty() {
        document.worship_history = local.worship_history;
        pushed = true;
    }
    if !local.fasting_history.is_empty() {
        document.fasting_history = local.fasting_history;
        pushed = true;
    }
    Reconciled { document, pushed }
}

#[derive(Debug)]
pub enum SyncError {
    Remote(RemoteError),
    Storage(StorageError),
    Conflict,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Remote(err) => write!(f, "{err}"),
            SyncError::Storage(err) => write!(f, "{err}"),
            SyncError::Conflict => write!(
                f,
                "local ledger kept changing during merge; gave up after {MAX_MERGE_ATTEMPTS} attempts"
            ),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        SyncError::Remote(err)
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        SyncError::Storage(err)
    }
}

/// Merges the user's remote document into the shared ledger and returns the
/// document both sides now hold. On a remote failure the local ledger is left
/// untouched.
pub async fn merge_remote(
    state: &AppState,
    remote: &dyn RemoteStore,
    user_id: &str,
    today: NaiveDate,
) -> Result<RemoteDocument, SyncError> {
    for attempt in 1..=MAX_MERGE_ATTEMPTS {
        let (local, revision) = {
            let ledger = state.ledger.lock().await;
            (ledger.snapshot(), ledger.revision())
        };

        let fetched = remote.fetch(user_id).await?;
        let Reconciled { document, pushed } = reconcile(local, fetched);
        if pushed {
            remote.store(user_id, &document).await?;
        }

        let mut ledger = state.ledger.lock().await;
        if ledger.revision() != revision {
            debug!(user_id, attempt, "ledger changed during merge, retrying");
            continue;
        }
        ledger.apply_remote(today, document.clone());
        state.commit(&ledger, EventKind::Merged).await?;
        info!(
            user_id,
            pushed,
            days = document.worship_history.len(),
            fasted = document.fasting_history.len(),
            "merged remote ledger"
        );
        return Ok(document);
    }
    Err(SyncError::Conflict)
}

#[derive(Debug, Clone)]
pub struct PushJob {
    pub user_id: String,
    pub document: RemoteDocument,
}

/// Background writer for the remote mirror. Queued snapshots coalesce: only
/// the latest one pending when the writer wakes up is sent.
#[derive(Clone)]
pub struct Pusher {
    jobs: watch::Sender<Option<PushJob>>,
}

impl Pusher {
    pub fn spawn(remote: Arc<dyn RemoteStore>) -> Self {
        let (jobs, mut rx) = watch::channel(None::<PushJob>);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(job) = rx.borrow_and_update().clone() else {
                    continue;
                };
                match remote.store(&job.user_id, &job.document).await {
                    Ok(()) => debug!(user_id = %job.user_id, "pushed ledger"),
                    Err(err) => warn!(user_id = %job.user_id, "failed to push ledger: {err}"),
                }
            }
        });
        Self { jobs }
    }

    pub fn queue(&self, user_id: String, document: RemoteDocument) {
        self.jobs.send_replace(Some(PushJob { user_id, document }));
    }
}
