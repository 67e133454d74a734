use crate::ledger::Ledger;
use crate::models::{EventKind, LedgerEvent, RemoteDocument};
use crate::prayer::PrayerService;
use crate::remote::RemoteStore;
use crate::storage::{StorageError, persist_data};
use crate::sync::Pusher;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub synced: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub ledger: Arc<Mutex<Ledger>>,
    pub prayer: Arc<PrayerService>,
    pub remote: Option<Arc<dyn RemoteStore>>,
    session: Arc<Mutex<Option<Session>>>,
    events: broadcast::Sender<LedgerEvent>,
    pusher: Option<Pusher>,
}

impl AppState {
    /// Must be called inside a tokio runtime when `remote` is set: the
    /// background pusher is spawned here.
    pub fn new(
        data_path: PathBuf,
        ledger: Ledger,
        prayer: PrayerService,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let pusher = remote.clone().map(Pusher::spawn);
        Self {
            data_path,
            ledger: Arc::new(Mutex::new(ledger)),
            prayer: Arc::new(prayer),
            remote,
            session: Arc::new(Mutex::new(None)),
            events,
            pusher,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    pub async fn set_session(&self, session: Option<Session>) {
        *self.session.lock().await = session;
    }

    /// Activates `session` after a merge that left both sides holding
    /// `merged`. Writes committed between the merge and this call were not
    /// queued, so the current snapshot is pushed if it has moved on.
    pub async fn begin_session(&self, session: Session, merged: Option<&RemoteDocument>) {
        let user_id = session.user_id.clone();
        self.set_session(Some(session)).await;

        let (Some(pusher), Some(merged)) = (&self.pusher, merged) else {
            return;
        };
        let ledger = self.ledger.lock().await;
        let snapshot = ledger.snapshot();
        if &snapshot != merged {
            debug!(user_id = %user_id, "ledger moved on after merge, queueing push");
            pusher.queue(user_id, snapshot);
        }
    }

    /// Flushes the store to disk, notifies subscribers, and queues a push to
    /// the remote mirror while a session is active.
    pub async fn commit(&self, ledger: &Ledger, kind: EventKind) -> Result<(), StorageError> {
        persist_data(&self.data_path, ledger.store()).await?;

        let event = LedgerEvent {
            revision: ledger.revision(),
            kind,
        };
        debug!(?event, "ledger committed");
        // No subscribers is not an error.
        let _ = self.events.send(event);

        if matches!(kind, EventKind::Merged | EventKind::Bookmark) {
            return Ok(());
        }
        if let (Some(pusher), Some(session)) = (&self.pusher, self.session().await) {
            pusher.queue(session.user_id, ledger.snapshot());
        }
        Ok(())
    }
}
