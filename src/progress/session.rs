//! Owner of the authoritative [`ProgressRecord`] for the logged-in identity.
//!
//! ## Session Lifecycle
//!
//! 1. **NoSession** - nobody is logged in; [`ProgressSession::current`] is `None`
//! 2. **Loading** - [`ProgressSession::begin_login`] created a default record;
//!    it is readable and writable while the remote profile is fetched
//! 3. **Ready** - the remote profile was merged (or the fetch failed and the
//!    local record stands)
//!
//! [`ProgressSession::logout`] drops the record and returns to NoSession. A new
//! login simply supersedes the previous record.
//!
//! Consumers that need the record before it is ready take a
//! [`ReadyListener`]. The listener is consumed by [`ReadyListener::wait`], so it
//! fires at most once.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::logutil::escape_log;
use crate::progress::errors::ProgressError;
use crate::progress::identity::LoadedIdentity;
use crate::progress::remote::RemoteProfileStore;
use crate::progress::types::{Identity, ProgressRecord};
use crate::validation::validate_identity_id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Loading(Identity),
    Ready(Identity),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::NoSession => None,
            SessionState::Loading(identity) | SessionState::Ready(identity) => Some(identity),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready(_))
    }
}

/// One-shot "initialization complete" notification.
pub struct ReadyListener {
    rx: watch::Receiver<SessionState>,
}

impl ReadyListener {
    /// Resolve with the identity of the first Ready state observed, immediately
    /// if the session is already Ready. `None` when the session is dropped first.
    pub async fn wait(mut self) -> Option<Identity> {
        match self.rx.wait_for(|state| state.is_ready()).await {
            Ok(state) => state.identity().cloned(),
            Err(_) => None,
        }
    }
}

pub struct ProgressSession {
    remote: Arc<dyn RemoteProfileStore>,
    state: watch::Sender<SessionState>,
    record: Mutex<Option<ProgressRecord>>,
}

impl ProgressSession {
    pub fn new(remote: Arc<dyn RemoteProfileStore>) -> Self {
        let (state, _) = watch::channel(SessionState::NoSession);
        Self {
            remote,
            state,
            record: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressRecord>> {
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot().is_some()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    pub fn ready_listener(&self) -> ReadyListener {
        ReadyListener {
            rx: self.state.subscribe(),
        }
    }

    /// Start a session for `identity` with a default record. The record is
    /// usable immediately; call [`load_remote`](Self::load_remote) to merge the
    /// stored profile.
    pub fn begin_login(&self, identity: Identity) -> Result<(), ProgressError> {
        let id = validate_identity_id(&identity.id)?;
        let identity = Identity::new(&id, identity.role);
        *self.slot() = Some(ProgressRecord::new(&id));
        self.state.send_replace(SessionState::Loading(identity.clone()));
        info!("Session loading for {} '{}'", identity.role, escape_log(&id));
        Ok(())
    }

    /// Fetch and merge the remote profile, then mark the session Ready.
    ///
    /// Remote failures are logged and the local record stays authoritative.
    /// Returns true when a remote record was merged. A logout or a different
    /// login while the fetch was in flight discards the result.
    pub async fn load_remote(&self) -> bool {
        let Some(identity) = self.identity() else {
            return false;
        };

        let merged = match self.remote.fetch(&identity.id).await {
            Ok(remote) => {
                let mut slot = self.slot();
                match slot.as_mut() {
                    Some(record) if record.student_id == identity.id => {
                        record.merge_remote(remote);
                        true
                    }
                    _ => return false,
                }
            }
            Err(e) => {
                warn!(
                    "Remote profile unavailable for '{}': {} (continuing with local progress)",
                    escape_log(&identity.id),
                    e
                );
                false
            }
        };

        if self.identity().as_ref() != Some(&identity) {
            return false;
        }
        self.state.send_replace(SessionState::Ready(identity.clone()));
        info!("Session ready for '{}'", escape_log(&identity.id));
        merged
    }

    pub async fn login(&self, identity: Identity) -> Result<(), ProgressError> {
        self.begin_login(identity)?;
        self.load_remote().await;
        Ok(())
    }

    pub fn logout(&self) {
        *self.slot() = None;
        let previous = self.state.send_replace(SessionState::NoSession);
        if let Some(identity) = previous.identity() {
            info!("Session closed for '{}'", escape_log(&identity.id));
        }
    }

    /// Snapshot of the current record; `None` when nobody is logged in.
    pub fn current(&self) -> Option<ProgressRecord> {
        self.slot().clone()
    }

    pub fn with_record<R>(&self, f: impl FnOnce(&ProgressRecord) -> R) -> Option<R> {
        self.slot().as_ref().map(f)
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut ProgressRecord) -> R) -> Option<R> {
        self.slot().as_mut().map(f)
    }

    /// Clamped to `[0, 3]`. Returns false when no record is loaded.
    pub fn set_hearts(&self, hearts: i64) -> bool {
        self.update(|record| record.set_hearts(hearts)).is_some()
    }

    /// Negative values become 0. Returns false when no record is loaded.
    pub fn set_score(&self, score: i64) -> bool {
        self.update(|record| record.set_score(score)).is_some()
    }

    pub fn hearts(&self) -> Option<u8> {
        self.with_record(|record| record.hearts)
    }

    pub fn score(&self) -> Option<u64> {
        self.with_record(|record| record.score)
    }

    /// Swap in a fresh default record for the same identity ("new game").
    pub fn reset(&self) -> bool {
        let mut slot = self.slot();
        match slot.as_mut() {
            Some(record) => {
                let mut fresh = ProgressRecord::new(&record.student_id);
                fresh.touch();
                fresh.hearts_updated = fresh.last_updated;
                *record = fresh;
                true
            }
            None => false,
        }
    }

    /// Write the whole record to the remote store.
    pub async fn flush_remote(&self) -> Result<(), ProgressError> {
        let snapshot = self
            .current()
            .ok_or_else(|| ProgressError::NotFound("no progress loaded".to_string()))?;
        self.remote.store(&snapshot).await
    }

    /// Fire-and-forget flush. Failures are logged; the local cache stays
    /// authoritative until the next successful sync.
    pub fn spawn_flush(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = session.flush_remote().await {
                warn!("Remote profile sync failed: {}", e);
            }
        })
    }
}

impl LoadedIdentity for ProgressSession {
    fn loaded_identity(&self) -> Option<Identity> {
        if !self.is_loaded() {
            return None;
        }
        self.identity()
    }
}
