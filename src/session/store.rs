//! Process-wide auth store.
//!
//! Owns the current [`Session`] and mirrors every transition into durable
//! storage. The store is the only writer of session state; the gateway reads
//! credentials from it and the interceptor asks it to invalidate.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::session::context::{AuthUser, Session, SessionState};
use crate::session::storage::{
    EXPIRES_KEY, SessionStorage, StorageError, TOKEN_KEY, USER_KEY,
};
use crate::types::BearerToken;

/// Credentials captured for one outbound request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: Option<BearerToken>,
    /// Session epoch at the time of capture.
    pub epoch: u64,
}

struct Inner {
    session: Option<Session>,
    epoch: u64,
}

/// Shared, cloneable handle to the session state machine.
///
/// `Anonymous -> Authenticated` on login; back to `Anonymous` on logout or
/// invalidation. Every transition bumps the epoch.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
    storage: Arc<dyn SessionStorage>,
    writes: Arc<Mutex<()>>,
}

impl SessionStore {
    /// Seed the store from durable storage.
    ///
    /// Unreadable entries are logged and treated as absent; a broken storage
    /// file yields an anonymous session rather than an error.
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let session = match Self::read_session(storage.as_ref()) {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to restore session, starting anonymous: {}", e);
                None
            }
        };

        if let Some(session) = &session {
            debug!("Restored session for {}", session.display());
        }

        Self {
            inner: Arc::new(RwLock::new(Inner { session, epoch: 0 })),
            storage,
            writes: Arc::new(Mutex::new(())),
        }
    }

    fn read_session(storage: &dyn SessionStorage) -> Result<Option<Session>, StorageError> {
        let Some(token) = storage.get(TOKEN_KEY)?.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let user = storage
            .get(USER_KEY)?
            .filter(|raw| raw != "undefined")
            .and_then(|raw| match serde_json::from_str::<AuthUser>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Ignoring unreadable stored user: {}", e);
                    None
                }
            });

        let expires_at = storage
            .get(EXPIRES_KEY)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Some(Session::new(BearerToken::new(token), user, expires_at)))
    }

    /// Record a successful login and persist it.
    ///
    /// The in-memory transition happens even when persisting fails; the
    /// storage error is returned so the caller can report it.
    pub async fn login(&self, session: Session) -> Result<(), StorageError> {
        let epoch = {
            let mut inner = self.inner.write().await;
            inner.session = Some(session.clone());
            inner.epoch += 1;
            inner.epoch
        };
        info!("Session started for {}", session.display());

        self.persist(epoch, Some(session)).await
    }

    /// Explicit logout. Always transitions to anonymous.
    pub async fn logout(&self) {
        let (epoch, had_session) = {
            let mut inner = self.inner.write().await;
            inner.epoch += 1;
            (inner.epoch, inner.session.take().is_some())
        };
        if had_session {
            info!("Session ended by logout");
        }
        if let Err(e) = self.persist(epoch, None).await {
            warn!("Failed to clear session storage: {}", e);
        }
    }

    /// Tear down the session if it is still the one observed at `epoch`.
    ///
    /// Returns `true` when this call performed the teardown. Later callers
    /// holding the same stale epoch get `false`, so concurrent
    /// unauthorized responses end a session exactly once.
    pub async fn invalidate(&self, epoch: u64) -> bool {
        let next = {
            let mut inner = self.inner.write().await;
            if inner.epoch != epoch {
                return false;
            }
            inner.epoch += 1;
            inner.session = None;
            inner.epoch
        };
        if let Err(e) = self.persist(next, None).await {
            warn!("Failed to clear session storage: {}", e);
        }
        true
    }

    /// Mirror the state reached at `epoch` into storage on the blocking pool.
    ///
    /// Writes are serialized and a write is dropped once a later transition
    /// has happened, so storage always ends at the latest in-memory state.
    async fn persist(&self, epoch: u64, session: Option<Session>) -> Result<(), StorageError> {
        let inner = self.inner.clone();
        let storage = self.storage.clone();
        let writes = self.writes.clone();

        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let _serialized = writes
                .lock()
                .map_err(|_| StorageError::Io("session write lock poisoned".to_string()))?;
            if inner.blocking_read().epoch != epoch {
                debug!("Skipping session write for superseded epoch {}", epoch);
                return Ok(());
            }
            match &session {
                Some(session) => write_session(storage.as_ref(), session),
                None => clear_session(storage.as_ref()),
            }
        })
        .await
        .map_err(|e| StorageError::Io(format!("session write task failed: {}", e)))?
    }

    /// Token and epoch, read atomically.
    pub async fn credentials(&self) -> Credentials {
        let inner = self.inner.read().await;
        Credentials {
            token: inner.session.as_ref().map(|s| s.token().clone()),
            epoch: inner.epoch,
        }
    }

    pub async fn state(&self) -> SessionState {
        match &self.inner.read().await.session {
            Some(session) => SessionState::Authenticated(session.clone()),
            None => SessionState::Anonymous,
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.inner.read().await.session.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.session.is_some()
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch
    }
}

fn write_session(storage: &dyn SessionStorage, session: &Session) -> Result<(), StorageError> {
    storage.set(TOKEN_KEY, session.token().as_str())?;
    match session.user() {
        Some(user) => {
            let raw =
                serde_json::to_string(user).map_err(|e| StorageError::Corrupt(e.to_string()))?;
            storage.set(USER_KEY, &raw)?;
        }
        None => storage.remove(USER_KEY)?,
    }
    match session.expires_at() {
        Some(exp) => storage.set(EXPIRES_KEY, &exp.to_rfc3339()),
        None => storage.remove(EXPIRES_KEY),
    }
}

/// Remove every key, attempting all of them even if one fails.
fn clear_session(storage: &dyn SessionStorage) -> Result<(), StorageError> {
    let mut first_err = None;
    for key in [TOKEN_KEY, USER_KEY, EXPIRES_KEY] {
        if let Err(e) = storage.remove(key) {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}
