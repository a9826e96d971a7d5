//! Session store: the bearer token and the current user.
//!
//! # Design
//! `SessionStore` is the single source of truth for "is the caller
//! authenticated" and "who is the caller". It is shared as
//! `Arc<SessionStore>` between the application and `ApiClient`, which reads
//! the token on every send. All state sits behind one mutex; the lock is
//! never held across a network call, so `load_profile` can run while other
//! requests read the token.
//!
//! Persistence is a side effect: storage failures are logged and the
//! in-memory state stays authoritative.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::profile::UserProfile;
use crate::storage::{MemoryStorage, SessionStorage, PROFILE_KEY, TOKEN_KEY};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No verified user. A token may still be present, pending a profile load.
    Anonymous,
    /// A profile load is in flight.
    Loading,
    /// A profile is cached for the current token.
    Authenticated,
}

/// Anything that can fetch the current user's profile.
///
/// Implemented by `ApiClient`; the seam keeps the store testable without a
/// backend.
pub trait ProfileSource {
    fn fetch_profile(&self) -> Result<UserProfile, ApiError>;
}

#[derive(Debug)]
struct Inner {
    token: Option<String>,
    user: Option<UserProfile>,
    state: SessionState,
    last_error: Option<String>,
}

pub struct SessionStore {
    inner: Mutex<Inner>,
    storage: Box<dyn SessionStorage>,
}

impl SessionStore {
    /// Open a session over `storage`, picking up a previously stored token.
    ///
    /// The profile cache starts empty even if a snapshot is stored; the
    /// snapshot stays readable through `persisted_profile`.
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        let token = match storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        };
        debug!(has_token = token.is_some(), "Session opened");
        Self {
            inner: Mutex::new(Inner {
                token,
                user: None,
                state: SessionState::Anonymous,
                last_error: None,
            }),
            storage: Box::new(storage),
        }
    }

    /// A session that is not persisted anywhere.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn has_token(&self) -> bool {
        self.lock().token.is_some()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.lock().user.clone()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Message of the last failed profile load, if any.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// The profile snapshot written at login or profile update.
    pub fn persisted_profile(&self) -> Option<UserProfile> {
        let raw = match self.storage.get(PROFILE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read stored profile");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .and_then(UserProfile::from_value)
            .map_err(|e| warn!(error = %e, "Stored profile is unreadable"))
            .ok()
    }

    /// Store fresh credentials after login or registration.
    pub fn establish(&self, token: &str, mut user: UserProfile) {
        user.refresh_derived();
        let mut inner = self.lock();
        self.persist(TOKEN_KEY, Some(token));
        self.persist_profile(&user);
        inner.token = Some(token.to_string());
        inner.user = Some(user);
        inner.state = SessionState::Authenticated;
        inner.last_error = None;
        info!("Session established");
    }

    /// Replace the cached and persisted profile. Ignored without a token.
    pub fn update_profile(&self, mut user: UserProfile) {
        user.refresh_derived();
        let mut inner = self.lock();
        if inner.token.is_none() {
            debug!("Profile update ignored: no active session");
            return;
        }
        self.persist_profile(&user);
        inner.user = Some(user);
        inner.state = SessionState::Authenticated;
    }

    /// Forget the token and profile, in memory and in storage.
    ///
    /// Calling it again is a no-op.
    pub fn clear(&self) {
        let mut inner = self.lock();
        self.clear_locked(&mut inner);
    }

    /// Clear the session in response to a 401 on a request sent with
    /// `sent_token`.
    ///
    /// Returns `true` only for the call that actually ended the session:
    /// later 401s for the same token, requests sent anonymously, and stale
    /// 401s for a token that has since been replaced all return `false`.
    pub fn expire(&self, sent_token: Option<&str>) -> bool {
        let mut inner = self.lock();
        match (inner.token.as_deref(), sent_token) {
            (Some(current), Some(sent)) if current == sent => {
                self.clear_locked(&mut inner);
                true
            }
            _ => false,
        }
    }

    /// Fetch the profile through `source` and cache it.
    ///
    /// On failure no profile is cached, the reason is kept in `last_error`,
    /// and the failure is returned as `ApiError::ProfileLoad`.
    ///
    /// The result is only cached for the token held when the fetch started.
    /// If the session ended meanwhile it stays anonymous. If another session
    /// was established, the fetched profile is dropped and that session is
    /// kept.
    pub fn load_profile(&self, source: &dyn ProfileSource) -> Result<UserProfile, ApiError> {
        let sent = {
            let mut inner = self.lock();
            inner.state = SessionState::Loading;
            inner.token.clone()
        };

        let result = source.fetch_profile();

        let mut inner = self.lock();
        if inner.token.is_none() || inner.token != sent {
            let message = "The session ended while the profile was loading".to_string();
            if inner.token.is_none() {
                inner.user = None;
                inner.state = SessionState::Anonymous;
                inner.last_error = Some(message.clone());
            } else {
                debug!("Discarding profile fetched for a previous session");
            }
            return Err(ApiError::ProfileLoad(message));
        }

        match result {
            Ok(mut profile) => {
                profile.refresh_derived();
                inner.user = Some(profile.clone());
                inner.state = SessionState::Authenticated;
                inner.last_error = None;
                debug!(user_id = ?profile.id, "Profile loaded");
                Ok(profile)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Profile load failed");
                inner.user = None;
                inner.state = SessionState::Anonymous;
                inner.last_error = Some(message.clone());
                Err(ApiError::ProfileLoad(message))
            }
        }
    }

    /// Whether a token is present, loading the profile first if a token
    /// exists but none is cached.
    ///
    /// A failed load does not fail this call: the answer is the token
    /// presence after the attempt (a 401 during the load clears it).
    pub fn ensure_authenticated(&self, source: &dyn ProfileSource) -> bool {
        let needs_profile = {
            let inner = self.lock();
            inner.token.is_some() && inner.user.is_none()
        };
        if needs_profile {
            if let Err(e) = self.load_profile(source) {
                debug!(error = %e, "Token present but profile could not be loaded");
            }
        }
        self.has_token()
    }

    fn clear_locked(&self, inner: &mut Inner) {
        let was_active = inner.token.is_some() || inner.user.is_some();
        inner.token = None;
        inner.user = None;
        inner.state = SessionState::Anonymous;
        self.persist(TOKEN_KEY, None);
        self.persist(PROFILE_KEY, None);
        if was_active {
            info!("Session cleared");
        }
    }

    fn persist_profile(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(json) => self.persist(PROFILE_KEY, Some(&json)),
            Err(e) => warn!(error = %e, "Failed to serialize profile"),
        }
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "Session storage write failed");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SessionStore")
            .field("has_token", &inner.token.is_some())
            .field("user_id", &inner.user.as_ref().and_then(|u| u.id))
            .field("state", &inner.state)
            .finish()
    }
}
