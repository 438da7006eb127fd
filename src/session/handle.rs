//! Per-request session handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::session::store::SessionData;

#[derive(Debug)]
struct SessionState {
    data: SessionData,
    modified: bool,
    destroyed: bool,
}

/// Session attached to the current request.
///
/// Cheap to clone; all clones share the same state. Changes are written
/// back to the store once the response has been produced.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    is_new: bool,
    state: Arc<Mutex<SessionState>>,
}

/// What the session layer needs to persist after the handler ran.
#[derive(Debug)]
pub(crate) struct SessionSnapshot {
    pub data: SessionData,
    pub modified: bool,
    pub destroyed: bool,
}

impl Session {
    pub(crate) fn fresh() -> Self {
        Self::with_state(Uuid::new_v4(), true, SessionData::new())
    }

    pub(crate) fn existing(id: Uuid, data: SessionData) -> Self {
        Self::with_state(id, false, data)
    }

    fn with_state(id: Uuid, is_new: bool, data: SessionData) -> Self {
        Self {
            id,
            is_new,
            state: Arc::new(Mutex::new(SessionState {
                data,
                modified: false,
                destroyed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True when no stored session matched the request cookie.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let state = self.lock();
        let value = state.data.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        let mut state = self.lock();
        state.data.insert(key.to_string(), value);
        state.modified = true;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.lock();
        let removed = state.data.remove(key);
        if removed.is_some() {
            state.modified = true;
        }
        removed
    }

    /// Drop the session from the store at the end of the request.
    pub fn destroy(&self) {
        let mut state = self.lock();
        state.data.clear();
        state.destroyed = true;
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            data: state.data.clone(),
            modified: state.modified,
            destroyed: state.destroyed,
        }
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiError::internal("session layer is not installed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_marks_modified() {
        let session = Session::fresh();
        assert!(session.is_new());
        assert!(!session.snapshot().modified);

        session.insert("user_id", 42).unwrap();
        assert_eq!(session.get::<u32>("user_id"), Some(42));
        assert!(session.snapshot().modified);
    }

    #[test]
    fn test_remove_missing_key_is_not_a_modification() {
        let session = Session::existing(Uuid::new_v4(), SessionData::new());
        assert_eq!(session.remove("nothing"), None);
        assert!(!session.snapshot().modified);
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::fresh();
        let other = session.clone();
        other.insert("token", "abc").unwrap();
        assert_eq!(session.get::<String>("token").as_deref(), Some("abc"));
    }

    #[test]
    fn test_destroy() {
        let session = Session::fresh();
        session.insert("token", "abc").unwrap();
        session.destroy();

        let snapshot = session.snapshot();
        assert!(snapshot.destroyed);
        assert!(snapshot.data.is_empty());
    }
}
