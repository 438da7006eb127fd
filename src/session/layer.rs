//! Session middleware.
//!
//! Resolves the signed session cookie, attaches a [`Session`] to the request
//! and, once the handler has answered, persists it:
//!
//! - modified sessions are saved and the cookie is (re)issued
//! - unmodified existing sessions only have their expiry extended
//! - untouched new sessions are neither stored nor sent to the client
//! - destroyed sessions are removed from the store

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use cookie::Cookie;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::session::handle::Session;
use crate::session::signing::CookieSigner;
use crate::session::store::SessionStore;

/// Shared state of the session middleware.
#[derive(Clone, Debug)]
pub struct SessionManager {
    store: SessionStore,
    signer: CookieSigner,
    cookie_name: String,
}

impl SessionManager {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            store: SessionStore::new(Duration::from_secs(config.max_age_secs)),
            signer: CookieSigner::new(&config.secret),
            cookie_name: config.cookie_name.clone(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Session id carried by a validly signed request cookie.
    fn cookie_session_id(&self, headers: &HeaderMap) -> Option<Uuid> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.cookie_name)
            .and_then(|cookie| self.signer.verify(cookie.value()))
    }

    fn resolve(&self, headers: &HeaderMap) -> Session {
        let Some(id) = self.cookie_session_id(headers) else {
            return Session::fresh();
        };

        match self.store.load(&id) {
            Some(data) => Session::existing(id, data),
            None => Session::fresh(),
        }
    }

    fn set_cookie(&self, id: &Uuid) -> Option<HeaderValue> {
        let max_age = i64::try_from(self.store.max_age().as_secs()).unwrap_or(i64::MAX);
        let cookie = Cookie::build((self.cookie_name.clone(), self.signer.sign(id)))
            .path("/")
            .http_only(true)
            .max_age(cookie::time::Duration::seconds(max_age))
            .build();

        HeaderValue::from_str(&cookie.to_string()).ok()
    }

    fn commit(&self, session: &Session, response: &mut Response) {
        let snapshot = session.snapshot();
        let id = session.id();

        if snapshot.destroyed {
            self.store.destroy(&id);
            tracing::debug!(session_id = %id, "Session destroyed");
            return;
        }

        if snapshot.modified {
            self.store.save(id, snapshot.data);
            if let Some(value) = self.set_cookie(&id) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            tracing::debug!(session_id = %id, new = session.is_new(), "Session saved");
        } else if !session.is_new() {
            self.store.touch(&id);
        }
    }
}

pub async fn attach_session(
    State(manager): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = manager.resolve(request.headers());
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;
    manager.commit(&session, &mut response);
    response
}
