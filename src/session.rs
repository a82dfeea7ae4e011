//! Per-visitor session state with two-generation flash values.
//!
//! A flashed value survives exactly one request boundary:
//!
//! ```text
//! request N     session.flash("message", "Saved")   visible (flash)
//! request N+1   start() demotes flash → deprecated  visible (deprecated)
//!               finish() drops deprecated
//! request N+2                                        gone
//! ```
//!
//! One [`Session`] exists per in-flight request. The [`Kernel`](crate::Kernel)
//! loads it from the [`SessionStore`] before routing and saves it after the
//! handler returns; handlers only ever see it through
//! [`Request::session`](crate::Request::session).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "verdict_session";

/// The persisted part of a session.
#[derive(Clone, Debug, Default)]
pub struct SessionData {
    values: HashMap<String, Value>,
    flash: HashMap<String, Value>,
    deprecated: HashMap<String, Value>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.flash.is_empty() && self.deprecated.is_empty()
    }
}

/// A request-scoped handle on one visitor's session.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Clone, Debug)]
pub struct Session {
    id: String,
    data: Arc<Mutex<SessionData>>,
}

impl Session {
    /// Starts a request with `data`, demoting last request's flash values.
    pub fn start(id: impl Into<String>, mut data: SessionData) -> Self {
        let flashed = std::mem::take(&mut data.flash);
        data.deprecated.extend(flashed);
        Self { id: id.into(), data: Arc::new(Mutex::new(data)) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Looks `key` up in the permanent values, then flash, then deprecated.
    pub fn get(&self, key: &str) -> Option<Value> {
        let data = self.data.lock();
        data.values.get(key)
            .or_else(|| data.flash.get(key))
            .or_else(|| data.deprecated.get(key))
            .cloned()
    }

    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.data.lock().values.insert(key.to_owned(), value.into());
    }

    /// Stores a value readable until the end of the next request.
    pub fn flash(&self, key: &str, value: impl Into<Value>) {
        self.data.lock().flash.insert(key.to_owned(), value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        let data = self.data.lock();
        data.values.contains_key(key) || data.flash.contains_key(key) || data.deprecated.contains_key(key)
    }

    pub fn forget(&self, key: &str) {
        let mut data = self.data.lock();
        data.values.remove(key);
        data.flash.remove(key);
        data.deprecated.remove(key);
    }

    /// Ends the request: deprecated values are purged, the rest is returned
    /// for persisting.
    pub fn finish(&self) -> SessionData {
        let mut data = self.data.lock().clone();
        data.deprecated.clear();
        data
    }
}

/// Process-local session storage keyed by cookie id.
///
/// Sessions live as long as the process. Two concurrent requests from the
/// same visitor race; the last one to finish wins.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionData>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for `id`, or a fresh one if `id` is unknown.
    ///
    /// Returns `true` alongside the session when a new id was issued.
    pub fn load(&self, id: Option<&str>) -> (Session, bool) {
        let existing = id.and_then(|id| {
            self.sessions.lock().get(id).cloned().map(|data| (id.to_owned(), data))
        });
        match existing {
            Some((id, data)) => (Session::start(id, data), false),
            None => (Session::start(Uuid::new_v4().to_string(), SessionData::default()), true),
        }
    }

    /// Persists `session` and reports whether anything was stored. Empty
    /// sessions are dropped rather than stored.
    pub fn save(&self, session: &Session) -> bool {
        let data = session.finish();
        let mut sessions = self.sessions.lock();
        if data.is_empty() {
            sessions.remove(session.id());
            false
        } else {
            sessions.insert(session.id().to_owned(), data);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// Extracts the session id from a `cookie` header value.
pub(crate) fn session_id(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flash_values_live_for_two_requests() {
        let store = SessionStore::new();

        let (first, issued) = store.load(None);
        assert!(issued);
        first.flash("message", "Saved");
        assert_eq!(first.get("message"), Some(json!("Saved")));
        store.save(&first);

        let (second, issued) = store.load(Some(first.id()));
        assert!(!issued);
        assert!(second.has("message"));
        store.save(&second);

        let (third, _) = store.load(Some(first.id()));
        assert!(!third.has("message"));
        assert_eq!(third.get_or("message", "none"), json!("none"));
    }

    #[test]
    fn permanent_values_persist() {
        let store = SessionStore::new();
        let (session, _) = store.load(None);
        session.set("name", "ada");
        store.save(&session);

        for _ in 0..3 {
            let (again, _) = store.load(Some(session.id()));
            assert_eq!(again.get("name"), Some(json!("ada")));
            store.save(&again);
        }
    }

    #[test]
    fn values_shadow_flash_and_forget_clears_all() {
        let (session, _) = SessionStore::new().load(None);
        session.flash("key", 1);
        session.set("key", 2);
        assert_eq!(session.get("key"), Some(json!(2)));

        session.forget("key");
        assert!(!session.has("key"));
    }

    #[test]
    fn empty_sessions_are_not_stored() {
        let store = SessionStore::new();
        let (session, _) = store.load(None);
        assert!(!store.save(&session));
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_ids_get_a_fresh_session() {
        let (session, issued) = SessionStore::new().load(Some("forged"));
        assert!(issued);
        assert_ne!(session.id(), "forged");
    }

    #[test]
    fn reads_the_session_cookie() {
        assert_eq!(session_id("a=1; verdict_session=abc; b=2"), Some("abc"));
        assert_eq!(session_id("a=1"), None);
    }
}
