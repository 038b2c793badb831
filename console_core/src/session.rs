use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;

/// Login material presented by a remote operator. Built once per attempt
/// and discarded after verification.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub endpoint: SocketAddr,
    pub name: String,
    pub password: String,
}

const SECRET_BYTES: usize = 32;

/// Server-side record proving a connection authenticated successfully.
///
/// The secret is generated exactly once at creation and never regenerated.
/// Last-activity is monotonic non-decreasing even under concurrent touches.
#[derive(Debug)]
pub struct Session {
    name: String,
    endpoint: SocketAddr,
    created_ms: u64,
    last_activity_ms: AtomicU64,
    secret: String,
}

impl Session {
    fn new(credentials: &Credentials) -> Self {
        let now = unix_millis();
        Self {
            name: credentials.name.clone(),
            endpoint: credentials.endpoint,
            created_ms: now,
            last_activity_ms: AtomicU64::new(now),
            secret: generate_secret(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    pub fn created_ms(&self) -> u64 {
        self.created_ms
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    fn touch(&self) {
        self.last_activity_ms
            .fetch_max(unix_millis(), Ordering::Relaxed);
    }

    /// Public view sent back in the login reply. Never exposes mutable state.
    pub fn view(&self) -> SessionView {
        SessionView {
            name: self.name.clone(),
            ip: self.endpoint.to_string(),
            time: self.created_ms,
            secret: self.secret.clone(),
        }
    }
}

/// Serializable public projection of a [`Session`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub name: String,
    pub ip: String,
    pub time: u64,
    pub secret: String,
}

/// Tracks active sessions, keyed by (endpoint, operator name). Shared across
/// connection handler threads; all access goes through the inner mutex.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<(SocketAddr, String), Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh session for verified credentials. Callers must have
    /// run the credential verifier first; this never checks the password.
    pub fn create_session(&self, credentials: &Credentials) -> Arc<Session> {
        let session = Arc::new(Session::new(credentials));
        let mut guard = self.sessions.lock().expect("session map mutex poisoned");
        guard.insert(
            (session.endpoint(), session.name().to_string()),
            Arc::clone(&session),
        );
        session
    }

    /// Bumps the session's last-activity timestamp to now.
    pub fn touch(&self, session: &Session) {
        session.touch();
    }

    /// Drops the registry's record of a session. Called when the owning
    /// connection closes; session lifetime equals connection lifetime here.
    pub fn remove(&self, session: &Session) {
        let mut guard = self.sessions.lock().expect("session map mutex poisoned");
        guard.remove(&(session.endpoint(), session.name().to_string()));
    }

    pub fn active_count(&self) -> usize {
        self.sessions
            .lock()
            .expect("session map mutex poisoned")
            .len()
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut rendered = String::with_capacity(SECRET_BYTES * 2);
    for byte in bytes {
        rendered.push_str(&format!("{:02x}", byte));
    }
    rendered
}
