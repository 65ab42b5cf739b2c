//! Process-wide tenant → session registry.
//!
//! Bounded two ways: entries idle longer than `idle_ttl` are dropped, and when
//! the registry is full the least recently used entry makes room. Each session
//! sits behind its own async mutex, so tenants never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::conversation::ConversationSession;
use crate::core::clock::{add_ttl, Clock, SystemClock};
use crate::core::config::SessionSettings;

pub type SharedSession = Arc<tokio::sync::Mutex<ConversationSession>>;

struct RegistryEntry {
    session: SharedSession,
    last_used: DateTime<Utc>,
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, RegistryEntry>>,
    max_sessions: usize,
    idle_ttl: Duration,
    max_history: usize,
    clock: Arc<dyn Clock>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(&SessionSettings::default(), Arc::new(SystemClock))
    }
}

impl SessionRegistry {
    pub fn new(settings: &SessionSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: settings.max_sessions.max(1),
            idle_ttl: settings.idle_ttl(),
            max_history: settings.max_history,
            clock,
        }
    }

    /// Returns the tenant's session, creating it on first use.
    /// `thread_id` only applies when a new session is created.
    pub fn get_or_create(&self, tenant: &str, thread_id: Option<&str>) -> SharedSession {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(entry) = sessions.get_mut(tenant) {
            if add_ttl(entry.last_used, self.idle_ttl) > now {
                entry.last_used = now;
                return entry.session.clone();
            }
            sessions.remove(tenant);
        }

        Self::evict_idle_locked(&mut sessions, now, self.idle_ttl);
        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(tenant, _)| tenant.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::info!("Session registry full, evicted least recent tenant '{}'", oldest);
            }
        }

        let session = match thread_id {
            Some(thread_id) => ConversationSession::with_thread_id(thread_id, self.max_history),
            None => ConversationSession::new(self.max_history),
        };
        let session = Arc::new(tokio::sync::Mutex::new(session));
        sessions.insert(
            tenant.to_string(),
            RegistryEntry {
                session: session.clone(),
                last_used: now,
            },
        );
        session
    }

    /// Resets the tenant's session if it exists. Returns whether it did.
    pub async fn reset(&self, tenant: &str) -> bool {
        let session = {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.get(tenant).map(|entry| entry.session.clone())
        };
        match session {
            Some(session) => {
                session.lock().await.reset();
                true
            }
            None => false,
        }
    }

    /// Drops sessions idle for at least `idle_ttl`; returns how many.
    pub fn evict_idle(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        Self::evict_idle_locked(&mut sessions, now, self.idle_ttl)
    }

    pub fn contains(&self, tenant: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(tenant)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_idle_locked(
        sessions: &mut HashMap<String, RegistryEntry>,
        now: DateTime<Utc>,
        idle_ttl: Duration,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| add_ttl(entry.last_used, idle_ttl) > now);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!("Evicted {} idle sessions", evicted);
        }
        evicted
    }
}
