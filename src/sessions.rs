use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info};
use uuid::Uuid;

pub type Shared<S> = Arc<tokio::sync::Mutex<S>>;

struct SessionEntry<S> {
    session: Shared<S>,
    last_accessed: Instant,
}

impl<S> SessionEntry<S> {
    fn is_expired(&self, idle_timeout: Duration, now: Instant) -> bool {
        !idle_timeout.is_zero() && now.saturating_duration_since(self.last_accessed) >= idle_timeout
    }
}

/// In-memory chat sessions keyed by server-issued ids.
///
/// Sessions idle for longer than `idle_timeout` are dropped, and the map never
/// holds more than `max_sessions` entries: inserting into a full map evicts
/// the least recently used one. A zero timeout disables idle expiry.
pub struct SessionRegistry<S> {
    entries: Mutex<HashMap<Uuid, SessionEntry<S>>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl<S> SessionRegistry<S> {
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Shared<S>>, String> {
        self.get_at(id, Instant::now())
    }

    pub fn insert(&self, session: S) -> Result<(Uuid, Shared<S>), String> {
        self.insert_at(session, Instant::now())
    }

    pub fn remove(&self, id: Uuid) -> Result<bool, String> {
        let mut entries = self.entries.lock().map_err(|e| e.to_string())?;
        Ok(entries.remove(&id).is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    fn get_at(&self, id: Uuid, now: Instant) -> Result<Option<Shared<S>>, String> {
        let mut entries = self.entries.lock().map_err(|e| e.to_string())?;
        match entries.get_mut(&id) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(self.idle_timeout, now) => {
                entry.last_accessed = now;
                return Ok(Some(entry.session.clone()));
            }
            Some(_) => {}
        }
        entries.remove(&id);
        debug!("Session {} expired", id);
        Ok(None)
    }

    fn insert_at(&self, session: S, now: Instant) -> Result<(Uuid, Shared<S>), String> {
        let mut entries = self.entries.lock().map_err(|e| e.to_string())?;

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.idle_timeout, now));

        while entries.len() >= self.max_sessions {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    entries.remove(&id);
                }
                None => break,
            }
        }

        let evicted = before - entries.len();
        if evicted > 0 {
            info!("Evicted {} sessions from memory", evicted);
        }

        let id = Uuid::new_v4();
        let session = Arc::new(tokio::sync::Mutex::new(session));
        entries.insert(
            id,
            SessionEntry {
                session: session.clone(),
                last_accessed: now,
            },
        );
        Ok((id, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_issued_by_the_registry() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let (id, _) = registry.insert("a").unwrap();

        assert!(registry.get(id).unwrap().is_some());
        assert!(registry.get(Uuid::new_v4()).unwrap().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn idle_sessions_expire() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let start = Instant::now();
        let (stale, _) = registry.insert_at("stale", start).unwrap();
        let (fresh, _) = registry.insert_at("fresh", start + Duration::from_secs(30)).unwrap();

        let later = start + Duration::from_secs(75);
        assert!(registry.get_at(stale, later).unwrap().is_none());
        assert!(registry.get_at(fresh, later).unwrap().is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn access_keeps_a_session_alive() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let start = Instant::now();
        let (id, _) = registry.insert_at("a", start).unwrap();

        assert!(registry.get_at(id, start + Duration::from_secs(50)).unwrap().is_some());
        assert!(registry.get_at(id, start + Duration::from_secs(100)).unwrap().is_some());
    }

    #[test]
    fn expired_sessions_are_dropped_on_insert() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let start = Instant::now();
        registry.insert_at("a", start).unwrap();
        registry.insert_at("b", start).unwrap();

        registry.insert_at("c", start + Duration::from_secs(61)).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn full_registry_evicts_least_recently_used() {
        let registry = SessionRegistry::new(Duration::ZERO, 2);
        let start = Instant::now();
        let (a, _) = registry.insert_at("a", start).unwrap();
        let (b, _) = registry.insert_at("b", start + Duration::from_secs(1)).unwrap();
        registry.get_at(a, start + Duration::from_secs(2)).unwrap();

        let (c, _) = registry.insert_at("c", start + Duration::from_secs(3)).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get(b).unwrap().is_none());
        assert!(registry.get(a).unwrap().is_some());
        assert!(registry.get(c).unwrap().is_some());
    }

    #[test]
    fn removed_sessions_are_gone() {
        let registry = SessionRegistry::new(Duration::ZERO, 2);
        let (id, _) = registry.insert("a").unwrap();
        assert!(registry.remove(id).unwrap());
        assert!(!registry.remove(id).unwrap());
        assert!(registry.get(id).unwrap().is_none());
    }
}
