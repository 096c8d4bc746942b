//! Pending login `state` values.
//!
//! Each enforced login records the server-generated state it sent to the
//! provider; the callback consumes it. A state can be consumed once and only
//! before it expires. The number of pending states is bounded.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Name of the short-lived cookie binding a pending state to the browser.
pub const STATE_COOKIE_NAME: &str = "shanraq_login_state";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("{0} logins are already pending")]
    Full(usize),
}

#[derive(Debug)]
pub struct StateStore {
    pending: DashMap<String, Instant>,
    ttl: Duration,
    capacity: usize,
}

impl StateStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Records a freshly generated state. When the store is full, expired
    /// entries are purged first; concurrent inserts may overshoot the
    /// capacity by at most the number of racing callers.
    pub fn record(&self, state: &str) -> Result<(), StateError> {
        if self.pending.len() >= self.capacity {
            self.purge_expired();
            if self.pending.len() >= self.capacity {
                return Err(StateError::Full(self.capacity));
            }
        }
        self.pending
            .insert(state.to_owned(), Instant::now() + self.ttl);
        Ok(())
    }

    /// Removes `state`, returning whether it was pending and unexpired.
    pub fn consume(&self, state: &str) -> bool {
        match self.pending.remove(state) {
            Some((_, expires_at)) => Instant::now() < expires_at,
            None => false,
        }
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.pending.len();
        self.pending.retain(|_, expires_at| now < *expires_at);
        before.saturating_sub(self.pending.len())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::random_token;

    #[test]
    fn recorded_state_is_single_use() {
        let store = StateStore::new(Duration::from_secs(60), 16);
        let state = random_token().unwrap();
        store.record(&state).unwrap();
        assert!(store.consume(&state));
        assert!(!store.consume(&state));
    }

    #[test]
    fn unknown_state_is_rejected() {
        let store = StateStore::new(Duration::from_secs(60), 16);
        assert!(!store.consume("never-issued"));
    }

    #[test]
    fn expired_state_is_rejected_and_purged() {
        let store = StateStore::new(Duration::from_millis(10), 16);
        store.record("a").unwrap();
        store.record("b").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert!(!store.consume("a"));
        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn full_store_rejects_new_states() {
        let store = StateStore::new(Duration::from_secs(60), 2);
        store.record("a").unwrap();
        store.record("b").unwrap();

        assert_eq!(store.record("c"), Err(StateError::Full(2)));
        assert_eq!(store.len(), 2);

        assert!(store.consume("a"));
        store.record("c").unwrap();
    }

    #[test]
    fn full_store_reclaims_expired_states() {
        let store = StateStore::new(Duration::from_millis(10), 1);
        store.record("stale").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        store.record("fresh").unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.consume("fresh"));
    }
}
