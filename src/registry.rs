//! Screen name registry
//!
//! Authoritative name → client mapping. Every operation is one critical
//! section on a single lock, which is what makes name uniqueness hold
//! under concurrent registrations.
//!
//! The lock is a `parking_lot::Mutex` and is never held across an
//! `.await`: callers get cloned `Client` handles and send outside the lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::Client;

/// Name → client mapping, cheap to clone and share between sessions
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Arc<Mutex<HashMap<String, Client>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `client` under its name if the name is free
    ///
    /// Returns false, leaving the registry untouched, if the name is taken.
    pub fn try_register(&self, client: Client) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(&client.name) {
            return false;
        }
        entries.insert(client.name.clone(), client);
        true
    }

    /// Remove `name`; a no-op if absent
    ///
    /// Only the session that registered a name calls this for it.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries.lock().remove(name).is_some()
    }

    /// Current client registered under `name`
    pub fn lookup(&self, name: &str) -> Option<Client> {
        self.entries.lock().get(name).cloned()
    }

    /// Check if `name` is currently registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if no names are registered
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().keys().cloned().collect();
        names.sort();
        names
    }
}
