// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use sip_core::RegisterRequest;
use smol_str::SmolStr;
use uuid::Uuid;

use crate::registration::Registration;

/// A registration behind its own lock, shared by the indexes and timers.
pub type SharedRegistration = Arc<Mutex<Registration>>;

/// Call-ID plus the source endpoint it arrived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub call_id: SmolStr,
    pub source_address: SmolStr,
    pub source_port: u16,
}

impl TransactionKey {
    pub fn new(call_id: impl Into<SmolStr>, source_address: impl Into<SmolStr>, source_port: u16) -> Self {
        Self {
            call_id: call_id.into(),
            source_address: source_address.into(),
            source_port,
        }
    }

    /// `None` when the request has no Call-ID.
    pub fn from_request(req: &dyn RegisterRequest) -> Option<Self> {
        Some(Self::new(req.call_id()?, req.source_address(), req.source_port()))
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.call_id, self.source_address, self.source_port)
    }
}

impl Serialize for TransactionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Index sizes, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub by_transaction: usize,
    pub by_realm: usize,
}

struct Entry {
    id: Uuid,
    handle: SharedRegistration,
}

type UserIndex = HashMap<SmolStr, HashMap<Uuid, SharedRegistration>>;

#[derive(Default)]
struct Indexes {
    by_transaction: HashMap<TransactionKey, Entry>,
    by_realm: HashMap<SmolStr, UserIndex>,
}

/// Both registration indexes behind one lock, so every mutation updates them
/// together.
///
/// Callers may hold a registration's lock while calling in here; the registry
/// never locks a registration itself.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<Indexes>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &TransactionKey) -> Option<SharedRegistration> {
        self.inner
            .lock()
            .by_transaction
            .get(key)
            .map(|entry| entry.handle.clone())
    }

    /// Returns the registration for `key`, creating it with `create` if there
    /// is none. The boolean tells whether it was created.
    pub(crate) fn get_or_insert_with<F>(&self, key: &TransactionKey, create: F) -> (SharedRegistration, bool)
    where
        F: FnOnce() -> (Uuid, SharedRegistration),
    {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.by_transaction.get(key) {
            return (entry.handle.clone(), false);
        }
        let (id, handle) = create();
        inner.by_transaction.insert(
            key.clone(),
            Entry {
                id,
                handle: handle.clone(),
            },
        );
        (handle, true)
    }

    /// Indexes `reg` by transaction key and, once it has an identity, by
    /// realm and username. Repeating a put is harmless.
    pub fn put(&self, handle: &SharedRegistration, reg: &Registration) {
        let mut inner = self.inner.lock();
        inner.by_transaction.insert(
            reg.key().clone(),
            Entry {
                id: reg.id(),
                handle: handle.clone(),
            },
        );
        if let Some(identity) = reg.identity() {
            inner
                .by_realm
                .entry(identity.realm.clone())
                .or_default()
                .entry(identity.username.clone())
                .or_default()
                .insert(reg.id(), handle.clone());
        }
    }

    /// Drops `reg` from both indexes, pruning empty user and realm buckets.
    /// A transaction entry that now belongs to another registration is left
    /// alone.
    pub fn remove(&self, reg: &Registration) -> bool {
        let mut inner = self.inner.lock();
        let mut removed = false;
        if inner
            .by_transaction
            .get(reg.key())
            .is_some_and(|entry| entry.id == reg.id())
        {
            inner.by_transaction.remove(reg.key());
            removed = true;
        }

        if let Some(identity) = reg.identity() {
            if let Some(users) = inner.by_realm.get_mut(&identity.realm) {
                if let Some(set) = users.get_mut(&identity.username) {
                    removed |= set.remove(&reg.id()).is_some();
                    if set.is_empty() {
                        users.remove(&identity.username);
                    }
                }
                if users.is_empty() {
                    inner.by_realm.remove(&identity.realm);
                }
            }
        }
        removed
    }

    pub fn realms(&self) -> Vec<SmolStr> {
        let mut realms: Vec<SmolStr> = self.inner.lock().by_realm.keys().cloned().collect();
        realms.sort();
        realms
    }

    /// Usernames with at least one registration at `realm`.
    pub fn usernames_at(&self, realm: &str) -> Vec<SmolStr> {
        let mut users: Vec<SmolStr> = self
            .inner
            .lock()
            .by_realm
            .get(realm)
            .map(|users| users.keys().cloned().collect())
            .unwrap_or_default();
        users.sort();
        users
    }

    pub fn users_at(&self, realm: &str) -> Vec<SharedRegistration> {
        self.inner
            .lock()
            .by_realm
            .get(realm)
            .map(|users| users.values().flat_map(|set| set.values().cloned()).collect())
            .unwrap_or_default()
    }

    pub fn registrations_for(&self, realm: &str, username: &str) -> Vec<SharedRegistration> {
        self.inner
            .lock()
            .by_realm
            .get(realm)
            .and_then(|users| users.get(username))
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Every registration, authenticated or not.
    pub fn all(&self) -> Vec<SharedRegistration> {
        self.inner
            .lock()
            .by_transaction
            .values()
            .map(|entry| entry.handle.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_transaction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.lock();
        RegistryStats {
            by_transaction: inner.by_transaction.len(),
            by_realm: inner.by_realm.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::tests::detached;
    use sip_auth::Identity;

    fn key(call_id: &str) -> TransactionKey {
        TransactionKey::new(call_id, "192.0.2.1", 5060)
    }

    #[test]
    fn key_renders_fully_qualified_call_id() {
        assert_eq!(key("abc").to_string(), "abc@192.0.2.1:5060");
        let json = serde_json::to_string(&key("abc")).expect("json");
        assert_eq!(json, "\"abc@192.0.2.1:5060\"");
    }

    #[test]
    fn realm_index_requires_identity() {
        let registry = Registry::new();
        let pending = detached(key("one"), None);
        registry.put(&pending, &pending.lock());
        assert_eq!(registry.len(), 1);
        assert!(registry.realms().is_empty());

        let active = detached(key("two"), Some(Identity::new("1000", "example.com")));
        registry.put(&active, &active.lock());
        registry.put(&active, &active.lock());
        assert_eq!(registry.realms(), vec![SmolStr::new("example.com")]);
        assert_eq!(registry.registrations_for("example.com", "1000").len(), 1);
        assert_eq!(
            registry.stats(),
            RegistryStats {
                by_transaction: 2,
                by_realm: 1
            }
        );
    }

    #[test]
    fn remove_prunes_empty_buckets() {
        let registry = Registry::new();
        let a = detached(key("a"), Some(Identity::new("1000", "example.com")));
        let b = detached(key("b"), Some(Identity::new("1000", "example.com")));
        registry.put(&a, &a.lock());
        registry.put(&b, &b.lock());
        assert_eq!(registry.users_at("example.com").len(), 2);

        assert!(registry.remove(&a.lock()));
        assert_eq!(registry.usernames_at("example.com"), vec![SmolStr::new("1000")]);
        assert!(registry.lookup(&key("a")).is_none());

        assert!(registry.remove(&b.lock()));
        assert!(!registry.remove(&b.lock()));
        assert!(registry.realms().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_leaves_newer_owner_of_key() {
        let registry = Registry::new();
        let old = detached(key("same"), None);
        let new = detached(key("same"), None);
        registry.put(&old, &old.lock());
        registry.put(&new, &new.lock());
        assert!(!registry.remove(&old.lock()));
        let current = registry.lookup(&key("same")).expect("current");
        assert!(Arc::ptr_eq(&current, &new));
    }

    #[test]
    fn get_or_insert_creates_once() {
        let registry = Registry::new();
        let (first, created) = registry.get_or_insert_with(&key("k"), || {
            let reg = detached(key("k"), None);
            let id = reg.lock().id();
            (id, reg)
        });
        assert_eq!(registry.len(), 1);
        assert!(created);
        let (second, created) =
            registry.get_or_insert_with(&key("k"), || unreachable!("already present"));
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
