// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use smol_str::SmolStr;

/// Credential record for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub secret: SmolStr,
    pub display_name: Option<SmolStr>,
}

impl UserRecord {
    pub fn new(secret: impl Into<SmolStr>) -> Self {
        Self {
            secret: secret.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<SmolStr>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Looks up credentials for a user at a realm. Unknown users are an error.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn lookup(&self, username: &str, realm: &str) -> Result<UserRecord>;
}

/// In-memory user directory.
#[derive(Debug, Default)]
pub struct MemoryUserLookup {
    users: RwLock<HashMap<(SmolStr, SmolStr), UserRecord>>,
}

impl MemoryUserLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, username: &str, realm: &str, record: UserRecord) -> Self {
        self.add(username, realm, record);
        self
    }

    pub fn add(&self, username: &str, realm: &str, record: UserRecord) {
        self.users
            .write()
            .insert((SmolStr::new(username), SmolStr::new(realm)), record);
    }

    pub fn remove(&self, username: &str, realm: &str) -> Option<UserRecord> {
        self.users
            .write()
            .remove(&(SmolStr::new(username), SmolStr::new(realm)))
    }
}

#[async_trait]
impl UserLookup for MemoryUserLookup {
    async fn lookup(&self, username: &str, realm: &str) -> Result<UserRecord> {
        self.users
            .read()
            .get(&(SmolStr::new(username), SmolStr::new(realm)))
            .cloned()
            .ok_or_else(|| anyhow!("unknown user {}@{}", username, realm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_lookup_finds_added_users() {
        let users = MemoryUserLookup::new().with_user(
            "1000",
            "example.com",
            UserRecord::new("s3cret").with_display_name("Front Desk"),
        );
        let record = users.lookup("1000", "example.com").await.expect("record");
        assert_eq!(record.secret.as_str(), "s3cret");
        assert_eq!(record.display_name.as_deref(), Some("Front Desk"));

        assert!(users.lookup("1000", "other.example").await.is_err());
        users.remove("1000", "example.com");
        assert!(users.lookup("1000", "example.com").await.is_err());
    }
}
