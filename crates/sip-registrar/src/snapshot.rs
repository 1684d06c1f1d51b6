// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use chrono::{DateTime, Utc};
use serde::Serialize;
use sip_core::Network;
use smol_str::SmolStr;
use uuid::Uuid;

use crate::registry::TransactionKey;

/// Who a registration authenticated as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSummary {
    pub username: SmolStr,
    pub realm: SmolStr,
    pub display_name: Option<SmolStr>,
    /// `username@realm`
    pub uri: String,
}

/// Read-only view of a registration at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationSnapshot {
    pub id: Uuid,
    /// Set only on the snapshot carried by the first "registered" event.
    pub initial: bool,
    pub call_id: SmolStr,
    pub transaction_key: TransactionKey,
    pub aor: SmolStr,
    pub contacts: Vec<SmolStr>,
    /// Lease the registrar enforces, in seconds.
    pub expires: u64,
    pub auth: Option<AuthSummary>,
    pub registered_at: Option<DateTime<Utc>>,
    pub last_ping_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expires_in: u64,
    pub stale: bool,
    pub user_agent: SmolStr,
    pub allow: Vec<SmolStr>,
    pub network: Network,
}

/// One reachable contact and where its registration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactEntry {
    pub contact: SmolStr,
    pub network: Network,
}

/// Every non-stale contact of one user, gathered across registrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactSet {
    pub username: SmolStr,
    pub realm: SmolStr,
    pub display_name: Option<SmolStr>,
    pub uri: String,
    pub contacts: Vec<ContactEntry>,
}

impl ContactSet {
    pub(crate) fn collect(realm: &str, username: &str, snapshots: &[RegistrationSnapshot]) -> Self {
        let display_name = snapshots
            .iter()
            .find_map(|s| s.auth.as_ref().and_then(|a| a.display_name.clone()));
        let contacts = snapshots
            .iter()
            .filter(|s| !s.stale)
            .flat_map(|s| {
                s.contacts.iter().map(move |contact| ContactEntry {
                    contact: contact.clone(),
                    network: s.network.clone(),
                })
            })
            .collect();
        Self {
            username: SmolStr::new(username),
            realm: SmolStr::new(realm),
            display_name,
            uri: format!("{}@{}", username, realm),
            contacts,
        }
    }
}
