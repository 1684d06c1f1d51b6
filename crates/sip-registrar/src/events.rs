// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde::Serialize;
use sip_core::Network;

use crate::snapshot::RegistrationSnapshot;

/// Notifications published on the registrar's broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RegistrarEvent {
    /// First successful registration, or a re-authentication after the
    /// binding had passed half of its lease.
    Registered(RegistrationSnapshot),
    /// A binding that had been registered went away.
    Removed(RegistrationSnapshot),
    /// Credentials were presented and rejected.
    AuthFailed(Network),
}

impl RegistrarEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RegistrarEvent::Registered(_) => "registered",
            RegistrarEvent::Removed(_) => "removed",
            RegistrarEvent::AuthFailed(_) => "auth_failed",
        }
    }

    pub fn snapshot(&self) -> Option<&RegistrationSnapshot> {
        match self {
            RegistrarEvent::Registered(s) | RegistrarEvent::Removed(s) => Some(s),
            RegistrarEvent::AuthFailed(_) => None,
        }
    }
}
