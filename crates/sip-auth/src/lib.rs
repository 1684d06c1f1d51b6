// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SIP Digest authentication for registrations (RFC 7616/7617).
//!
//! A registrar keeps one [`AuthSession`] per registration. The session owns
//! the outstanding challenge, so nonce-count tracking and stale detection
//! follow a single binding through all of its refreshes:
//! - **Server-side**: [`DigestSession`] issues 401/407 challenges and
//!   verifies answers (MD5, SHA-256, SHA-512; qop=auth)
//! - **Client-side**: [`DigestClient`] builds Authorization headers
//!
//! # Examples
//!
//! ```
//! # use sip_auth::*;
//! let factory = DigestSessionFactory::new(DigestConfig::default());
//! let session = factory.create();
//! assert_eq!(session.status(), 407);
//! ```

mod client;
mod digest;
mod params;

use std::fmt;

use serde::Serialize;
use sip_core::RegisterRequest;
use smol_str::SmolStr;

pub use client::DigestClient;
pub use digest::{
    DigestAlgorithm, DigestConfig, DigestSession, DigestSessionFactory, Nonce, Qop,
};
pub use params::{parse_challenge, AuthParams};

/// Who a set of credentials claims to be.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    pub username: SmolStr,
    pub realm: SmolStr,
}

impl Identity {
    pub fn new(username: impl Into<SmolStr>, realm: impl Into<SmolStr>) -> Self {
        Self {
            username: username.into(),
            realm: realm.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.realm)
    }
}

/// Challenge/response state for one registration.
pub trait AuthSession: Send {
    /// Whether the request carries a credentials header at all.
    fn has_credentials(&self, req: &dyn RegisterRequest) -> bool;

    /// Starts a new challenge round for `realm`, returning the header to add
    /// to the response. Clears the stale flag once it has been advertised.
    fn challenge(&mut self, req: &dyn RegisterRequest, realm: &str) -> (&'static str, String);

    /// Status code challenges are sent with (401 or 407).
    fn status(&self) -> u16;

    /// Identity claimed by the credentials, or `None` when they are unusable.
    fn parse_credentials(&self, req: &dyn RegisterRequest) -> Option<Identity>;

    /// Checks the credentials against `secret`. A `false` result with
    /// [`AuthSession::is_stale`] set means the answer was for an expired
    /// challenge rather than wrong.
    fn verify(&mut self, req: &dyn RegisterRequest, identity: &Identity, secret: &str) -> bool;

    fn is_stale(&self) -> bool;
}

/// Builds a fresh [`AuthSession`] for each new registration.
pub trait AuthSessionFactory: Send + Sync {
    fn create(&self) -> Box<dyn AuthSession>;
}
