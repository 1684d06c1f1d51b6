// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SIP registrar.
//!
//! Each distinct Call-ID and source endpoint gets its own [`Registration`],
//! a small state machine that challenges the remote, verifies its digest
//! answer against a [`UserLookup`], and then holds the remote's contacts
//! for the granted lease. The [`Registry`] indexes registrations by
//! transaction key and, once authenticated, by realm and username.
//!
//! The transport layer hands requests to [`Registrar::handle`] and receives
//! responses through a [`sip_core::ResponseSender`]. Lifecycle changes are
//! published as [`RegistrarEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sip_registrar::{MemoryUserLookup, RegistrarBuilder, RegistrarConfig, UserRecord};
//!
//! # fn main() -> Result<(), sip_registrar::RegistrarError> {
//! let users = MemoryUserLookup::new().with_user("1000", "example.com", UserRecord::new("secret"));
//! let registrar = RegistrarBuilder::new(Arc::new(users))
//!     .with_config(RegistrarConfig::default().with_min_expires(60))
//!     .build()?;
//! let mut events = registrar.subscribe();
//! # let _ = (&registrar, &mut events);
//! # Ok(())
//! # }
//! ```

mod config;
mod contact;
mod error;
mod events;
mod lookup;
mod probe;
mod registrar;
mod registration;
mod registry;
mod snapshot;
mod timers;

pub use config::RegistrarConfig;
pub use contact::{
    allowed_methods, annotate_transport, normalize_contact, rewrite_expires_params, rewrite_nat,
    BindingRequest,
};
pub use error::{RegistrarError, Result};
pub use events::RegistrarEvent;
pub use lookup::{MemoryUserLookup, UserLookup, UserRecord};
pub use probe::{probe_headers, LivenessProber};
pub use registrar::{Registrar, RegistrarBuilder, RegistrarContext};
pub use registration::{Registration, RegistrationState};
pub use registry::{Registry, RegistryStats, SharedRegistration, TransactionKey};
pub use snapshot::{AuthSummary, ContactEntry, ContactSet, RegistrationSnapshot};
