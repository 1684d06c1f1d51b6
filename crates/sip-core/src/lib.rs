// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Message model shared by the registrar crates.
//!
//! The transport layer parses the wire format; this crate only fixes the
//! shape a registrar consumes and produces:
//! - **Requests**: the [`RegisterRequest`] accessor trait and an owned [`Request`]
//! - **Responses**: [`Response`], [`StatusLine`] and the [`ResponseSender`] hook
//! - **Addresses**: [`SipUri`] and [`NameAddr`] for To/Contact values
//! - **Transport**: [`TransportKind`] and the [`Network`] descriptor
//!
//! # Examples
//!
//! ```
//! # use sip_core::*;
//! let contact = NameAddr::parse("<sip:alice@10.0.0.2:5060>;expires=600").unwrap();
//! assert_eq!(contact.param_value("expires"), Some("600"));
//! ```

pub mod headers;
pub mod method;
pub mod msg;
pub mod name_addr;
pub mod request;
pub mod transport;
pub mod uri;

pub use headers::{Header, Headers};
pub use method::Method;
pub use msg::{canonical_reason, MessageError, Response, ResponseSender, StatusLine};
pub use name_addr::NameAddr;
pub use request::{RegisterRequest, Request};
pub use transport::{Network, TransportKind};
pub use uri::SipUri;
