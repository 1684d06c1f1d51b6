// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contact handling: what a REGISTER asks for and how its contacts are
//! rewritten before they are stored.

use sip_core::{NameAddr, Network, RegisterRequest, SipUri};
use smol_str::SmolStr;

use crate::error::{RegistrarError, Result};

/// The binding part of a REGISTER, before any policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRequest {
    /// Parsed Contact entries; empty for `Contact: *` and the bare
    /// unregister probe.
    pub contacts: Vec<NameAddr>,
    pub wildcard: bool,
    /// Requested lease in seconds.
    pub lease: u64,
}

impl BindingRequest {
    /// Extracts contacts and the requested lease.
    ///
    /// The first contact `expires` parameter wins over the `Expires` header;
    /// with neither, `default_lease` applies. A missing Contact is only
    /// accepted when the lease is 0, and `Contact: *` only with lease 0.
    pub fn parse(req: &dyn RegisterRequest, default_lease: u64) -> Result<Self> {
        let mut contacts = Vec::new();
        let mut has_contact_header = false;
        for value in req.headers("Contact").into_iter().chain(req.headers("m")) {
            has_contact_header = true;
            let parsed = NameAddr::try_parse_list(value)
                .ok_or_else(|| RegistrarError::MalformedRequest("unparsable Contact".into()))?;
            contacts.extend(parsed);
        }
        if has_contact_header && contacts.is_empty() {
            return Err(RegistrarError::MalformedRequest("unparsable Contact".into()));
        }

        let header_lease = match req.header("Expires") {
            Some(value) => Some(parse_lease(value)?),
            None => None,
        };
        let contact_lease = contacts
            .iter()
            .find_map(|c| c.param_value("expires"))
            .map(parse_lease)
            .transpose()?;
        let lease = contact_lease.or(header_lease);

        let wildcard = contacts.iter().any(NameAddr::is_wildcard);
        if wildcard {
            if contacts.len() > 1 {
                return Err(RegistrarError::MalformedRequest(
                    "Contact: * combined with other contacts".into(),
                ));
            }
            if lease != Some(0) {
                return Err(RegistrarError::MalformedRequest(
                    "Contact: * requires a zero lease".into(),
                ));
            }
            return Ok(Self {
                contacts: Vec::new(),
                wildcard: true,
                lease: 0,
            });
        }

        if contacts.is_empty() {
            return match lease {
                Some(0) => Ok(Self {
                    contacts,
                    wildcard: false,
                    lease: 0,
                }),
                _ => Err(RegistrarError::MalformedRequest("missing Contact".into())),
            };
        }

        Ok(Self {
            contacts,
            wildcard: false,
            lease: lease.unwrap_or(default_lease),
        })
    }

    pub fn is_unregister(&self) -> bool {
        self.lease == 0
    }
}

fn parse_lease(value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| RegistrarError::MalformedRequest(format!("unparsable lease {:?}", value.trim())))
}

/// Rewrites a contact's host and port to the observed source when the remote
/// asked for symmetric response routing (or `force_rport` is set) and the
/// transport is UDP.
pub fn rewrite_nat(uri: &mut SipUri, network: &Network, force_rport: bool) {
    if (network.rport || force_rport) && !network.transport.is_reliable() {
        uri.host = network.source_address.clone();
        uri.port = Some(network.source_port);
    }
}

/// Appends `transport=` matching the arrival transport unless the contact
/// already names one.
pub fn annotate_transport(uri: &mut SipUri, network: &Network) {
    if !uri.has_param("transport") {
        uri.push_param("transport", Some(SmolStr::new(network.transport.as_param())));
    }
}

/// NAT rewrite followed by transport annotation. URIs that are not SIP URIs
/// come back unchanged.
pub fn normalize_contact(uri: &str, network: &Network, force_rport: bool) -> String {
    match SipUri::parse(uri) {
        Some(mut parsed) => {
            rewrite_nat(&mut parsed, network, force_rport);
            annotate_transport(&mut parsed, network);
            parsed.to_string()
        }
        None => uri.to_owned(),
    }
}

/// Methods the endpoint says it supports: the `Allow` header, else the first
/// contact's `methods` parameter.
pub fn allowed_methods(req: &dyn RegisterRequest, contacts: &[NameAddr]) -> Vec<SmolStr> {
    let allow = req.headers("Allow");
    let source = if allow.is_empty() {
        match contacts.first().and_then(|c| c.param_value("methods")) {
            Some(methods) => methods.trim_matches('"').to_owned(),
            None => return Vec::new(),
        }
    } else {
        allow.join(",")
    };
    source
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|m| !m.is_empty())
        .map(|m| SmolStr::new(m.to_ascii_uppercase()))
        .collect()
}

/// Replaces the value of every `expires=N` parameter in a Contact header
/// value, leaving the rest of the text untouched.
pub fn rewrite_expires_params(contact: &str, expires: u64) -> String {
    let mut out = String::with_capacity(contact.len());
    let mut rest = contact;
    while let Some(idx) = find_ignore_case(rest, "expires=") {
        let value_start = idx + "expires=".len();
        let digits = rest[value_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        out.push_str(&rest[..value_start]);
        if digits == 0 {
            rest = &rest[value_start..];
            continue;
        }
        out.push_str(&expires.to_string());
        rest = &rest[value_start + digits..];
    }
    out.push_str(rest);
    out
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}
