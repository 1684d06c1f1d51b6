// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use smol_str::SmolStr;

use crate::{Headers, Method, NameAddr, Network, TransportKind};

/// Accessor set a transport must expose for a REGISTER-class request.
///
/// Header lookups ignore ASCII case. Implementations for different
/// transports only need the required methods; the structured accessors are
/// derived from them.
pub trait RegisterRequest: Send + Sync {
    fn method(&self) -> &Method;
    fn request_uri(&self) -> &str;
    /// First value of the named header.
    fn header(&self, name: &str) -> Option<&str>;
    /// Every value of the named header, in message order.
    fn headers(&self, name: &str) -> Vec<&str>;
    fn source_address(&self) -> &str;
    fn source_port(&self) -> u16;
    fn transport(&self) -> TransportKind;

    fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    fn call_id(&self) -> Option<&str> {
        self.header("Call-ID")
            .or_else(|| self.header("i"))
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Parsed Contact entries across every Contact header (compact form `m`
    /// included).
    fn contacts(&self) -> Vec<NameAddr> {
        self.headers("Contact")
            .into_iter()
            .chain(self.headers("m"))
            .flat_map(NameAddr::parse_list)
            .collect()
    }

    fn to(&self) -> Option<NameAddr> {
        self.header("To")
            .or_else(|| self.header("t"))
            .and_then(NameAddr::parse)
    }

    /// Whether the topmost Via asks for symmetric response routing.
    fn has_rport(&self) -> bool {
        let top = self
            .header("Via")
            .or_else(|| self.header("v"))
            .and_then(|via| via.split(',').next());
        match top {
            Some(via) => via.split(';').skip(1).any(|param| {
                let name = param.split('=').next().unwrap_or_default();
                name.trim().eq_ignore_ascii_case("rport")
            }),
            None => false,
        }
    }

    fn network(&self) -> Network {
        Network::new(self.source_address(), self.source_port(), self.transport())
            .with_rport(self.has_rport())
    }
}

/// Owned REGISTER-class request together with the endpoint it arrived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    uri: SmolStr,
    headers: Headers,
    source_address: SmolStr,
    source_port: u16,
    transport: TransportKind,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<SmolStr>, headers: Headers, source: Network) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers,
            source_address: source.source_address,
            source_port: source.source_port,
            transport: source.transport,
        }
    }

    pub fn header_map(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }
}

impl RegisterRequest for Request {
    fn method(&self) -> &Method {
        &self.method
    }

    fn request_uri(&self) -> &str {
        &self.uri
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(SmolStr::as_str)
    }

    fn headers(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    fn source_address(&self) -> &str {
        &self.source_address
    }

    fn source_port(&self) -> u16 {
        self.source_port
    }

    fn transport(&self) -> TransportKind {
        self.transport
    }
}
