// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use serde::Serialize;
use smol_str::SmolStr;

/// Transport a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Udp,
    Tcp,
    Tls,
    Ws,
    Wss,
}

impl TransportKind {
    /// Returns the lowercase transport string for metrics and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Udp => "udp",
            TransportKind::Tcp => "tcp",
            TransportKind::Tls => "tls",
            TransportKind::Ws => "ws",
            TransportKind::Wss => "wss",
        }
    }

    /// Value used for the `transport=` URI parameter.
    pub fn as_param(&self) -> &'static str {
        self.as_str()
    }

    /// Connection-oriented transports keep their own return path, so NAT
    /// rewriting only applies to UDP.
    pub fn is_reliable(&self) -> bool {
        !matches!(self, TransportKind::Udp)
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "udp" => Some(TransportKind::Udp),
            "tcp" => Some(TransportKind::Tcp),
            "tls" => Some(TransportKind::Tls),
            "ws" => Some(TransportKind::Ws),
            "wss" => Some(TransportKind::Wss),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request came from, as observed by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub source_address: SmolStr,
    pub source_port: u16,
    #[serde(rename = "protocol")]
    pub transport: TransportKind,
    /// Top Via carried an `rport` marker (RFC 3581).
    pub rport: bool,
}

impl Network {
    pub fn new(source_address: impl Into<SmolStr>, source_port: u16, transport: TransportKind) -> Self {
        Self {
            source_address: source_address.into(),
            source_port,
            transport,
            rport: false,
        }
    }

    pub fn with_rport(mut self, rport: bool) -> Self {
        self.rport = rport;
        self
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source_address.contains(':') {
            write!(f, "{}/[{}]:{}", self.transport, self.source_address, self.source_port)
        } else {
            write!(f, "{}/{}:{}", self.transport, self.source_address, self.source_port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_udp_is_unreliable() {
        assert!(!TransportKind::Udp.is_reliable());
        assert!(TransportKind::Tcp.is_reliable());
        assert!(TransportKind::Wss.is_reliable());
    }

    #[test]
    fn parses_tokens_case_insensitively() {
        assert_eq!(TransportKind::from_token("UDP"), Some(TransportKind::Udp));
        assert_eq!(TransportKind::from_token(" wss "), Some(TransportKind::Wss));
        assert_eq!(TransportKind::from_token("sctp"), None);
    }

    #[test]
    fn network_serializes_protocol_lowercase() {
        let network = Network::new("203.0.113.7", 40000, TransportKind::Tcp);
        let json = serde_json::to_value(&network).expect("json");
        assert_eq!(json["protocol"], "tcp");
        assert_eq!(json["source_port"], 40000);
        assert_eq!(network.to_string(), "tcp/203.0.113.7:40000");
    }
}
