// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use smol_str::SmolStr;

/// Parsed SIP or SIPS URI (RFC 3261 §19).
///
/// Parameters keep their original order so a URI can be rewritten (new
/// host/port, extra `transport` parameter) and rendered back without
/// disturbing anything the endpoint put there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SipUri {
    pub sips: bool,
    pub user: Option<SmolStr>,
    pub host: SmolStr,
    pub port: Option<u16>,
    pub params: Vec<(SmolStr, Option<SmolStr>)>,
    pub headers: Option<SmolStr>,
}

impl SipUri {
    /// Attempts to parse a SIP or SIPS URI from the provided string.
    pub fn parse(input: &str) -> Option<Self> {
        let (scheme, rest) = input.trim().split_once(':')?;
        let sips = scheme.eq_ignore_ascii_case("sips");
        if !sips && !scheme.eq_ignore_ascii_case("sip") {
            return None;
        }

        let (addr_part, headers) = match rest.split_once('?') {
            Some((addr, headers)) => (addr, Some(SmolStr::new(headers))),
            None => (rest, None),
        };

        let mut addr_iter = addr_part.split(';');
        let base = addr_iter.next()?.trim();
        let params = addr_iter
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| match p.split_once('=') {
                Some((k, v)) => (SmolStr::new(k.trim()), Some(SmolStr::new(v.trim()))),
                None => (SmolStr::new(p), None),
            })
            .collect();

        let (user, host_port) = match base.rsplit_once('@') {
            Some((user, host)) if !user.is_empty() => (Some(SmolStr::new(user)), host),
            Some((_, host)) => (None, host),
            None => (None, base),
        };
        if host_port.is_empty() {
            return None;
        }

        let (host, port) = split_host_port(host_port)?;
        if host.is_empty() {
            return None;
        }

        Some(Self {
            sips,
            user,
            host: SmolStr::new(host),
            port,
            params,
            headers,
        })
    }

    /// Returns the value of a URI parameter, ignoring ASCII case in the name.
    ///
    /// The outer `Option` tells whether the parameter is present at all; flag
    /// parameters such as `lr` yield `Some(None)`.
    pub fn param(&self, name: &str) -> Option<Option<&str>> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref())
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// Appends a parameter to the end of the parameter list.
    pub fn push_param(&mut self, name: impl Into<SmolStr>, value: Option<SmolStr>) {
        self.params.push((name.into(), value));
    }

    /// Returns `user@host` (or just `host`), the form identities are keyed by.
    pub fn address_of_record(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.to_string(),
        }
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.sips { "sips:" } else { "sip:" })?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for (name, value) in &self.params {
            match value {
                Some(value) => write!(f, ";{}={}", name, value)?,
                None => write!(f, ";{}", name)?,
            }
        }
        if let Some(headers) = &self.headers {
            write!(f, "?{}", headers)?;
        }
        Ok(())
    }
}

/// Splits a host[:port] or IPv6 literal "[host]:port" string.
fn split_host_port(input: &str) -> Option<(&str, Option<u16>)> {
    let input = input.trim();
    if input.starts_with('[') {
        let end = input.find(']')?;
        let host = &input[1..end];
        let remainder = &input[end + 1..];
        if let Some(port) = remainder.strip_prefix(':') {
            Some((host, Some(port.parse().ok()?)))
        } else if remainder.is_empty() {
            Some((host, None))
        } else {
            None
        }
    } else if let Some((host, port)) = input.split_once(':') {
        if port.contains(':') {
            return None;
        }
        Some((host, Some(port.parse().ok()?)))
    } else {
        Some((input, None))
    }
}
