// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use smol_str::SmolStr;

use crate::SipUri;

/// Generic SIP name-addr structure used by To/From/Contact headers.
///
/// The URI is kept as written; [`NameAddr::sip_uri`] parses it on demand.
/// Header parameters (those after the closing `>`, or after the addr-spec
/// when no angle brackets are used) keep their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAddr {
    pub display_name: Option<SmolStr>,
    pub uri: SmolStr,
    pub params: Vec<(SmolStr, Option<SmolStr>)>,
}

impl NameAddr {
    /// Parses a single name-addr or addr-spec value.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if input == "*" {
            return Some(Self {
                display_name: None,
                uri: SmolStr::new("*"),
                params: Vec::new(),
            });
        }

        let (display_name, uri, rest) = match find_outside_quotes(input, '<') {
            Some(open) => {
                let close = open + input[open..].find('>')?;
                let display = input[..open].trim().trim_matches('"').trim();
                let display = (!display.is_empty()).then(|| SmolStr::new(display));
                (display, input[open + 1..close].trim(), &input[close + 1..])
            }
            None => {
                let (uri, rest) = match input.find(';') {
                    Some(idx) => (&input[..idx], &input[idx..]),
                    None => (input, ""),
                };
                (None, uri.trim(), rest)
            }
        };

        if uri.is_empty() {
            return None;
        }

        let params = split_outside(rest, ';')
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| match p.split_once('=') {
                Some((k, v)) => (SmolStr::new(k.trim()), Some(SmolStr::new(v.trim()))),
                None => (SmolStr::new(p), None),
            })
            .collect();

        Some(Self {
            display_name,
            uri: SmolStr::new(uri),
            params,
        })
    }

    /// Parses a comma-separated header value into its name-addr entries.
    ///
    /// Commas inside quotes or angle brackets do not split. Entries that do
    /// not parse are skipped.
    pub fn parse_list(input: &str) -> Vec<Self> {
        split_outside(input, ',')
            .into_iter()
            .filter_map(Self::parse)
            .collect()
    }

    /// Like [`NameAddr::parse_list`], but fails if any non-blank entry does
    /// not parse.
    pub fn try_parse_list(input: &str) -> Option<Vec<Self>> {
        split_outside(input, ',')
            .into_iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// `Contact: *`, the unregister-everything form.
    pub fn is_wildcard(&self) -> bool {
        self.uri == "*"
    }

    /// Returns a header parameter, ignoring ASCII case in the name.
    /// Flag parameters yield `Some(None)`.
    pub fn param(&self, name: &str) -> Option<Option<&str>> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref())
    }

    /// Returns a parameter's value, if it has one.
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.param(name).flatten()
    }

    pub fn sip_uri(&self) -> Option<SipUri> {
        SipUri::parse(&self.uri)
    }

    pub fn uri_user(&self) -> Option<SmolStr> {
        self.sip_uri().and_then(|uri| uri.user)
    }

    pub fn uri_host(&self) -> Option<SmolStr> {
        self.sip_uri().map(|uri| uri.host)
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            return f.write_str("*");
        }
        if let Some(display) = &self.display_name {
            write!(f, "\"{}\" ", display)?;
        }
        write!(f, "<{}>", self.uri)?;
        for (name, value) in &self.params {
            match value {
                Some(value) => write!(f, ";{}={}", name, value)?,
                None => write!(f, ";{}", name)?,
            }
        }
        Ok(())
    }
}

fn find_outside_quotes(input: &str, needle: char) -> Option<usize> {
    let mut quoted = false;
    for (idx, ch) in input.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            c if c == needle && !quoted => return Some(idx),
            _ => {}
        }
    }
    None
}

fn split_outside(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            '<' if !quoted => depth += 1,
            '>' if !quoted => depth = depth.saturating_sub(1),
            c if c == sep && !quoted && depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}
