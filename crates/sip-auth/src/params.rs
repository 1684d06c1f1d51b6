// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;

use smol_str::SmolStr;

const MAX_PARAM_LEN: usize = 2048;

/// Scheme plus parameters of an `Authorization`-like or `WWW-Authenticate`-like
/// header value. Parameter names are lowercased and quotes are stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthParams {
    pub scheme: SmolStr,
    params: BTreeMap<SmolStr, SmolStr>,
}

impl AuthParams {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name.to_ascii_lowercase().as_str())
            .map(SmolStr::as_str)
    }

    pub fn is_digest(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("Digest")
    }

    /// `stale=true` on a challenge, compared case-insensitively.
    pub fn is_stale(&self) -> bool {
        self.param("stale")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Parses a challenge or credentials header value.
///
/// Values that are empty, carry control characters, or have an oversized
/// parameter are rejected.
pub fn parse_challenge(value: &str) -> Option<AuthParams> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (scheme, remainder) = match trimmed.split_once(char::is_whitespace) {
        Some((scheme, rest)) => (scheme, rest),
        None => (trimmed, ""),
    };

    let mut params = BTreeMap::new();
    for part in split_quoted_commas(remainder) {
        let (name, val) = part.split_once('=')?;
        let cleaned = val.trim().trim_matches('"');
        if cleaned.len() > MAX_PARAM_LEN || cleaned.chars().any(|c| c.is_ascii_control()) {
            return None;
        }
        params.insert(
            SmolStr::new(name.trim().to_ascii_lowercase()),
            SmolStr::new(cleaned),
        );
    }

    Some(AuthParams {
        scheme: SmolStr::new(scheme),
        params,
    })
}

fn split_quoted_commas(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_owned());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_owned());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_and_bare_values() {
        let parsed = parse_challenge(
            "Digest realm=\"example.com\", nonce=\"abc,def\", algorithm=MD5, qop=\"auth\", stale=TRUE",
        )
        .expect("challenge");
        assert!(parsed.is_digest());
        assert_eq!(parsed.param("Realm"), Some("example.com"));
        assert_eq!(parsed.param("nonce"), Some("abc,def"));
        assert_eq!(parsed.param("algorithm"), Some("MD5"));
        assert!(parsed.is_stale());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_challenge("").is_none());
        assert!(parse_challenge("Digest username").is_none());
        assert!(parse_challenge("Digest username=\"a\u{0}\"").is_none());
    }

    #[test]
    fn scheme_only_has_no_params() {
        let parsed = parse_challenge("Basic").expect("scheme");
        assert!(!parsed.is_digest());
        assert_eq!(parsed.param("realm"), None);
        assert!(!parsed.is_stale());
    }
}
