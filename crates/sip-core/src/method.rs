// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use smol_str::SmolStr;

/// Request methods the registrar distinguishes.
///
/// Only REGISTER is dispatched; OPTIONS is what liveness probes send. Anything
/// else is carried through as an extension token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Register,
    Options,
    Unknown(SmolStr),
}

impl Method {
    /// Returns the canonical uppercase token.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Register => "REGISTER",
            Method::Options => "OPTIONS",
            Method::Unknown(token) => token.as_str(),
        }
    }

    /// Parses a method token case-insensitively.
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("REGISTER") {
            Method::Register
        } else if token.eq_ignore_ascii_case("OPTIONS") {
            Method::Options
        } else {
            Method::Unknown(SmolStr::new(token.to_ascii_uppercase()))
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
