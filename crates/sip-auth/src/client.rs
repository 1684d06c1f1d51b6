// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use sip_core::Method;
use smol_str::SmolStr;

use crate::{digest::random_token, AuthParams, DigestAlgorithm, Qop};

/// Client-side helper that answers 401/407 challenges.
///
/// The nonce-count advances on every generated header, so reusing one
/// challenge for several requests yields nc=00000001, 00000002, ...
#[derive(Debug, Clone)]
pub struct DigestClient {
    pub username: SmolStr,
    pub password: SmolStr,
    pub nc: u32,
}

impl DigestClient {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: SmolStr::new(username),
            password: SmolStr::new(password),
            nc: 0,
        }
    }

    /// Answers a parsed challenge for `method` on `uri`.
    pub fn authorization(&mut self, method: &Method, uri: &str, challenge: &AuthParams) -> String {
        let algorithm = challenge
            .param("algorithm")
            .and_then(DigestAlgorithm::parse)
            .unwrap_or(DigestAlgorithm::Md5);
        let qop = challenge.param("qop").and_then(|offered| {
            offered
                .split(',')
                .map(str::trim)
                .find_map(Qop::parse)
        });
        self.generate_authorization(
            method,
            uri,
            challenge.param("realm").unwrap_or_default(),
            challenge.param("nonce").unwrap_or_default(),
            algorithm,
            qop,
            challenge.param("opaque"),
        )
    }

    /// Generates an Authorization header value from explicit challenge parts.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_authorization(
        &mut self,
        method: &Method,
        uri: &str,
        realm: &str,
        nonce: &str,
        algorithm: DigestAlgorithm,
        qop: Option<Qop>,
        opaque: Option<&str>,
    ) -> String {
        self.nc += 1;
        let nc_str = format!("{:08x}", self.nc);
        let cnonce = random_token(16);

        let ha1 = algorithm.hash(format!("{}:{}:{}", self.username, realm, self.password).as_bytes());

        let ha2_input = match qop {
            Some(Qop::AuthInt) => {
                format!("{}:{}:{}", method.as_str(), uri, algorithm.hash(b""))
            }
            _ => format!("{}:{}", method.as_str(), uri),
        };
        let ha2 = algorithm.hash(ha2_input.as_bytes());

        let response = match qop {
            Some(qop) => algorithm.hash(
                format!(
                    "{}:{}:{}:{}:{}:{}",
                    ha1,
                    nonce,
                    nc_str,
                    cnonce,
                    qop.as_str(),
                    ha2
                )
                .as_bytes(),
            ),
            None => algorithm.hash(format!("{}:{}:{}", ha1, nonce, ha2).as_bytes()),
        };

        let mut auth = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\", algorithm={}",
            self.username, realm, nonce, uri, response, algorithm.as_str()
        );

        if let Some(qop) = qop {
            auth.push_str(&format!(
                ", qop={}, nc={}, cnonce=\"{}\"",
                qop.as_str(),
                nc_str,
                cnonce
            ));
        }

        if let Some(opaque_val) = opaque {
            auth.push_str(&format!(", opaque=\"{}\"", opaque_val));
        }

        auth
    }
}
