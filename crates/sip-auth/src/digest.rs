// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use sip_core::RegisterRequest;
use smol_str::SmolStr;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{parse_challenge, AuthParams, AuthSession, AuthSessionFactory, Identity};

const MAX_NC_VALUE: u32 = 1_000_000;
const MAX_NC_JUMP: u32 = 1_000;

/// Digest algorithm per RFC 7616.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DigestAlgorithm {
    #[serde(rename = "MD5", alias = "md5")]
    Md5,
    #[serde(rename = "SHA-256", alias = "sha-256")]
    Sha256,
    #[serde(rename = "SHA-512", alias = "sha-512")]
    Sha512,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Some(DigestAlgorithm::Md5),
            "SHA-256" => Some(DigestAlgorithm::Sha256),
            "SHA-512" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    pub(crate) fn hash(&self, data: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 => format!("{:x}", md5::compute(data)),
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(())
    }
}

/// Quality of Protection (qop) options per RFC 7616.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Qop {
    Auth,
    AuthInt,
}

impl Qop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qop::Auth => "auth",
            Qop::AuthInt => "auth-int",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auth" => Some(Qop::Auth),
            "auth-int" => Some(Qop::AuthInt),
            _ => None,
        }
    }
}

/// Settings shared by every digest session a factory creates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Challenge with 407/Proxy-Authenticate instead of 401/WWW-Authenticate.
    pub proxy: bool,
    pub algorithm: DigestAlgorithm,
    pub qop: Qop,
    /// Nonce lifetime in seconds.
    pub nonce_ttl: u64,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            proxy: true,
            algorithm: DigestAlgorithm::Md5,
            qop: Qop::Auth,
            nonce_ttl: 300,
        }
    }
}

impl DigestConfig {
    pub fn with_proxy(mut self, proxy: bool) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_nonce_ttl(mut self, secs: u64) -> Self {
        self.nonce_ttl = secs;
        self
    }

    pub fn challenge_header(&self) -> &'static str {
        if self.proxy {
            "Proxy-Authenticate"
        } else {
            "WWW-Authenticate"
        }
    }

    pub fn credentials_header(&self) -> &'static str {
        if self.proxy {
            "Proxy-Authorization"
        } else {
            "Authorization"
        }
    }

    pub fn status(&self) -> u16 {
        if self.proxy {
            407
        } else {
            401
        }
    }
}

/// Nonce with expiry tracking and nonce-count replay protection.
#[derive(Debug, Clone)]
pub struct Nonce {
    pub value: SmolStr,
    pub created_at: Instant,
    pub ttl: Duration,
    /// Last nonce-count accepted.
    pub last_nc: u32,
    /// Hash of the request that used `last_nc`, so a retransmission is told
    /// apart from a replay.
    pub last_request_hash: Option<String>,
}

impl Nonce {
    pub fn new(ttl: Duration) -> Self {
        Self {
            value: random_token(32),
            created_at: Instant::now(),
            ttl,
            last_nc: 0,
            last_request_hash: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.created_at.elapsed() <= self.ttl
    }

    /// Accepts a nonce-count for the request identified by `request_hash`.
    ///
    /// - nc > last_nc: new request, accepted and remembered
    /// - nc == last_nc: accepted only as an exact retransmission
    /// - nc < last_nc: replay, rejected
    pub fn validate_nc(&mut self, nc: u32, request_hash: String) -> bool {
        if nc > MAX_NC_VALUE || nc > self.last_nc.saturating_add(MAX_NC_JUMP) {
            return false;
        }
        if nc > self.last_nc {
            self.last_nc = nc;
            self.last_request_hash = Some(request_hash);
            true
        } else if nc == self.last_nc {
            self.last_request_hash.as_deref() == Some(request_hash.as_str())
        } else {
            false
        }
    }
}

/// Per-registration digest state: the outstanding nonce, the realm it was
/// issued for and whether the last failure was due to an expired nonce.
#[derive(Debug)]
pub struct DigestSession {
    config: DigestConfig,
    realm: Option<SmolStr>,
    nonce: Option<Nonce>,
    opaque: SmolStr,
    stale: bool,
}

impl DigestSession {
    pub fn new(config: DigestConfig) -> Self {
        Self {
            config,
            realm: None,
            nonce: None,
            opaque: random_token(32),
            stale: false,
        }
    }

    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    fn credentials(&self, req: &dyn RegisterRequest) -> Option<AuthParams> {
        let value = req.header(self.config.credentials_header())?;
        parse_challenge(value).filter(AuthParams::is_digest)
    }

    fn build_challenge(&self, realm: &str, nonce: &str) -> String {
        let mut value = format!(
            "Digest realm=\"{}\", nonce=\"{}\", algorithm={}, qop=\"{}\", opaque=\"{}\"",
            realm,
            nonce,
            self.config.algorithm.as_str(),
            self.config.qop.as_str(),
            self.opaque
        );
        if self.stale {
            value.push_str(", stale=true");
        }
        value
    }

    fn compute_ha1(&self, username: &str, realm: &str, secret: &str) -> String {
        let ha1_input = format!("{}:{}:{}", username, realm, secret);
        self.config.algorithm.hash(ha1_input.as_bytes())
    }

    fn compute_ha2(&self, method: &str, uri: &str) -> String {
        let ha2_input = match self.config.qop {
            Qop::Auth => format!("{}:{}", method, uri),
            Qop::AuthInt => {
                let body_hash = self.config.algorithm.hash(b"");
                format!("{}:{}:{}", method, uri, body_hash)
            }
        };
        self.config.algorithm.hash(ha2_input.as_bytes())
    }

    #[allow(clippy::too_many_arguments)]
    fn compute_response(
        &self,
        username: &str,
        realm: &str,
        secret: &str,
        method: &str,
        uri: &str,
        nonce: &str,
        nc: &str,
        cnonce: &str,
    ) -> String {
        let ha1 = self.compute_ha1(username, realm, secret);
        let ha2 = self.compute_ha2(method, uri);
        let final_input = format!(
            "{}:{}:{}:{}:{}:{}",
            ha1,
            nonce,
            nc,
            cnonce,
            self.config.qop.as_str(),
            ha2
        );
        self.config.algorithm.hash(final_input.as_bytes())
    }
}

impl AuthSession for DigestSession {
    fn has_credentials(&self, req: &dyn RegisterRequest) -> bool {
        req.has_header(self.config.credentials_header())
    }

    fn challenge(&mut self, _req: &dyn RegisterRequest, realm: &str) -> (&'static str, String) {
        let nonce = Nonce::new(Duration::from_secs(self.config.nonce_ttl));
        let value = self.build_challenge(realm, &nonce.value);
        info!(realm = %realm, proxy = self.config.proxy, stale = self.stale, "issuing digest challenge");
        self.realm = Some(SmolStr::new(realm));
        self.nonce = Some(nonce);
        self.stale = false;
        (self.config.challenge_header(), value)
    }

    fn status(&self) -> u16 {
        self.config.status()
    }

    fn parse_credentials(&self, req: &dyn RegisterRequest) -> Option<Identity> {
        let params = self.credentials(req)?;
        let username = params.param("username").filter(|u| !u.is_empty())?;
        let realm = params.param("realm").filter(|r| !r.is_empty())?;
        Some(Identity::new(username, realm))
    }

    fn verify(&mut self, req: &dyn RegisterRequest, identity: &Identity, secret: &str) -> bool {
        self.stale = false;
        let Some(params) = self.credentials(req) else {
            return false;
        };

        let (Some(username), Some(realm), Some(nonce), Some(uri), Some(response)) = (
            params.param("username"),
            params.param("realm"),
            params.param("nonce"),
            params.param("uri"),
            params.param("response"),
        ) else {
            info!("digest credentials missing required parameters");
            return false;
        };

        if username != identity.username.as_str() || realm != identity.realm.as_str() {
            info!("digest identity mismatch");
            return false;
        }
        if self.realm.as_deref().is_some_and(|issued| issued != realm) {
            info!("digest realm mismatch");
            return false;
        }
        if let Some(algorithm) = params.param("algorithm") {
            if DigestAlgorithm::parse(algorithm) != Some(self.config.algorithm) {
                info!("digest algorithm mismatch");
                return false;
            }
        }
        if uri != req.request_uri() {
            info!("digest uri mismatch");
            return false;
        }
        if params.param("opaque") != Some(self.opaque.as_str()) {
            info!("digest opaque missing or mismatch");
            return false;
        }
        if params.param("qop").and_then(Qop::parse) != Some(self.config.qop) {
            info!("digest qop missing or mismatch");
            return false;
        }
        let (Some(nc_raw), Some(cnonce)) = (params.param("nc"), params.param("cnonce")) else {
            info!("digest missing nc/cnonce with qop");
            return false;
        };
        let Ok(nc) = u32::from_str_radix(nc_raw, 16) else {
            info!("digest nc not hexadecimal");
            return false;
        };

        let Some(current) = self.nonce.as_ref() else {
            info!("digest credentials without an issued challenge");
            return false;
        };

        let expected = self.compute_response(
            username,
            realm,
            secret,
            req.method().as_str(),
            uri,
            nonce,
            nc_raw,
            cnonce,
        );
        if !constant_time_eq(expected.as_bytes(), response.as_bytes()) {
            info!("digest response mismatch");
            return false;
        }

        // A correct answer to a nonce we no longer hold gets a fresh challenge.
        if current.value != nonce {
            debug!("digest nonce superseded");
            self.stale = true;
            return false;
        }
        if !current.is_valid() {
            debug!("digest nonce expired");
            self.stale = true;
            return false;
        }

        let request_hash = request_hash(req);
        let accepted = self
            .nonce
            .as_mut()
            .is_some_and(|current| current.validate_nc(nc, request_hash));
        if !accepted {
            info!(nc, "digest nonce-count replay");
        }
        accepted
    }

    fn is_stale(&self) -> bool {
        self.stale
    }
}

/// Creates one [`DigestSession`] per registration.
#[derive(Debug, Clone, Default)]
pub struct DigestSessionFactory {
    config: DigestConfig,
}

impl DigestSessionFactory {
    pub fn new(config: DigestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }
}

impl AuthSessionFactory for DigestSessionFactory {
    fn create(&self) -> Box<dyn AuthSession> {
        Box::new(DigestSession::new(self.config.clone()))
    }
}

fn request_hash(req: &dyn RegisterRequest) -> String {
    let mut ctx = Sha256::new();
    ctx.update(req.method().as_str().as_bytes());
    ctx.update(b":");
    ctx.update(req.request_uri().as_bytes());
    ctx.update(b":");
    ctx.update(req.header("CSeq").unwrap_or_default().as_bytes());
    hex::encode(ctx.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

pub(crate) fn random_token(len: usize) -> SmolStr {
    let token: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect();
    SmolStr::new(token)
}
