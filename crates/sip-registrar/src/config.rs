// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use serde::Deserialize;
use sip_auth::DigestConfig;

use crate::error::{RegistrarError, Result};

/// Timing and mode settings for a registrar. All durations are in seconds.
///
/// Every field has a default, so a JSON document only needs the values it
/// changes:
///
/// ```
/// use sip_registrar::RegistrarConfig;
///
/// let config = RegistrarConfig::from_json(r#"{"min_expires": 60, "regping": 30}"#).unwrap();
/// assert_eq!(config.expires, 3600);
/// assert!(config.is_keepalive());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    /// Lease granted when the request names none. In keep-alive mode this is
    /// the lease the registrar actually enforces.
    pub expires: u64,
    /// Requests below this lease get 423 (not in keep-alive mode).
    pub min_expires: u64,
    /// Longer requested leases are clamped to this.
    pub max_expires: u64,
    /// A binding with no liveness signal for this long is stale.
    pub stale_time: u64,
    /// Keep-alive cadence told to the remote. Enables keep-alive mode.
    pub regping: Option<u64>,
    /// Interval between OPTIONS liveness probes.
    pub options_ping: Option<u64>,
    /// How long to wait for the answer to a challenge.
    pub auth_timeout: u64,
    /// Rewrite UDP contacts to the source address even without `rport`.
    pub force_rport: bool,
    pub auth: DigestConfig,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            expires: 3600,
            min_expires: 3600,
            max_expires: 86400,
            stale_time: 300,
            regping: None,
            options_ping: None,
            auth_timeout: 32,
            force_rport: false,
            auth: DigestConfig::default(),
        }
    }
}

impl RegistrarConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RegistrarError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.expires == 0 {
            return Err(RegistrarError::InvalidConfig("expires must be positive".into()));
        }
        if self.max_expires < self.min_expires {
            return Err(RegistrarError::InvalidConfig(format!(
                "max_expires ({}) is below min_expires ({})",
                self.max_expires, self.min_expires
            )));
        }
        if self.auth_timeout == 0 {
            return Err(RegistrarError::InvalidConfig("auth_timeout must be positive".into()));
        }
        if self.regping == Some(0) {
            return Err(RegistrarError::InvalidConfig("regping must be positive".into()));
        }
        if self.options_ping == Some(0) {
            return Err(RegistrarError::InvalidConfig("options_ping must be positive".into()));
        }
        Ok(())
    }

    pub fn with_expires(mut self, secs: u64) -> Self {
        self.expires = secs;
        self
    }

    pub fn with_min_expires(mut self, secs: u64) -> Self {
        self.min_expires = secs;
        self
    }

    pub fn with_max_expires(mut self, secs: u64) -> Self {
        self.max_expires = secs;
        self
    }

    pub fn with_stale_time(mut self, secs: u64) -> Self {
        self.stale_time = secs;
        self
    }

    pub fn with_regping(mut self, secs: u64) -> Self {
        self.regping = Some(secs);
        self
    }

    pub fn with_options_ping(mut self, secs: u64) -> Self {
        self.options_ping = Some(secs);
        self
    }

    pub fn with_auth_timeout(mut self, secs: u64) -> Self {
        self.auth_timeout = secs;
        self
    }

    pub fn with_force_rport(mut self, force: bool) -> Self {
        self.force_rport = force;
        self
    }

    pub fn with_auth(mut self, auth: DigestConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn is_keepalive(&self) -> bool {
        self.regping.is_some()
    }

    pub(crate) fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout)
    }

    pub(crate) fn stale_window(&self) -> Duration {
        Duration::from_secs(self.stale_time)
    }

    pub(crate) fn probe_interval(&self) -> Option<Duration> {
        self.options_ping.map(Duration::from_secs)
    }
}
