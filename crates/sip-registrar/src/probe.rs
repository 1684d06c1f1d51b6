// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::Result;
use async_trait::async_trait;
use sip_core::{Headers, Method};

/// Sends out-of-band liveness probes to registered contacts.
///
/// The registrar supplies the method and headers; implementations own the
/// transaction and report the final status code of the reply.
#[async_trait]
pub trait LivenessProber: Send + Sync {
    async fn probe(&self, target: &str, method: &Method, headers: &Headers) -> Result<u16>;
}

/// Headers every OPTIONS liveness probe carries.
pub fn probe_headers() -> Headers {
    let mut headers = Headers::new();
    headers.push("Subject", "OPTIONS Ping");
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probes_are_labelled() {
        let headers = probe_headers();
        assert_eq!(headers.get("subject").map(|v| v.as_str()), Some("OPTIONS Ping"));
    }
}
