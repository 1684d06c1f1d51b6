// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![no_main]
use libfuzzer_sys::fuzz_target;
use sip_core::{NameAddr, Network, TransportKind};
use sip_registrar::{normalize_contact, rewrite_expires_params};

fuzz_target!(|data: &[u8]| {
    if data.len() > 2048 {
        return;
    }
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let network = Network::new("203.0.113.9", 61000, TransportKind::Udp).with_rport(true);
    for contact in NameAddr::parse_list(s) {
        let _ = contact.param_value("expires");
        let _ = normalize_contact(&contact.uri, &network, false);
    }
    if let Some(strict) = NameAddr::try_parse_list(s) {
        assert!(strict.len() <= NameAddr::parse_list(s).len());
    }
    let _ = rewrite_expires_params(s, 30);
});
