// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![no_main]
use libfuzzer_sys::fuzz_target;
use sip_core::SipUri;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 || data.len() > 1024 {
        return;
    }
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Some(uri) = SipUri::parse(s) {
        let _ = uri.to_string();
        let _ = uri.address_of_record();
        let _ = uri.param("transport");
    }
});
