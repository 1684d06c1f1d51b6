// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use proptest::prelude::*;
use sip_core::{NameAddr, SipUri};

proptest! {
    /// Valid URIs parse and render back to the same text.
    #[test]
    fn uri_renders_as_written(
        scheme in prop::bool::ANY,
        user in proptest::option::of("[a-z0-9]{1,8}"),
        host in "[a-z0-9][a-z0-9\\-]{0,10}",
        port in proptest::option::of(1024u16..65535),
    ) {
        let scheme_str = if scheme { "sips" } else { "sip" };
        let user_part = user.as_ref().map(|u| format!("{}@", u)).unwrap_or_default();
        let port_part = port.map(|p| format!(":{}", p)).unwrap_or_default();

        let uri_str = format!("{}:{}{}{}", scheme_str, user_part, host, port_part);

        let parsed = SipUri::parse(&uri_str);
        prop_assert!(parsed.is_some(), "Failed to parse: {}", uri_str);

        let uri = parsed.unwrap();
        prop_assert_eq!(uri.sips, scheme);
        prop_assert_eq!(uri.user.as_ref().map(|s| s.as_str()), user.as_deref());
        prop_assert_eq!(uri.host.as_str(), &host);
        prop_assert_eq!(uri.port, port);
        prop_assert_eq!(uri.to_string(), uri_str);
    }

    /// Parameter order and flags survive a parse.
    #[test]
    fn uri_params_preserved(
        host in "[a-z]{2,8}",
        transport in prop::sample::select(vec!["udp", "tcp", "tls", "ws"]),
        lr in prop::bool::ANY,
    ) {
        let lr_part = if lr { ";lr" } else { "" };
        let uri_str = format!("sip:{};transport={}{}", host, transport, lr_part);

        let parsed = SipUri::parse(&uri_str).expect("parse");
        prop_assert_eq!(parsed.param("transport"), Some(Some(transport)));
        prop_assert_eq!(parsed.has_param("lr"), lr);
        prop_assert_eq!(parsed.to_string(), uri_str);
    }

    /// Arbitrary header text never panics the name-addr parser.
    #[test]
    fn name_addr_list_never_panics(input in "\\PC{0,64}") {
        let _ = NameAddr::parse_list(&input);
    }

    /// Each entry of a generated Contact list comes back with its expires value.
    #[test]
    fn contact_lists_keep_expires(
        users in prop::collection::vec("[a-z]{1,6}", 1..4),
        expires in 0u32..100_000,
    ) {
        let header = users
            .iter()
            .map(|u| format!("\"{}, x\" <sip:{}@10.1.1.1;transport=udp>;expires={}", u, u, expires))
            .collect::<Vec<_>>()
            .join(", ");
        let parsed = NameAddr::parse_list(&header);
        prop_assert_eq!(parsed.len(), users.len());
        for (addr, user) in parsed.iter().zip(&users) {
            let expected = expires.to_string();
            let user_out = addr.uri_user();
            prop_assert_eq!(user_out.as_deref(), Some(user.as_str()));
            prop_assert_eq!(addr.param_value("expires"), Some(expected.as_str()));
        }
    }
}
