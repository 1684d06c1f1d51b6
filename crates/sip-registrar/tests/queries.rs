// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only views over the registry.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build, harness, key_for, users, Harness, REALM, SECRET};
use sip_auth::Identity;
use sip_registrar::{RegistrarConfig, RegistrarEvent, RegistryStats, UserRecord};
use sip_testkit::{RegisterBuilder, CLIENT_ADDRESS, CLIENT_PORT};
use smol_str::SmolStr;
use tokio::time::sleep;

fn config() -> RegistrarConfig {
    RegistrarConfig::default().with_min_expires(60)
}

async fn register(h: &Harness, user: &str, realm: &str, call_id: &str, lease: u64) {
    let builder = RegisterBuilder::new(user, realm)
        .with_call_id(call_id)
        .with_expires(lease);
    let (_, ok) = h.register(&builder, SECRET).await;
    assert_eq!(ok.code(), 200, "registering {}@{}", user, realm);
}

async fn populate(h: &Harness) {
    register(h, "1000", REALM, "desk", 600).await;
    register(h, "1000", REALM, "mobile", 1200).await;
    register(h, "1001", REALM, "laptop", 900).await;
    register(h, "2000", "other.example", "lobby", 600).await;
}

#[tokio::test(start_paused = true)]
async fn realms_users_and_registrations() {
    let h = harness(config());
    populate(&h).await;

    assert_eq!(
        h.registrar.realms(),
        vec![SmolStr::new("example.com"), SmolStr::new("other.example")]
    );
    assert_eq!(h.registrar.users_at(REALM).len(), 3);
    assert_eq!(h.registrar.users_at("other.example").len(), 1);
    assert!(h.registrar.users_at("nowhere.example").is_empty());

    let list = h.registrar.registrations_for(REALM, "1000");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].expires, 1200);
    assert_eq!(list[1].expires, 600);
    assert!(list[0].expires_in >= list[1].expires_in);
    assert_eq!(list[0].call_id.as_str(), "mobile");

    assert_eq!(h.registrar.registrations_for_aor("sip:1000@example.com").len(), 2);
    assert_eq!(h.registrar.registrations_for_aor("1000@example.com").len(), 2);
    assert!(h.registrar.registrations_for_aor("example.com").is_empty());

    assert_eq!(
        h.registrar.stats(),
        RegistryStats {
            by_transaction: 4,
            by_realm: 2
        }
    );
}

#[tokio::test(start_paused = true)]
async fn contacts_aggregate_across_registrations() {
    let users = users().with_record(
        "1000",
        REALM,
        UserRecord::new(SECRET).with_display_name("Alice"),
    );
    let h = build(config(), users, None);
    register(&h, "1000", REALM, "desk", 600).await;
    let mobile = RegisterBuilder::new("1000", REALM)
        .with_call_id("mobile")
        .with_contact("<sip:1000@10.0.0.9:5070;transport=tcp>")
        .with_expires(1200);
    h.register(&mobile, SECRET).await;

    let set = h.registrar.contacts_for(REALM, "1000");
    assert_eq!(set.username.as_str(), "1000");
    assert_eq!(set.uri, "1000@example.com");
    assert_eq!(set.display_name.as_deref(), Some("Alice"));
    let contacts: Vec<&str> = set.contacts.iter().map(|c| c.contact.as_str()).collect();
    assert_eq!(
        contacts,
        vec![
            "sip:1000@10.0.0.9:5070;transport=tcp",
            "sip:1000@192.168.1.20:5060;transport=udp",
        ]
    );
    assert_eq!(set.contacts[0].network.source_port, CLIENT_PORT);

    let by_aor = h.registrar.contacts_for_aor("sip:1000@example.com").expect("aor");
    assert_eq!(by_aor, set);
    assert!(h.registrar.contacts_for_aor("not an aor").is_none());
}

#[tokio::test(start_paused = true)]
async fn stale_contacts_are_left_out() {
    let h = harness(config());
    register(&h, "1000", REALM, "desk", 3600).await;

    sleep(Duration::from_secs(301)).await;
    let list = h.registrar.registrations_for(REALM, "1000");
    assert_eq!(list.len(), 1);
    assert!(list[0].stale);
    assert!(h.registrar.contacts_for(REALM, "1000").contacts.is_empty());

    sleep(Duration::from_secs(600)).await;
    assert!(h.registrar.registrations_for(REALM, "1000")[0].stale);
}

#[tokio::test(start_paused = true)]
async fn clear_removes_everything() {
    let mut h = harness(config());
    populate(&h).await;
    for _ in 0..4 {
        assert!(matches!(h.next_event().await, RegistrarEvent::Registered(_)));
    }

    assert_eq!(h.registrar.clear(), 4);
    for _ in 0..4 {
        assert!(matches!(h.next_event().await, RegistrarEvent::Removed(_)));
    }
    assert!(h.registrar.realms().is_empty());
    assert!(h.registrar.registry().is_empty());
    assert_eq!(h.metrics.counts().removed, 4);
}

#[tokio::test(start_paused = true)]
async fn indexes_stay_consistent() {
    let h = harness(config());
    populate(&h).await;
    // Pending registrations live only in the transaction index.
    h.expect(
        &RegisterBuilder::new("1001", REALM)
            .with_call_id("pending")
            .with_expires(600)
            .build(),
        407,
    )
    .await;
    assert!(h.registrar.remove(&sip_registrar::TransactionKey::new(
        "laptop",
        CLIENT_ADDRESS,
        CLIENT_PORT
    )));
    let bye = RegisterBuilder::new("1000", REALM)
        .with_call_id("desk")
        .with_expires(0);
    h.register(&bye, SECRET).await;

    let registry = h.registrar.registry();
    assert_eq!(registry.len(), 3);
    for shared in registry.all() {
        let reg = shared.lock();
        match reg.identity() {
            Some(identity) => {
                let indexed = registry.registrations_for(&identity.realm, &identity.username);
                assert!(indexed.iter().any(|other| Arc::ptr_eq(other, &shared)));
            }
            None => assert_eq!(reg.key().call_id.as_str(), "pending"),
        }
    }
    for realm in registry.realms() {
        for username in registry.usernames_at(&realm) {
            for shared in registry.registrations_for(&realm, &username) {
                let key = shared.lock().key().clone();
                let by_key = registry.lookup(&key).expect("transaction entry");
                assert!(Arc::ptr_eq(&by_key, &shared));
            }
        }
    }
    assert!(registry.registrations_for(REALM, "1001").is_empty());
    assert!(h.registrar.lookup(&key_for("1000")).is_none());
}

#[tokio::test(start_paused = true)]
async fn events_serialize_with_their_snapshot() {
    let mut h = harness(config());
    register(&h, "1000", REALM, "desk", 600).await;
    let event = h.next_event().await;
    let json = serde_json::to_value(&event).expect("json");
    assert_eq!(json["event"], "registered");
    assert_eq!(
        json["data"]["transaction_key"],
        format!("desk@{}:{}", CLIENT_ADDRESS, CLIENT_PORT)
    );
    assert_eq!(json["data"]["network"]["protocol"], "udp");
    assert_eq!(json["data"]["auth"]["uri"], "1000@example.com");
}

#[tokio::test(start_paused = true)]
async fn auth_for_returns_verified_credentials() {
    let users = users().with_record(
        "1000",
        REALM,
        UserRecord::new(SECRET).with_display_name("Alice"),
    );
    let h = build(config(), users, None);
    // Challenged but never answered.
    h.expect(
        &RegisterBuilder::new("1001", REALM)
            .with_call_id("pending")
            .with_expires(600)
            .build(),
        407,
    )
    .await;
    assert!(h.registrar.auth_for(REALM, "1001").is_none());

    register(&h, "1000", REALM, "desk", 600).await;
    register(&h, "1000", REALM, "mobile", 1200).await;

    let (identity, record) = h.registrar.auth_for(REALM, "1000").expect("credentials");
    assert_eq!(identity, Identity::new("1000", REALM));
    assert_eq!(record.secret.as_str(), SECRET);
    assert_eq!(record.display_name.as_deref(), Some("Alice"));
    assert_eq!(
        h.registrar.auth_for_aor("sip:1000@example.com").map(|(identity, _)| identity),
        Some(identity)
    );
    assert!(h.registrar.auth_for(REALM, "9999").is_none());
    assert!(h.registrar.auth_for("other.example", "1000").is_none());

    for call_id in ["desk", "mobile"] {
        let key = sip_registrar::TransactionKey::new(call_id, CLIENT_ADDRESS, CLIENT_PORT);
        assert!(h.registrar.remove(&key));
    }
    assert!(h.registrar.auth_for(REALM, "1000").is_none());
}
