// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keep-alive mode and liveness probing.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build, harness, key_for, users, REALM, SECRET};
use sip_auth::DigestClient;
use sip_core::Method;
use sip_registrar::{RegistrarConfig, RegistrarEvent};
use sip_testkit::{RegisterBuilder, ScriptedProber};
use tokio::time::sleep;

fn keepalive() -> RegistrarConfig {
    RegistrarConfig::default().with_expires(60).with_regping(1)
}

fn header(response: &sip_core::Response, name: &str) -> Option<String> {
    response.headers().get(name).map(|value| value.to_string())
}

#[tokio::test(start_paused = true)]
async fn heartbeat_is_accepted_without_credentials() {
    let mut h = harness(keepalive());
    let builder = RegisterBuilder::new("1000", REALM)
        .with_contact("<sip:1000@192.168.1.20:5060>;expires=300");

    let (_, ok) = h.register(&builder, SECRET).await;
    assert_eq!(ok.code(), 200);
    assert_eq!(header(&ok, "Expires").as_deref(), Some("1"));
    assert_eq!(
        header(&ok, "Contact").as_deref(),
        Some("<sip:1000@192.168.1.20:5060>;expires=1")
    );
    match h.next_event().await {
        RegistrarEvent::Registered(snapshot) => {
            assert!(snapshot.initial);
            assert_eq!(snapshot.expires, 60);
        }
        other => panic!("expected registered, got {:?}", other),
    }

    sleep(Duration::from_secs(2)).await;
    let beat = h.expect(&builder.clone().with_cseq(3).build(), 200).await;
    assert_eq!(header(&beat, "Expires").as_deref(), Some("1"));
    h.assert_no_event();
    assert_eq!(h.users.calls(), 1);

    let snapshot = h.registrar.lookup(&key_for("1000")).expect("registered");
    assert_eq!(snapshot.expires_in, 58);
    assert!(!snapshot.stale);
}

#[tokio::test(start_paused = true)]
async fn short_leases_are_not_refused() {
    let h = harness(keepalive());
    let builder = RegisterBuilder::new("1000", REALM).with_expires(5);
    let (_, ok) = h.register(&builder, SECRET).await;
    assert_eq!(ok.code(), 200);
    assert_eq!(header(&ok, "Expires").as_deref(), Some("1"));
}

#[tokio::test(start_paused = true)]
async fn expiring_binding_must_authenticate_again() {
    let mut h = harness(keepalive());
    let builder = RegisterBuilder::new("1000", REALM);
    h.register(&builder, SECRET).await;
    assert!(matches!(h.next_event().await, RegistrarEvent::Registered(_)));

    sleep(Duration::from_secs(31)).await;
    let challenge = h.expect(&builder.clone().with_cseq(3).build(), 407).await;

    let mut client = DigestClient::new("1000", SECRET);
    let answer = builder.clone().with_cseq(4).build_answering(&challenge, &mut client);
    h.expect(&answer, 200).await;
    match h.next_event().await {
        RegistrarEvent::Registered(snapshot) => {
            assert!(!snapshot.initial);
            assert_eq!(snapshot.expires_in, 60);
        }
        other => panic!("expected registered, got {:?}", other),
    }
    assert_eq!(h.users.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn heartbeats_alone_do_not_extend_the_lease() {
    let mut h = harness(keepalive());
    let builder = RegisterBuilder::new("1000", REALM);
    h.register(&builder, SECRET).await;
    assert!(matches!(h.next_event().await, RegistrarEvent::Registered(_)));

    for cseq in 3..13 {
        sleep(Duration::from_secs(2)).await;
        h.expect(&builder.clone().with_cseq(cseq).build(), 200).await;
    }
    sleep(Duration::from_secs(41)).await;
    assert!(matches!(h.next_event().await, RegistrarEvent::Removed(_)));
}

fn probing(prober: Arc<ScriptedProber>) -> common::Harness {
    let config = RegistrarConfig::default()
        .with_min_expires(60)
        .with_stale_time(100)
        .with_options_ping(60);
    build(config, users(), Some(prober))
}

#[tokio::test(start_paused = true)]
async fn probe_replies_keep_a_binding_fresh() {
    let prober = Arc::new(ScriptedProber::replying(200));
    let h = probing(prober.clone());
    let builder = RegisterBuilder::new("1000", REALM).with_expires(3600);
    h.register(&builder, SECRET).await;

    sleep(Duration::from_secs(250)).await;
    let sent = prober.sent();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0].target, "sip:1000@192.168.1.20:5060;transport=udp");
    assert_eq!(sent[0].method, Method::Options);
    assert_eq!(sent[0].subject.as_deref(), Some("OPTIONS Ping"));
    let snapshot = h.registrar.lookup(&key_for("1000")).expect("registered");
    assert!(!snapshot.stale);
    assert_eq!(h.registrar.contacts_for(REALM, "1000").contacts.len(), 1);

    prober.set_reply(Some(408));
    sleep(Duration::from_secs(200)).await;
    let snapshot = h.registrar.lookup(&key_for("1000")).expect("registered");
    assert!(snapshot.stale);
    assert!(h.registrar.contacts_for(REALM, "1000").contacts.is_empty());

    let counts = h.metrics.counts();
    assert_eq!(counts.probes_ok, 4);
    assert_eq!(counts.probes_failed, 3);
}

#[tokio::test(start_paused = true)]
async fn probe_errors_are_ignored() {
    let prober = Arc::new(ScriptedProber::failing());
    let h = probing(prober.clone());
    let builder = RegisterBuilder::new("1000", REALM).with_expires(3600);
    h.register(&builder, SECRET).await;

    sleep(Duration::from_secs(130)).await;
    assert_eq!(prober.sent().len(), 2);
    let snapshot = h.registrar.lookup(&key_for("1000")).expect("still registered");
    assert!(snapshot.stale);
}

#[tokio::test(start_paused = true)]
async fn probing_stops_with_the_registration() {
    let prober = Arc::new(ScriptedProber::replying(200));
    let h = probing(prober.clone());
    let builder = RegisterBuilder::new("1000", REALM).with_expires(3600);
    h.register(&builder, SECRET).await;

    sleep(Duration::from_secs(61)).await;
    assert_eq!(prober.sent().len(), 1);
    assert!(h.registrar.remove(&key_for("1000")));
    sleep(Duration::from_secs(300)).await;
    assert_eq!(prober.sent().len(), 1);
}
