// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sip_auth::DigestClient;
use sip_core::{Request, Response};
use sip_observe::CountingRegistrarMetrics;
use sip_registrar::{Registrar, RegistrarBuilder, RegistrarConfig, RegistrarEvent, TransactionKey};
use sip_testkit::{RecordingResponder, RegisterBuilder, ScriptedProber, TestUserLookup, CLIENT_ADDRESS, CLIENT_PORT};
use tokio::sync::broadcast::{self, error::TryRecvError};

pub const REALM: &str = "example.com";
pub const SECRET: &str = "secret";

pub struct Harness {
    pub registrar: Registrar,
    pub users: Arc<TestUserLookup>,
    pub responder: Arc<RecordingResponder>,
    pub metrics: Arc<CountingRegistrarMetrics>,
    pub events: broadcast::Receiver<RegistrarEvent>,
}

pub fn users() -> TestUserLookup {
    TestUserLookup::new()
        .with_user("1000", REALM, SECRET)
        .with_user("1001", REALM, SECRET)
        .with_user("2000", "other.example", SECRET)
}

pub fn harness(config: RegistrarConfig) -> Harness {
    build(config, users(), None)
}

pub fn build(config: RegistrarConfig, users: TestUserLookup, prober: Option<Arc<ScriptedProber>>) -> Harness {
    let users = Arc::new(users);
    let metrics = Arc::new(CountingRegistrarMetrics::new());
    let mut builder = RegistrarBuilder::new(users.clone())
        .with_config(config)
        .with_metrics(metrics.clone());
    if let Some(prober) = prober {
        builder = builder.with_prober(prober);
    }
    let registrar = builder.build().expect("registrar");
    let events = registrar.subscribe();
    Harness {
        registrar,
        users,
        responder: Arc::new(RecordingResponder::new()),
        metrics,
        events,
    }
}

pub fn key_for(user: &str) -> TransactionKey {
    TransactionKey::new(format!("reg-{}@test.invalid", user), CLIENT_ADDRESS, CLIENT_PORT)
}

impl Harness {
    /// Handles `req` and returns the response it produced, if any.
    pub async fn send(&self, req: &Request) -> Option<Response> {
        assert!(self.responder.is_empty(), "responses left unread");
        self.registrar
            .handle(req, self.responder.as_ref())
            .await
            .expect("handle");
        let mut sent = self.responder.take();
        assert!(sent.len() <= 1, "one request, at most one response");
        sent.pop()
    }

    pub async fn expect(&self, req: &Request, code: u16) -> Response {
        let response = self.send(req).await.expect("a response");
        assert_eq!(response.code(), code, "unexpected response {:?}", response);
        response
    }

    /// Challenge, then answer. Returns the challenge and the final response.
    pub async fn register(&self, builder: &RegisterBuilder, password: &str) -> (Response, Response) {
        let challenge = self.expect(&builder.build(), 407).await;
        let mut client = DigestClient::new(builder_user(builder).as_str(), password);
        let answer = builder.clone().with_cseq(2).build_answering(&challenge, &mut client);
        let response = self.send(&answer).await.expect("a response");
        (challenge, response)
    }

    pub async fn next_event(&mut self) -> RegistrarEvent {
        tokio::time::timeout(Duration::from_secs(1), self.events.recv())
            .await
            .expect("event in time")
            .expect("event")
    }

    pub fn assert_no_event(&mut self) {
        match self.events.try_recv() {
            Err(TryRecvError::Empty) => {}
            other => panic!("unexpected event {:?}", other),
        }
    }
}

fn builder_user(builder: &RegisterBuilder) -> String {
    use sip_core::RegisterRequest;
    builder
        .build()
        .to()
        .and_then(|to| to.uri_user())
        .map(|user| user.to_string())
        .expect("To user")
}
