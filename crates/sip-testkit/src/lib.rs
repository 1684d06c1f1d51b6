// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test harness for the registrar.
//!
//! Provides REGISTER builders, a response recorder, and scripted doubles for
//! the user lookup and liveness prober collaborators.
//!
//! # Example
//! ```
//! use sip_core::RegisterRequest;
//! use sip_testkit::RegisterBuilder;
//!
//! let req = RegisterBuilder::new("1000", "example.com").with_expires(3600).build();
//! assert_eq!(req.call_id(), Some("reg-1000@test.invalid"));
//! assert_eq!(req.contacts().len(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use sip_auth::{parse_challenge, AuthParams, DigestClient};
use sip_core::{Headers, Method, Network, RegisterRequest, Request, Response, ResponseSender, TransportKind};
use sip_registrar::{LivenessProber, MemoryUserLookup, UserLookup, UserRecord};
use smol_str::SmolStr;
use tokio::sync::Semaphore;

/// Source address REGISTERs come from unless overridden.
pub const CLIENT_ADDRESS: &str = "198.51.100.7";
pub const CLIENT_PORT: u16 = 5062;

/// Builds REGISTER requests for one user.
#[derive(Debug, Clone)]
pub struct RegisterBuilder {
    method: Method,
    user: SmolStr,
    domain: SmolStr,
    call_id: Option<SmolStr>,
    cseq: u32,
    contacts: Vec<String>,
    expires: Option<String>,
    rport: bool,
    source: Network,
    extra: Vec<(SmolStr, SmolStr)>,
}

impl RegisterBuilder {
    /// A REGISTER for `user@domain` with one UDP contact and no lease.
    pub fn new(user: &str, domain: &str) -> Self {
        Self {
            method: Method::Register,
            user: SmolStr::new(user),
            domain: SmolStr::new(domain),
            call_id: Some(SmolStr::new(format!("reg-{}@test.invalid", user))),
            cseq: 1,
            contacts: vec![format!("<sip:{}@192.168.1.20:5060>", user)],
            expires: None,
            rport: false,
            source: Network::new(CLIENT_ADDRESS, CLIENT_PORT, TransportKind::Udp),
            extra: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_call_id(mut self, call_id: &str) -> Self {
        self.call_id = Some(SmolStr::new(call_id));
        self
    }

    pub fn without_call_id(mut self) -> Self {
        self.call_id = None;
        self
    }

    pub fn with_cseq(mut self, cseq: u32) -> Self {
        self.cseq = cseq;
        self
    }

    /// Replaces the contacts with a single Contact header value.
    pub fn with_contact(mut self, contact: &str) -> Self {
        self.contacts = vec![contact.to_owned()];
        self
    }

    pub fn add_contact(mut self, contact: &str) -> Self {
        self.contacts.push(contact.to_owned());
        self
    }

    pub fn without_contact(mut self) -> Self {
        self.contacts.clear();
        self
    }

    pub fn with_expires(mut self, secs: u64) -> Self {
        self.expires = Some(secs.to_string());
        self
    }

    /// Sets the Expires header verbatim, for malformed values.
    pub fn with_expires_raw(mut self, value: &str) -> Self {
        self.expires = Some(value.to_owned());
        self
    }

    /// Adds `rport` to the Via.
    pub fn with_rport(mut self) -> Self {
        self.rport = true;
        self
    }

    pub fn from_source(mut self, address: &str, port: u16, transport: TransportKind) -> Self {
        self.source = Network::new(address, port, transport);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.extra.push((SmolStr::new(name), SmolStr::new(value)));
        self
    }

    pub fn request_uri(&self) -> String {
        format!("sip:{}", self.domain)
    }

    pub fn build(&self) -> Request {
        let mut headers = Headers::new();
        let transport = self.source.transport.as_str();
        let via = if self.rport {
            format!(
                "SIP/2.0/{} 192.168.1.20:5060;branch=z9hG4bK{}{};rport",
                transport, self.user, self.cseq
            )
        } else {
            format!(
                "SIP/2.0/{} 192.168.1.20:5060;branch=z9hG4bK{}{}",
                transport, self.user, self.cseq
            )
        };
        headers.push("Via", via);
        headers.push("Max-Forwards", "70");
        headers.push(
            "From",
            format!("<sip:{}@{}>;tag=from{}", self.user, self.domain, self.user),
        );
        headers.push("To", format!("<sip:{}@{}>", self.user, self.domain));
        if let Some(call_id) = &self.call_id {
            headers.push("Call-ID", call_id.clone());
        }
        headers.push("CSeq", format!("{} {}", self.cseq, self.method));
        for contact in &self.contacts {
            headers.push("Contact", contact.as_str());
        }
        if let Some(expires) = &self.expires {
            headers.push("Expires", expires.as_str());
        }
        for (name, value) in &self.extra {
            headers.push(name.clone(), value.clone());
        }
        headers.push("Content-Length", "0");

        Request::new(self.method.clone(), self.request_uri(), headers, self.source.clone())
    }

    /// Builds the request and answers `challenge` with `client`'s credentials.
    pub fn build_answering(&self, challenge: &Response, client: &mut DigestClient) -> Request {
        let mut req = self.build();
        answer_challenge(&mut req, challenge, client);
        req
    }
}

/// The digest challenge carried by a 401 or 407 response, with the header
/// that has to answer it.
pub fn challenge_of(response: &Response) -> Option<(&'static str, AuthParams)> {
    if let Some(value) = response.headers().get("Proxy-Authenticate") {
        return parse_challenge(value).map(|params| ("Proxy-Authorization", params));
    }
    let value = response.headers().get("WWW-Authenticate")?;
    parse_challenge(value).map(|params| ("Authorization", params))
}

/// Adds credentials answering `challenge` to `req`. Returns false when the
/// response carries no challenge.
pub fn answer_challenge(req: &mut Request, challenge: &Response, client: &mut DigestClient) -> bool {
    let Some((header, params)) = challenge_of(challenge) else {
        return false;
    };
    let uri = req.request_uri().to_owned();
    let value = client.authorization(req.method(), &uri, &params);
    req.headers_mut().set(header, value);
    true
}

/// Collects every response the registrar sends.
#[derive(Debug, Default)]
pub struct RecordingResponder {
    responses: Mutex<Vec<Response>>,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains what has been recorded so far.
    pub fn take(&self) -> Vec<Response> {
        std::mem::take(&mut *self.responses.lock())
    }

    pub fn last(&self) -> Option<Response> {
        self.responses.lock().last().cloned()
    }

    pub fn codes(&self) -> Vec<u16> {
        self.responses.lock().iter().map(Response::code).collect()
    }

    pub fn len(&self) -> usize {
        self.responses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseSender for RecordingResponder {
    fn send(&self, response: Response) -> Result<()> {
        self.responses.lock().push(response);
        Ok(())
    }
}

/// User directory that counts lookups and can hold them until released.
#[derive(Debug, Default)]
pub struct TestUserLookup {
    users: MemoryUserLookup,
    calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl TestUserLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, username: &str, realm: &str, secret: &str) -> Self {
        self.users.add(username, realm, UserRecord::new(secret));
        self
    }

    pub fn with_record(self, username: &str, realm: &str, record: UserRecord) -> Self {
        self.users.add(username, realm, record);
        self
    }

    /// Every lookup waits for a [`TestUserLookup::release`].
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, lookups: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(lookups);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserLookup for TestUserLookup {
    async fn lookup(&self, username: &str, realm: &str) -> Result<UserRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        self.users.lookup(username, realm).await
    }
}

/// A probe the registrar sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentProbe {
    pub target: String,
    pub method: Method,
    pub subject: Option<SmolStr>,
}

/// Prober that replies from a script, falling back to a fixed status code.
#[derive(Debug)]
pub struct ScriptedProber {
    default_reply: Mutex<Option<u16>>,
    script: Mutex<VecDeque<Option<u16>>>,
    sent: Mutex<Vec<SentProbe>>,
}

impl ScriptedProber {
    /// Replies `code` to every probe.
    pub fn replying(code: u16) -> Self {
        Self {
            default_reply: Mutex::new(Some(code)),
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Fails every probe with an error.
    pub fn failing() -> Self {
        Self {
            default_reply: Mutex::new(None),
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, code: Option<u16>) {
        *self.default_reply.lock() = code;
    }

    /// Queues one-off replies ahead of the default; `None` is an error.
    pub fn push_replies(&self, replies: impl IntoIterator<Item = Option<u16>>) {
        self.script.lock().extend(replies);
    }

    pub fn sent(&self) -> Vec<SentProbe> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl LivenessProber for ScriptedProber {
    async fn probe(&self, target: &str, method: &Method, headers: &Headers) -> Result<u16> {
        self.sent.lock().push(SentProbe {
            target: target.to_owned(),
            method: method.clone(),
            subject: headers.get("Subject").cloned(),
        });
        let scripted = self.script.lock().pop_front();
        let reply = match scripted {
            Some(reply) => reply,
            None => *self.default_reply.lock(),
        };
        reply.ok_or_else(|| anyhow!("probe to {} timed out", target))
    }
}
