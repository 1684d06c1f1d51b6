// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One binding's lifecycle.
//!
//! ```text
//! Pending ──auth ok, lease>0──▶ Active ──refresh──▶ Refreshing ──▶ Active
//!    │                           │                      │
//!    └────────── reject / lease 0 / auth or lease timer ─┴──▶ Destroyed
//! ```
//!
//! A request is handled in up to three steps. The first runs under the
//! registration lock and answers everything that needs no credential lookup.
//! If a lookup is needed the state moves to `Refreshing`, the lock is
//! released, and the lookup runs. The last step re-locks, discards the
//! result if the registration was destroyed meanwhile, and verifies and
//! commits.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sip_auth::{AuthSession, Identity};
use sip_core::{MessageError, Network, RegisterRequest, Response};
use smol_str::SmolStr;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::contact::{allowed_methods, normalize_contact, rewrite_expires_params, BindingRequest};
use crate::error::RegistrarError;
use crate::events::RegistrarEvent;
use crate::lookup::UserRecord;
use crate::registrar::{Core, RegistrarContext};
use crate::registry::{SharedRegistration, TransactionKey};
use crate::snapshot::{AuthSummary, RegistrationSnapshot};
use crate::timers::{self, TimerKind, TimerSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationState {
    /// Challenged, never authenticated.
    Pending,
    Active,
    /// A credential lookup is outstanding.
    Refreshing,
    Destroyed,
}

impl RegistrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationState::Pending => "pending",
            RegistrationState::Active => "active",
            RegistrationState::Refreshing => "refreshing",
            RegistrationState::Destroyed => "destroyed",
        }
    }
}

/// What the dispatcher should do once a request has been handled.
#[derive(Debug)]
pub(crate) enum Outcome {
    Respond(Response),
    /// Nothing to send: an overlapping refresh, or a lookup whose
    /// registration went away.
    Silent,
    /// The registration was already destroyed; start over with a new one.
    Gone,
}

enum Step {
    Done(Outcome),
    Lookup {
        identity: Identity,
        binding: BindingRequest,
        generation: u64,
    },
}

impl From<Outcome> for Step {
    fn from(outcome: Outcome) -> Self {
        Step::Done(outcome)
    }
}

pub struct Registration {
    id: Uuid,
    key: TransactionKey,
    state: RegistrationState,
    generation: u64,

    ctx: RegistrarContext,
    core: Weak<Core>,
    this: Weak<Mutex<Registration>>,

    auth: Box<dyn AuthSession>,
    identity: Option<Identity>,
    display_name: Option<SmolStr>,
    challenge_realm: Option<SmolStr>,
    secret_cache: Option<(Identity, UserRecord)>,
    has_ever_authenticated: bool,
    reached_active: bool,
    initial: bool,

    aor: SmolStr,
    contacts: Vec<SmolStr>,
    network: Network,
    allow: Vec<SmolStr>,
    user_agent: SmolStr,
    lease: u64,
    advertised_lease: u64,

    created_at: Instant,
    registered_at: Option<Instant>,
    lease_armed_at: Instant,
    last_refreshed_at: Option<Instant>,
    last_liveness_at: Instant,

    auth_timer: TimerSlot,
    lease_timer: TimerSlot,
    probe_timer: TimerSlot,
}

impl Registration {
    pub(crate) fn new_shared(
        id: Uuid,
        key: TransactionKey,
        network: Network,
        ctx: RegistrarContext,
        core: Weak<Core>,
    ) -> SharedRegistration {
        Arc::new_cyclic(|this| {
            let now = Instant::now();
            let auth = ctx.auth.create();
            Mutex::new(Self {
                id,
                key,
                state: RegistrationState::Pending,
                generation: 0,
                ctx,
                core,
                this: this.clone(),
                auth,
                identity: None,
                display_name: None,
                challenge_realm: None,
                secret_cache: None,
                has_ever_authenticated: false,
                reached_active: false,
                initial: true,
                aor: SmolStr::default(),
                contacts: Vec::new(),
                network,
                allow: Vec::new(),
                user_agent: SmolStr::default(),
                lease: 0,
                advertised_lease: 0,
                created_at: now,
                registered_at: None,
                lease_armed_at: now,
                last_refreshed_at: None,
                last_liveness_at: now,
                auth_timer: TimerSlot::default(),
                lease_timer: TimerSlot::default(),
                probe_timer: TimerSlot::default(),
            })
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &TransactionKey {
        &self.key
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn contacts(&self) -> &[SmolStr] {
        &self.contacts
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Lease the registrar enforces, in seconds.
    pub fn lease(&self) -> u64 {
        self.lease
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn has_ever_authenticated(&self) -> bool {
        self.has_ever_authenticated
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_refreshed_at(&self) -> Option<Instant> {
        self.last_refreshed_at
    }

    /// The verified identity together with the record it was checked
    /// against. `None` until the registration has authenticated.
    pub fn credentials(&self) -> Option<(Identity, UserRecord)> {
        if self.state == RegistrationState::Destroyed || !self.has_ever_authenticated {
            return None;
        }
        let identity = self.identity.as_ref()?;
        self.secret_cache
            .as_ref()
            .filter(|(cached, _)| cached == identity)
            .cloned()
    }

    pub(crate) fn lease_expires_at(&self) -> Instant {
        self.lease_armed_at + Duration::from_secs(self.lease)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn this(&self) -> Weak<Mutex<Registration>> {
        self.this.clone()
    }

    pub(crate) fn timer_slot(&mut self, kind: TimerKind) -> &mut TimerSlot {
        match kind {
            TimerKind::Auth => &mut self.auth_timer,
            TimerKind::Lease => &mut self.lease_timer,
            TimerKind::Probe => &mut self.probe_timer,
        }
    }

    /// At least half of the lease has elapsed since it was last granted.
    pub fn is_expiring(&self, now: Instant) -> bool {
        self.state == RegistrationState::Active
            && now.saturating_duration_since(self.lease_armed_at) >= Duration::from_secs(self.lease) / 2
    }

    /// No refresh or probe reply within the staleness window.
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_liveness_at) > self.ctx.config.stale_window()
    }

    pub(crate) fn touch_liveness(&mut self, now: Instant) {
        self.last_liveness_at = now;
    }

    fn realm_label(&self) -> &str {
        self.identity
            .as_ref()
            .map(|identity| identity.realm.as_str())
            .unwrap_or("")
    }

    /// First step: everything that can be decided without a credential
    /// lookup.
    fn begin(&mut self, req: &dyn RegisterRequest, now: Instant) -> Result<Step, MessageError> {
        match self.state {
            RegistrationState::Destroyed => return Ok(Outcome::Gone.into()),
            RegistrationState::Refreshing => {
                debug!(key = %self.key, "dropping request that overlaps a pending lookup");
                return Ok(Outcome::Silent.into());
            }
            RegistrationState::Pending | RegistrationState::Active => {}
        }

        let config = self.ctx.config.clone();
        let binding = match BindingRequest::parse(req, config.expires) {
            Ok(binding) => binding,
            Err(err) => return self.reject(req, err).map(Step::Done),
        };

        if !config.is_keepalive() && !binding.is_unregister() && binding.lease < config.min_expires {
            info!(
                key = %self.key,
                requested = binding.lease,
                min = config.min_expires,
                "lease too short"
            );
            let mut response = Response::for_request(423, req)?;
            response
                .headers_mut()
                .push("Min-Expires", config.min_expires.to_string());
            echo_contacts(&mut response, req, None);
            // A registration that never got past this point still has to
            // be reaped.
            if !self.has_ever_authenticated && !self.auth_timer.is_armed() {
                let timeout = config.auth_timeout();
                timers::arm_oneshot(self, TimerKind::Auth, timeout);
            }
            return Ok(Outcome::Respond(response).into());
        }

        let has_credentials = self.auth.has_credentials(req);

        if config.is_keepalive()
            && !has_credentials
            && self.state == RegistrationState::Active
            && !self.is_expiring(now)
            && !binding.is_unregister()
        {
            self.last_refreshed_at = Some(now);
            self.last_liveness_at = now;
            debug!(key = %self.key, realm = self.realm_label(), "keep-alive refresh");
            return self
                .ok_response(req, self.advertised_lease)
                .map(|response| Step::Done(Outcome::Respond(response)));
        }

        if !has_credentials {
            return self.challenge(req).map(Step::Done);
        }

        let Some(identity) = self.auth.parse_credentials(req) else {
            return self
                .reject(req, RegistrarError::AuthFailed("unusable credentials".into()))
                .map(Step::Done);
        };

        if let Some(established) = &self.identity {
            if *established != identity {
                let err = RegistrarError::IdentityMismatch {
                    established: established.to_string(),
                    presented: identity.to_string(),
                };
                return self.reject(req, err).map(Step::Done);
            }
        }

        if let Some((cached, record)) = &self.secret_cache {
            if *cached == identity {
                let record = record.clone();
                return self.finish(req, identity, record, binding, now).map(Step::Done);
            }
        }

        self.state = RegistrationState::Refreshing;
        Ok(Step::Lookup {
            identity,
            binding,
            generation: self.generation,
        })
    }

    /// Last step after a lookup resolved.
    fn resume(
        &mut self,
        req: &dyn RegisterRequest,
        identity: Identity,
        binding: BindingRequest,
        generation: u64,
        result: anyhow::Result<UserRecord>,
        now: Instant,
    ) -> Result<Outcome, MessageError> {
        if self.generation != generation || self.state == RegistrationState::Destroyed {
            debug!(key = %self.key, identity = %identity, "discarding lookup for a destroyed registration");
            return Ok(Outcome::Silent);
        }
        self.state = self.settled_state();

        match result {
            Ok(record) => {
                self.secret_cache = Some((identity.clone(), record.clone()));
                self.finish(req, identity, record, binding, now)
            }
            Err(err) => {
                let err = RegistrarError::LookupFailed {
                    identity: identity.to_string(),
                    reason: err.to_string(),
                };
                self.reject(req, err)
            }
        }
    }

    /// Undoes `begin` when its lookup will never be resumed.
    fn abandon_lookup(&mut self, generation: u64) {
        if self.generation == generation && self.state == RegistrationState::Refreshing {
            debug!(key = %self.key, "credential lookup abandoned");
            self.state = self.settled_state();
        }
    }

    fn settled_state(&self) -> RegistrationState {
        if self.has_ever_authenticated {
            RegistrationState::Active
        } else {
            RegistrationState::Pending
        }
    }

    fn finish(
        &mut self,
        req: &dyn RegisterRequest,
        identity: Identity,
        record: UserRecord,
        binding: BindingRequest,
        now: Instant,
    ) -> Result<Outcome, MessageError> {
        if !self.auth.verify(req, &identity, &record.secret) {
            if self.auth.is_stale() {
                debug!(key = %self.key, identity = %identity, "answer to an expired challenge");
                return self.challenge(req);
            }
            return self.reject(req, RegistrarError::AuthFailed(format!("bad digest from {}", identity)));
        }

        self.auth_timer.cancel();
        self.has_ever_authenticated = true;
        if self.identity.is_none() {
            self.identity = Some(identity);
            self.display_name = record.display_name;
            if let (Some(core), Some(this)) = (self.core.upgrade(), self.this.upgrade()) {
                core.registry.put(&this, self);
            }
        }

        if binding.is_unregister() {
            let response = self.ok_response(req, 0)?;
            info!(key = %self.key, realm = self.realm_label(), "unregistered");
            self.destroy("unregistered");
            return Ok(Outcome::Respond(response));
        }

        self.commit(req, &binding, now);
        let response = self.ok_response(req, self.advertised_lease)?;
        Ok(Outcome::Respond(response))
    }

    /// Applies an authenticated refresh with a non-zero lease.
    fn commit(&mut self, req: &dyn RegisterRequest, binding: &BindingRequest, now: Instant) {
        let config = self.ctx.config.clone();
        let first = !self.reached_active;
        let recovering = self.is_expiring(now);

        let network = req.network();
        self.contacts = binding
            .contacts
            .iter()
            .map(|contact| SmolStr::new(normalize_contact(&contact.uri, &network, config.force_rport)))
            .collect();
        self.network = network;

        self.lease = if config.is_keepalive() {
            config.expires
        } else {
            binding.lease.min(config.max_expires)
        };
        self.advertised_lease = config.regping.unwrap_or(self.lease);
        self.allow = allowed_methods(req, &binding.contacts);
        self.user_agent = req.header("User-Agent").map(SmolStr::new).unwrap_or_default();
        if let Some(to) = req.to() {
            self.aor = to.uri;
        }

        self.lease_armed_at = now;
        self.last_refreshed_at = Some(now);
        self.last_liveness_at = now;
        let lease = Duration::from_secs(self.lease);
        timers::arm_oneshot(self, TimerKind::Lease, lease);

        self.state = RegistrationState::Active;
        self.reached_active = true;

        if first || recovering {
            self.registered_at = Some(now);
            let snapshot = self.snapshot(now);
            info!(
                key = %self.key,
                realm = self.realm_label(),
                contacts = self.contacts.len(),
                lease = self.lease,
                initial = self.initial,
                "registered"
            );
            self.ctx.metrics.on_registered(self.realm_label());
            self.emit(RegistrarEvent::Registered(snapshot));
        } else {
            debug!(key = %self.key, realm = self.realm_label(), lease = self.lease, "refreshed");
        }
        self.initial = false;

        if first && self.ctx.prober.is_some() {
            if let Some(every) = config.probe_interval() {
                let core = self.core.clone();
                timers::start_probe(self, core, every);
            }
        }
    }

    fn challenge(&mut self, req: &dyn RegisterRequest) -> Result<Outcome, MessageError> {
        let realm = self
            .identity
            .as_ref()
            .map(|identity| identity.realm.clone())
            .or_else(|| self.challenge_realm.clone())
            .or_else(|| req.to().and_then(|to| to.uri_host()))
            .or_else(|| sip_core::SipUri::parse(req.request_uri()).map(|uri| uri.host));
        let Some(realm) = realm else {
            return self.reject(req, RegistrarError::MalformedRequest("no realm to challenge for".into()));
        };

        let stale = self.auth.is_stale();
        let (name, value) = self.auth.challenge(req, &realm);
        let response = Response::for_request(self.auth.status(), req)?.with_header(name, value);

        debug!(key = %self.key, realm = %realm, stale, "challenging");
        self.ctx.metrics.on_challenge(&realm, stale);
        self.challenge_realm = Some(realm);
        let timeout = self.ctx.config.auth_timeout();
        timers::arm_oneshot(self, TimerKind::Auth, timeout);
        Ok(Outcome::Respond(response))
    }

    fn reject(&mut self, req: &dyn RegisterRequest, err: RegistrarError) -> Result<Outcome, MessageError> {
        let code = err.status_code();
        warn!(key = %self.key, code, error = %err, "rejecting register");
        self.ctx.metrics.on_rejected(code);
        if matches!(err, RegistrarError::AuthFailed(_)) {
            self.emit(RegistrarEvent::AuthFailed(req.network()));
        }
        let response = Response::for_request(code, req)?;

        // A malformed request cannot take down a binding that is already
        // authenticated.
        let keep = matches!(err, RegistrarError::MalformedRequest(_)) && self.has_ever_authenticated;
        if !keep {
            self.destroy(err.kind());
        }
        Ok(Outcome::Respond(response))
    }

    fn ok_response(&self, req: &dyn RegisterRequest, expires: u64) -> Result<Response, MessageError> {
        let mut response = Response::for_request(200, req)?;
        let rewrite = self.ctx.config.is_keepalive().then_some(expires);
        echo_contacts(&mut response, req, rewrite);
        response.headers_mut().push("Expires", expires.to_string());
        response.headers_mut().push("Date", Utc::now().to_rfc2822());
        Ok(response)
    }

    /// Terminal. Cancels every timer, leaves both indexes and, if the binding
    /// was ever registered, publishes its last snapshot. Later calls do
    /// nothing.
    pub fn destroy(&mut self, reason: &str) {
        if self.state == RegistrationState::Destroyed {
            return;
        }
        self.state = RegistrationState::Destroyed;
        self.generation = self.generation.wrapping_add(1);
        self.auth_timer.cancel();
        self.lease_timer.cancel();
        self.probe_timer.cancel();

        if let Some(core) = self.core.upgrade() {
            core.registry.remove(self);
        }
        debug!(key = %self.key, reason, "registration destroyed");

        if self.reached_active {
            let snapshot = self.snapshot(Instant::now());
            self.ctx.metrics.on_removed(self.realm_label(), reason);
            self.emit(RegistrarEvent::Removed(snapshot));
        }
    }

    fn emit(&self, event: RegistrarEvent) {
        if let Some(core) = self.core.upgrade() {
            // No subscribers is fine.
            let _ = core.events.send(event);
        }
    }

    pub fn snapshot(&self, now: Instant) -> RegistrationSnapshot {
        let wall_now = Utc::now();
        let wall = |at: Instant| -> DateTime<Utc> {
            let ago = chrono::Duration::from_std(now.saturating_duration_since(at))
                .unwrap_or_else(|_| chrono::Duration::zero());
            wall_now - ago
        };
        let lease = Duration::from_secs(self.lease);
        let expires_at = wall(self.lease_armed_at)
            + chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::zero());

        RegistrationSnapshot {
            id: self.id,
            initial: self.initial,
            call_id: self.key.call_id.clone(),
            transaction_key: self.key.clone(),
            aor: self.aor.clone(),
            contacts: self.contacts.clone(),
            expires: self.lease,
            auth: self.identity.as_ref().map(|identity| AuthSummary {
                username: identity.username.clone(),
                realm: identity.realm.clone(),
                display_name: self.display_name.clone(),
                uri: identity.to_string(),
            }),
            registered_at: self.registered_at.map(wall),
            last_ping_at: wall(self.last_liveness_at),
            expires_at,
            expires_in: (self.lease_armed_at + lease).saturating_duration_since(now).as_secs(),
            stale: self.is_stale(now),
            user_agent: self.user_agent.clone(),
            allow: self.allow.clone(),
            network: self.network.clone(),
        }
    }
}

/// Copies the request's Contact values onto `response`, optionally
/// rewriting every `expires` parameter.
fn echo_contacts(response: &mut Response, req: &dyn RegisterRequest, expires: Option<u64>) {
    for contact in req.headers("Contact").into_iter().chain(req.headers("m")) {
        let value = match expires {
            Some(expires) => rewrite_expires_params(contact, expires),
            None => contact.to_owned(),
        };
        response.headers_mut().push("Contact", value);
    }
}

/// Puts a registration back to rest if the future driving its lookup is
/// dropped before the lookup resolves.
struct LookupGuard<'a> {
    shared: &'a SharedRegistration,
    generation: u64,
    armed: bool,
}

impl Drop for LookupGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.lock().abandon_lookup(self.generation);
        }
    }
}

/// Runs one request through `shared`. The registration lock is never held
/// across the credential lookup.
pub(crate) async fn process(
    core: &Arc<Core>,
    shared: &SharedRegistration,
    req: &dyn RegisterRequest,
) -> Result<Outcome, MessageError> {
    let step = shared.lock().begin(req, Instant::now())?;
    let (identity, binding, generation) = match step {
        Step::Done(outcome) => return Ok(outcome),
        Step::Lookup {
            identity,
            binding,
            generation,
        } => (identity, binding, generation),
    };

    let mut guard = LookupGuard {
        shared,
        generation,
        armed: true,
    };
    let started = Instant::now();
    let result = core
        .ctx
        .lookup
        .lookup(&identity.username, &identity.realm)
        .await;
    core.ctx
        .metrics
        .on_lookup_latency(u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX));
    guard.armed = false;

    shared
        .lock()
        .resume(req, identity, binding, generation, result, Instant::now())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lookup::MemoryUserLookup;
    use crate::registrar::RegistrarBuilder;
    use sip_core::TransportKind;

    pub(crate) fn detached(key: TransactionKey, identity: Option<Identity>) -> SharedRegistration {
        let ctx = RegistrarBuilder::new(Arc::new(MemoryUserLookup::new()))
            .build_context()
            .expect("context");
        let network = Network::new(key.source_address.clone(), key.source_port, TransportKind::Udp);
        let shared = Registration::new_shared(Uuid::new_v4(), key, network, ctx, Weak::new());
        shared.lock().identity = identity;
        shared
    }

    #[test]
    fn new_registration_is_pending_and_initial() {
        let shared = detached(TransactionKey::new("a", "192.0.2.1", 5060), None);
        let reg = shared.lock();
        assert_eq!(reg.state(), RegistrationState::Pending);
        assert!(reg.is_initial());
        assert!(!reg.has_ever_authenticated());
        assert!(reg.contacts().is_empty());
        let snapshot = reg.snapshot(Instant::now());
        assert!(snapshot.auth.is_none());
        assert_eq!(snapshot.transaction_key.to_string(), "a@192.0.2.1:5060");
    }

    #[test]
    fn destroy_is_idempotent() {
        let shared = detached(TransactionKey::new("b", "192.0.2.1", 5060), None);
        let mut reg = shared.lock();
        reg.destroy("test");
        let generation = reg.generation();
        reg.destroy("test");
        assert_eq!(reg.state(), RegistrationState::Destroyed);
        assert_eq!(reg.generation(), generation);
    }

    #[tokio::test(start_paused = true)]
    async fn staleness_follows_liveness() {
        let shared = detached(TransactionKey::new("c", "192.0.2.1", 5060), None);
        assert!(!shared.lock().is_stale(Instant::now()));
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(shared.lock().is_stale(Instant::now()));
        shared.lock().touch_liveness(Instant::now());
        assert!(!shared.lock().is_stale(Instant::now()));
    }

    #[test]
    fn abandoned_lookup_returns_to_rest() {
        let shared = detached(TransactionKey::new("d", "192.0.2.1", 5060), None);
        let generation = {
            let mut reg = shared.lock();
            reg.state = RegistrationState::Refreshing;
            reg.generation()
        };
        drop(LookupGuard {
            shared: &shared,
            generation,
            armed: true,
        });
        assert_eq!(shared.lock().state(), RegistrationState::Pending);

        {
            let mut reg = shared.lock();
            reg.state = RegistrationState::Refreshing;
            reg.has_ever_authenticated = true;
        }
        drop(LookupGuard {
            shared: &shared,
            generation: generation + 1,
            armed: true,
        });
        assert_eq!(shared.lock().state(), RegistrationState::Refreshing);
        drop(LookupGuard {
            shared: &shared,
            generation,
            armed: false,
        });
        assert_eq!(shared.lock().state(), RegistrationState::Refreshing);
        shared.lock().abandon_lookup(generation);
        assert_eq!(shared.lock().state(), RegistrationState::Active);
    }

    #[test]
    fn credentials_need_an_authenticated_identity() {
        let identity = Identity::new("1000", "example.com");
        let shared = detached(TransactionKey::new("e", "192.0.2.1", 5060), Some(identity.clone()));
        shared.lock().secret_cache = Some((identity.clone(), UserRecord::new("pw")));
        assert!(shared.lock().credentials().is_none());

        shared.lock().has_ever_authenticated = true;
        let (found, record) = shared.lock().credentials().expect("credentials");
        assert_eq!(found, identity);
        assert_eq!(record.secret, "pw");

        shared.lock().destroy("test");
        assert!(shared.lock().credentials().is_none());
    }

    #[test]
    fn state_labels() {
        assert_eq!(RegistrationState::Refreshing.as_str(), "refreshing");
        assert_eq!(
            serde_json::to_string(&RegistrationState::Active).expect("json"),
            "\"active\""
        );
    }
}
