// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use sip_auth::{AuthSessionFactory, DigestSessionFactory, Identity};
use sip_core::{Method, RegisterRequest, Response, ResponseSender, SipUri};
use sip_observe::{span_for_registration, RegistrarMetrics, TracingRegistrarMetrics};
use smol_str::SmolStr;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use crate::config::RegistrarConfig;
use crate::error::Result;
use crate::events::RegistrarEvent;
use crate::lookup::{UserLookup, UserRecord};
use crate::probe::LivenessProber;
use crate::registration::{self, Outcome, Registration};
use crate::registry::{Registry, RegistryStats, SharedRegistration, TransactionKey};
use crate::snapshot::{ContactSet, RegistrationSnapshot};

const EVENT_CAPACITY: usize = 256;

/// Configuration and collaborators shared by every registration.
#[derive(Clone)]
pub struct RegistrarContext {
    pub config: Arc<RegistrarConfig>,
    pub lookup: Arc<dyn UserLookup>,
    pub auth: Arc<dyn AuthSessionFactory>,
    pub prober: Option<Arc<dyn LivenessProber>>,
    pub metrics: Arc<dyn RegistrarMetrics>,
}

/// Builds a [`RegistrarContext`] or a ready [`Registrar`].
///
/// Only the user lookup is required. Digest authentication follows
/// `config.auth` unless another factory is supplied, and metrics go to
/// `tracing`.
pub struct RegistrarBuilder {
    config: RegistrarConfig,
    lookup: Arc<dyn UserLookup>,
    auth: Option<Arc<dyn AuthSessionFactory>>,
    prober: Option<Arc<dyn LivenessProber>>,
    metrics: Option<Arc<dyn RegistrarMetrics>>,
}

impl RegistrarBuilder {
    pub fn new(lookup: Arc<dyn UserLookup>) -> Self {
        Self {
            config: RegistrarConfig::default(),
            lookup,
            auth: None,
            prober: None,
            metrics: None,
        }
    }

    pub fn with_config(mut self, config: RegistrarConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_auth_factory(mut self, auth: Arc<dyn AuthSessionFactory>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_prober(mut self, prober: Arc<dyn LivenessProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn RegistrarMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build_context(self) -> Result<RegistrarContext> {
        self.config.validate()?;
        let auth = self
            .auth
            .unwrap_or_else(|| Arc::new(DigestSessionFactory::new(self.config.auth.clone())));
        Ok(RegistrarContext {
            config: Arc::new(self.config),
            lookup: self.lookup,
            auth,
            prober: self.prober,
            metrics: self
                .metrics
                .unwrap_or_else(|| Arc::new(TracingRegistrarMetrics)),
        })
    }

    pub fn build(self) -> Result<Registrar> {
        Ok(Registrar::new(self.build_context()?))
    }
}

pub(crate) struct Core {
    pub(crate) ctx: RegistrarContext,
    pub(crate) registry: Registry,
    pub(crate) events: broadcast::Sender<RegistrarEvent>,
}

/// Accepts REGISTER requests and answers queries about current bindings.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct Registrar {
    core: Arc<Core>,
}

impl Registrar {
    pub fn new(ctx: RegistrarContext) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            core: Arc::new(Core {
                ctx,
                registry: Registry::new(),
                events,
            }),
        }
    }

    pub fn config(&self) -> &RegistrarConfig {
        &self.core.ctx.config
    }

    /// Handles one incoming request and sends the response, if any, through
    /// `sender`.
    ///
    /// Requests other than REGISTER get 405. A request without a Call-ID gets
    /// 400 and creates nothing. Everything else is routed to the registration
    /// for its transaction key, created on first sight.
    pub async fn handle(&self, req: &dyn RegisterRequest, sender: &dyn ResponseSender) -> anyhow::Result<()> {
        let core = &self.core;
        core.ctx.metrics.on_request(req.transport().as_str());

        if *req.method() != Method::Register {
            debug!(method = %req.method(), "not a REGISTER");
            let response = Response::for_request(405, req)?.with_header("Allow", "REGISTER");
            return sender.send(response);
        }

        let Some(key) = TransactionKey::from_request(req) else {
            info!(source = %req.network(), "REGISTER without Call-ID");
            core.ctx.metrics.on_rejected(400);
            return sender.send(Response::for_request(400, req)?);
        };

        // A registration found destroyed has already left the registry, so
        // the second pass creates a fresh one.
        for _ in 0..2 {
            let (shared, created) = core.registry.get_or_insert_with(&key, || {
                let id = Uuid::new_v4();
                let shared = Registration::new_shared(
                    id,
                    key.clone(),
                    req.network(),
                    core.ctx.clone(),
                    Arc::downgrade(core),
                );
                (id, shared)
            });
            let id = shared.lock().id();
            if created {
                debug!(key = %key, registration = %id, "new registration");
            }

            let span = span_for_registration(&id.to_string(), &key.call_id);
            let outcome = registration::process(core, &shared, req)
                .instrument(span)
                .await?;
            match outcome {
                Outcome::Respond(response) => return sender.send(response),
                Outcome::Silent => return Ok(()),
                Outcome::Gone => continue,
            }
        }
        Ok(())
    }

    /// Receives every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistrarEvent> {
        self.core.events.subscribe()
    }

    pub fn registry(&self) -> &Registry {
        &self.core.registry
    }

    /// Realms with at least one authenticated registration, sorted.
    pub fn realms(&self) -> Vec<SmolStr> {
        self.core.registry.realms()
    }

    pub fn users_at(&self, realm: &str) -> Vec<RegistrationSnapshot> {
        snapshots(self.core.registry.users_at(realm))
    }

    /// A user's registrations, longest remaining lease first.
    pub fn registrations_for(&self, realm: &str, username: &str) -> Vec<RegistrationSnapshot> {
        let mut list = snapshots(self.core.registry.registrations_for(realm, username));
        list.sort_by(|a, b| b.expires_in.cmp(&a.expires_in));
        list
    }

    /// Like [`Registrar::registrations_for`], addressed as `sip:user@realm`
    /// or `user@realm`.
    pub fn registrations_for_aor(&self, aor: &str) -> Vec<RegistrationSnapshot> {
        match split_aor(aor) {
            Some((username, realm)) => self.registrations_for(&realm, &username),
            None => Vec::new(),
        }
    }

    /// Non-stale contacts across all of a user's registrations.
    pub fn contacts_for(&self, realm: &str, username: &str) -> ContactSet {
        ContactSet::collect(realm, username, &self.registrations_for(realm, username))
    }

    pub fn contacts_for_aor(&self, aor: &str) -> Option<ContactSet> {
        let (username, realm) = split_aor(aor)?;
        Some(self.contacts_for(&realm, &username))
    }

    /// Credentials a registered user authenticated with, for checking that
    /// user's later requests. Taken from the registration with the longest
    /// remaining lease.
    pub fn auth_for(&self, realm: &str, username: &str) -> Option<(Identity, UserRecord)> {
        self.core
            .registry
            .registrations_for(realm, username)
            .into_iter()
            .filter_map(|shared| {
                let reg = shared.lock();
                let expires_at = reg.lease_expires_at();
                reg.credentials().map(|credentials| (expires_at, credentials))
            })
            .max_by_key(|(expires_at, _)| *expires_at)
            .map(|(_, credentials)| credentials)
    }

    pub fn auth_for_aor(&self, aor: &str) -> Option<(Identity, UserRecord)> {
        let (username, realm) = split_aor(aor)?;
        self.auth_for(&realm, &username)
    }

    pub fn lookup(&self, key: &TransactionKey) -> Option<RegistrationSnapshot> {
        let shared = self.core.registry.lookup(key)?;
        let snapshot = shared.lock().snapshot(Instant::now());
        Some(snapshot)
    }

    pub fn stats(&self) -> RegistryStats {
        self.core.registry.stats()
    }

    /// Destroys the registration for `key`. Returns false if there was none.
    pub fn remove(&self, key: &TransactionKey) -> bool {
        match self.core.registry.lookup(key) {
            Some(shared) => {
                shared.lock().destroy("removed");
                true
            }
            None => false,
        }
    }

    /// Destroys every registration, returning how many there were.
    pub fn clear(&self) -> usize {
        let all = self.core.registry.all();
        let count = all.len();
        for shared in all {
            shared.lock().destroy("shutdown");
        }
        info!(count, "registrar cleared");
        count
    }
}

fn snapshots(handles: Vec<SharedRegistration>) -> Vec<RegistrationSnapshot> {
    let now = Instant::now();
    handles
        .into_iter()
        .map(|shared| shared.lock().snapshot(now))
        .collect()
}

/// `(username, realm)` from `sip:user@realm`, `sips:user@realm` or
/// `user@realm`.
fn split_aor(aor: &str) -> Option<(SmolStr, SmolStr)> {
    if let Some(uri) = SipUri::parse(aor) {
        return Some((uri.user?, uri.host));
    }
    let (user, realm) = aor.trim().split_once('@')?;
    if user.is_empty() || realm.is_empty() {
        return None;
    }
    Some((SmolStr::new(user), SmolStr::new(realm)))
}
