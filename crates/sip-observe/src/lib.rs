// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observability hooks for the registrar.
//!
//! The registrar reports through an injected [`RegistrarMetrics`] sink; there
//! is no process-wide instance. Pick [`TracingRegistrarMetrics`] to emit
//! counters as tracing events, [`CountingRegistrarMetrics`] to read them back,
//! or [`NoopRegistrarMetrics`] to discard them.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use sip_observe::{RegistrarMetrics, TracingRegistrarMetrics};
//! let metrics: Arc<dyn RegistrarMetrics> = Arc::new(TracingRegistrarMetrics);
//! metrics.on_request("udp");
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::Level;

/// Metrics sink used by the registrar to emit observability events.
///
/// `transport`, `reason` and `outcome` are low-cardinality identifiers
/// (e.g., "udp", "expired", "ok"). Realms come from local configuration and
/// verified credentials only.
pub trait RegistrarMetrics: Send + Sync + 'static {
    fn on_request(&self, transport: &str);
    fn on_challenge(&self, realm: &str, stale: bool);
    fn on_rejected(&self, code: u16);
    fn on_registered(&self, realm: &str);
    fn on_removed(&self, realm: &str, reason: &str);
    fn on_probe(&self, outcome: &str);
    fn on_lookup_latency(&self, nanos: u64);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistrarMetrics;

impl RegistrarMetrics for NoopRegistrarMetrics {
    fn on_request(&self, _transport: &str) {}
    fn on_challenge(&self, _realm: &str, _stale: bool) {}
    fn on_rejected(&self, _code: u16) {}
    fn on_registered(&self, _realm: &str) {}
    fn on_removed(&self, _realm: &str, _reason: &str) {}
    fn on_probe(&self, _outcome: &str) {}
    fn on_lookup_latency(&self, _nanos: u64) {}
}

/// Creates a tracing span scoped to one registration.
pub fn span_for_registration(id: &str, call_id: &str) -> tracing::Span {
    tracing::span!(Level::INFO, "registration", id = id, call_id = call_id)
}

/// Simple metrics implementation that logs via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRegistrarMetrics;

impl RegistrarMetrics for TracingRegistrarMetrics {
    fn on_request(&self, transport: &str) {
        tracing::debug!(transport, "register received");
    }

    fn on_challenge(&self, realm: &str, stale: bool) {
        tracing::debug!(realm, stale, "challenge issued");
    }

    fn on_rejected(&self, code: u16) {
        tracing::info!(code, "register rejected");
    }

    fn on_registered(&self, realm: &str) {
        tracing::info!(realm, "binding registered");
    }

    fn on_removed(&self, realm: &str, reason: &str) {
        tracing::info!(realm, reason, "binding removed");
    }

    fn on_probe(&self, outcome: &str) {
        tracing::debug!(outcome, "liveness probe");
    }

    fn on_lookup_latency(&self, nanos: u64) {
        tracing::debug!(nanos, "credential lookup latency");
    }
}

/// Keeps running totals in atomics so they can be read back.
#[derive(Debug, Default)]
pub struct CountingRegistrarMetrics {
    requests: AtomicU64,
    challenges: AtomicU64,
    stale_challenges: AtomicU64,
    rejections: AtomicU64,
    registered: AtomicU64,
    removed: AtomicU64,
    probes_ok: AtomicU64,
    probes_failed: AtomicU64,
}

/// Point-in-time copy of [`CountingRegistrarMetrics`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricCounts {
    pub requests: u64,
    pub challenges: u64,
    pub stale_challenges: u64,
    pub rejections: u64,
    pub registered: u64,
    pub removed: u64,
    pub probes_ok: u64,
    pub probes_failed: u64,
}

impl CountingRegistrarMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> MetricCounts {
        MetricCounts {
            requests: self.requests.load(Ordering::Relaxed),
            challenges: self.challenges.load(Ordering::Relaxed),
            stale_challenges: self.stale_challenges.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            registered: self.registered.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            probes_ok: self.probes_ok.load(Ordering::Relaxed),
            probes_failed: self.probes_failed.load(Ordering::Relaxed),
        }
    }
}

impl RegistrarMetrics for CountingRegistrarMetrics {
    fn on_request(&self, _transport: &str) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    fn on_challenge(&self, _realm: &str, stale: bool) {
        self.challenges.fetch_add(1, Ordering::Relaxed);
        if stale {
            self.stale_challenges.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_rejected(&self, _code: u16) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    fn on_registered(&self, _realm: &str) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    fn on_removed(&self, _realm: &str, _reason: &str) {
        self.removed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_probe(&self, outcome: &str) {
        if outcome == "ok" {
            self.probes_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.probes_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_lookup_latency(&self, _nanos: u64) {}
}
