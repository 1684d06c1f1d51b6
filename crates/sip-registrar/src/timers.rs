// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-registration timers.
//!
//! Each timer is a spawned task holding only weak references, so a dropped
//! registrar or a destroyed registration never keeps a task alive. Every arm
//! bumps the slot's sequence number; a task that wakes up to find its number
//! superseded does nothing, which covers the window between an abort and the
//! task noticing it.

use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use sip_core::Method;

use crate::probe::probe_headers;
use crate::registrar::Core;
use crate::registration::{Registration, RegistrationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    Auth,
    Lease,
    Probe,
}

impl TimerKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Auth => "auth",
            TimerKind::Lease => "lease",
            TimerKind::Probe => "probe",
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TimerSlot {
    seq: u64,
    handle: Option<AbortHandle>,
}

impl TimerSlot {
    /// Cancels whatever is armed and returns the sequence number for the
    /// replacement.
    fn next(&mut self) -> u64 {
        self.cancel();
        self.seq
    }

    fn set(&mut self, handle: AbortHandle) {
        self.handle = Some(handle);
    }

    pub(crate) fn cancel(&mut self) {
        self.seq = self.seq.wrapping_add(1);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub(crate) fn is_current(&self, seq: u64) -> bool {
        self.handle.is_some() && self.seq == seq
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

type WeakRegistration = Weak<Mutex<Registration>>;

/// Arms the one-shot auth or lease timer on `reg`.
pub(crate) fn arm_oneshot(reg: &mut Registration, kind: TimerKind, after: Duration) {
    let seq = reg.timer_slot(kind).next();
    let this = reg.this();
    let task = tokio::spawn(async move {
        sleep(after).await;
        fire_oneshot(this, kind, seq);
    });
    reg.timer_slot(kind).set(task.abort_handle());
    debug!(registration = %reg.id(), timer = kind.as_str(), secs = after.as_secs(), "timer armed");
}

fn fire_oneshot(this: WeakRegistration, kind: TimerKind, seq: u64) {
    let Some(shared) = this.upgrade() else {
        return;
    };
    let mut reg = shared.lock();
    let slot = reg.timer_slot(kind);
    if !slot.is_current(seq) {
        return;
    }
    slot.handle = None;
    match kind {
        TimerKind::Auth => {
            info!(registration = %reg.id(), key = %reg.key(), "challenge was not answered in time");
            reg.destroy("auth-timeout");
        }
        TimerKind::Lease => {
            info!(registration = %reg.id(), key = %reg.key(), "lease expired");
            reg.destroy("expired");
        }
        TimerKind::Probe => {}
    }
}

/// Starts the periodic liveness probe on `reg`.
pub(crate) fn start_probe(reg: &mut Registration, core: Weak<Core>, every: Duration) {
    let seq = reg.timer_slot(TimerKind::Probe).next();
    let this = reg.this();
    let task = tokio::spawn(probe_loop(this, core, every, seq));
    reg.timer_slot(TimerKind::Probe).set(task.abort_handle());
    debug!(registration = %reg.id(), secs = every.as_secs(), "liveness probe started");
}

async fn probe_loop(this: WeakRegistration, core: Weak<Core>, every: Duration, seq: u64) {
    loop {
        sleep(every).await;

        let (targets, generation) = {
            let Some(shared) = this.upgrade() else {
                return;
            };
            let mut reg = shared.lock();
            if !reg.timer_slot(TimerKind::Probe).is_current(seq)
                || reg.state() == RegistrationState::Destroyed
            {
                return;
            }
            (reg.contacts().to_vec(), reg.generation())
        };
        let Some(core) = core.upgrade() else {
            return;
        };
        let Some(prober) = core.ctx.prober.clone() else {
            return;
        };

        for target in targets {
            let outcome = prober
                .probe(&target, &Method::Options, &probe_headers())
                .await;
            match outcome {
                Ok(200) => {
                    core.ctx.metrics.on_probe("ok");
                    if !mark_alive(&this, seq, generation) {
                        return;
                    }
                }
                Ok(code) => {
                    core.ctx.metrics.on_probe("failed");
                    debug!(contact = %target, code, "liveness probe unanswered");
                }
                Err(err) => {
                    core.ctx.metrics.on_probe("error");
                    warn!(contact = %target, error = %err, "liveness probe failed");
                }
            }
        }
    }
}

/// Records a probe reply. Returns false once the registration has moved on.
fn mark_alive(this: &WeakRegistration, seq: u64, generation: u64) -> bool {
    let Some(shared) = this.upgrade() else {
        return false;
    };
    let mut reg = shared.lock();
    if !reg.timer_slot(TimerKind::Probe).is_current(seq) || reg.generation() != generation {
        return false;
    }
    reg.touch_liveness(Instant::now());
    true
}
