// src/harvest/scheduler.rs
//! Periodic and on-demand cycle triggering.
//!
//! Cycles may overlap; dedup makes that safe. Shutdown stops new cycles and
//! waits for the in-flight ones.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::harvest::types::Trigger;
use crate::harvest::Harvester;

#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(inflight: Arc<InFlight>) -> Self {
        inflight.count.fetch_add(1, Ordering::SeqCst);
        Self(inflight)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct Scheduler {
    harvester: Arc<Harvester>,
    inflight: Arc<InFlight>,
    shutdown: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(harvester: Arc<Harvester>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            harvester,
            inflight: Arc::new(InFlight::default()),
            shutdown,
        }
    }

    pub fn harvester(&self) -> &Arc<Harvester> {
        &self.harvester
    }

    /// Fire a cycle now and then every `interval` until shutdown.
    pub fn start(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut stop = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = interval.as_secs(), "harvest scheduler started");
            loop {
                tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    _ = ticker.tick() => {
                        this.spawn_cycle(Trigger::Scheduled);
                    }
                }
            }
            tracing::info!("harvest scheduler stopped");
        })
    }

    /// Start an out-of-band cycle without waiting for it. Returns false once
    /// shutdown has begun.
    pub fn trigger_now(&self) -> bool {
        self.spawn_cycle(Trigger::Manual)
    }

    fn spawn_cycle(&self, trigger: Trigger) -> bool {
        // Count first, then check the flag: shutdown either sees this cycle or we see shutdown.
        let guard = InFlightGuard::enter(self.inflight.clone());
        if self.is_shutting_down() {
            return false;
        }
        let harvester = self.harvester.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = harvester.run_cycle(trigger).await {
                tracing::error!(?trigger, error = %e, "harvest cycle failed");
            }
        });
        true
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.count.load(Ordering::SeqCst)
    }

    /// Stop issuing cycles and wait for running ones to finish.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.inflight.wait_idle().await;
        tracing::info!("in-flight harvest cycles finished");
    }

    /// `shutdown`, then join the ticker returned by `start`. False when the
    /// ticker panicked or was cancelled.
    pub async fn shutdown_and_join(&self, ticker: JoinHandle<()>) -> bool {
        self.shutdown().await;
        match ticker.await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "scheduler task ended abnormally");
                false
            }
        }
    }
}
