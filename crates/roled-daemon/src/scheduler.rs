//! Reconciliation scheduler
//!
//! Runs a periodic silent sweep over every community the gateway knows
//! about, and drains a trigger channel for loud passes requested by the
//! command router. A failure in one community is logged and never aborts
//! the rest of the sweep.

use crate::config::SchedulerConfig;
use roled_engine::Reconciler;
use roled_gateway::{attempt, Gateway};
use roled_types::ReconcileRequest;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};

/// Scheduler state
pub struct Scheduler {
    config: SchedulerConfig,
    reconciler: Arc<Reconciler>,
    gateway: Arc<dyn Gateway>,
    trigger_tx: mpsc::Sender<ReconcileRequest>,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    /// Create a new scheduler. The returned receiver must be handed back
    /// to [`Scheduler::start`].
    pub fn new(
        config: SchedulerConfig,
        reconciler: Arc<Reconciler>,
        gateway: Arc<dyn Gateway>,
    ) -> (Arc<Self>, mpsc::Receiver<ReconcileRequest>) {
        let (trigger_tx, trigger_rx) = mpsc::channel(config.trigger_capacity.max(1));

        let scheduler = Arc::new(Self {
            config,
            reconciler,
            gateway,
            trigger_tx,
            running: Arc::new(RwLock::new(false)),
        });

        (scheduler, trigger_rx)
    }

    /// Sender used by the command router to request loud passes.
    pub fn trigger_sender(&self) -> mpsc::Sender<ReconcileRequest> {
        self.trigger_tx.clone()
    }

    /// Queue an immediate reconciliation for one community.
    pub async fn trigger(&self, request: ReconcileRequest) {
        let _ = self.trigger_tx.send(request).await;
    }

    /// Run the scheduler loop until stopped.
    pub async fn start(self: Arc<Self>, mut trigger_rx: mpsc::Receiver<ReconcileRequest>) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        tracing::info!(
            interval_secs = self.config.background_interval_secs,
            "Scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.config.background_interval_secs));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.sweep().await;
                }
                Some(request) = trigger_rx.recv() => {
                    if let Err(e) = self
                        .reconciler
                        .reconcile(&request.community, request.channel.as_ref())
                        .await
                    {
                        tracing::error!(
                            community = %request.community,
                            error = %e,
                            "Triggered reconciliation failed"
                        );
                    }
                }
                else => break,
            }

            let running = self.running.read().await;
            if !*running {
                break;
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Stop the scheduler
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    /// One silent pass over every known community.
    async fn sweep(&self) {
        let Some(communities) =
            attempt("list_communities", self.gateway.list_communities()).await
        else {
            return;
        };

        tracing::debug!(communities = communities.len(), "Background sweep");

        for community in communities {
            if let Err(e) = self.reconciler.reconcile(&community, None).await {
                tracing::error!(community = %community, error = %e, "Reconciliation failed");
            }
        }
    }
}
