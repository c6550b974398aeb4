//! Daemon runtime wiring and lifecycle
//!
//! Builds the store, gateway, reconciler, scheduler and command router
//! from configuration, then drives the inbound message loop until a
//! shutdown signal arrives.

use crate::config::{DaemonConfig, GatewayConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::scheduler::Scheduler;
use roled_commands::CommandRouter;
use roled_engine::Reconciler;
use roled_gateway::{Gateway, MemoryGateway};
use roled_store::{JsonFileStore, SettingsStore};
use std::sync::Arc;
use tokio::sync::broadcast;

/// The assembled daemon
pub struct Runtime {
    config: DaemonConfig,
    store: Arc<dyn SettingsStore>,
    gateway: Arc<dyn Gateway>,
}

impl Runtime {
    /// Build the runtime from configuration.
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let gateway: Arc<dyn Gateway> = match &config.gateway {
            GatewayConfig::Memory => Arc::new(MemoryGateway::new()),
            GatewayConfig::Remote { .. } => {
                return Err(DaemonError::Config(
                    "no remote platform adapter is compiled into this build; \
                     use the memory backend"
                        .to_string(),
                ));
            }
        };

        let store: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::new(&config.data_dir));

        Ok(Self {
            config,
            store,
            gateway,
        })
    }

    /// Run until interrupted.
    pub async fn run(self) -> DaemonResult<()> {
        let reconciler = Arc::new(Reconciler::new(self.store.clone(), self.gateway.clone()));
        let (scheduler, trigger_rx) = Scheduler::new(
            self.config.scheduler.clone(),
            reconciler,
            self.gateway.clone(),
        );

        let router = CommandRouter::new(
            self.store.clone(),
            self.gateway.clone(),
            scheduler.trigger_sender(),
        );

        let mut messages = self.gateway.subscribe_messages();

        let scheduler_task = tokio::spawn(scheduler.clone().start(trigger_rx));

        tracing::info!(
            data_dir = %self.config.data_dir.display(),
            interval_secs = self.config.scheduler.background_interval_secs,
            "Daemon running"
        );

        loop {
            tokio::select! {
                _ = shutdown_signal() => break,
                result = messages.recv() => match result {
                    Ok(message) => {
                        if let Err(e) = router.handle_message(&message).await {
                            tracing::error!(
                                community = %message.community,
                                error = %e,
                                "Command handling failed"
                            );
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Message stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        tracing::info!("Daemon shutting down");

        scheduler.stop().await;
        scheduler_task.abort();

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_backend_without_adapter_is_rejected() {
        let config = DaemonConfig {
            gateway: GatewayConfig::Remote {
                token: "secret".to_string(),
            },
            ..DaemonConfig::default()
        };
        assert!(matches!(Runtime::new(config), Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_memory_backend_builds() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            data_dir: dir.path().to_path_buf(),
            ..DaemonConfig::default()
        };
        assert!(Runtime::new(config).is_ok());
    }
}
