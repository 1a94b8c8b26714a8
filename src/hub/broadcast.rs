//! Broadcast Scheduler
//!
//! Fixed-interval loop: build a snapshot, encode it once, and hand the same
//! payload to every registered connection. A failed build skips the tick;
//! the next tick is the retry.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::connection::Frame;
use super::error::HubError;
use super::registry::ConnectionRegistry;
use crate::snapshot::{encode_binary, Payload, SnapshotBuilder, SnapshotError};

/// Result of delivering one payload to the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Connections the payload was queued on
    pub delivered: usize,
    /// Connections that were gone and have been unregistered
    pub failed: usize,
    /// Payload size in bytes
    pub bytes: usize,
}

/// What happened on one tick
#[derive(Debug)]
pub enum TickOutcome {
    Delivered(FanoutReport),
    /// Snapshot could not be built or encoded; nothing was sent
    Skipped(SnapshotError),
}

/// Periodic snapshot broadcaster
pub struct BroadcastScheduler {
    builder: Arc<SnapshotBuilder>,
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
}

impl BroadcastScheduler {
    pub fn new(
        builder: Arc<SnapshotBuilder>,
        registry: Arc<ConnectionRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            builder,
            registry,
            interval,
        }
    }

    /// Run a single tick: build, encode, fan out
    pub async fn tick(&self) -> TickOutcome {
        let snapshot = match self.builder.build().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot build failed, skipping broadcast");
                return TickOutcome::Skipped(e);
            }
        };

        let payload = match encode_binary(&snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Snapshot encoding failed, skipping broadcast");
                return TickOutcome::Skipped(e);
            }
        };

        TickOutcome::Delivered(fan_out(&self.registry, payload).await)
    }

    /// Start the broadcast loop
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            diagnostics = self.builder.diagnostics_name(),
            "Starting snapshot broadcaster"
        );

        tokio::spawn(async move {
            // interval() panics on a zero period
            let period = self.interval.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if let TickOutcome::Delivered(report) = self.tick().await {
                    if report.delivered > 0 || report.failed > 0 {
                        tracing::trace!(
                            delivered = report.delivered,
                            failed = report.failed,
                            bytes = report.bytes,
                            "Broadcast snapshot"
                        );
                    }
                }
            }
        })
    }
}

/// Deliver one payload to every current member of the registry
///
/// Each connection is written by its own writer task, so this only queues
/// the payload. A connection whose writer is gone is unregistered and the
/// pass carries on with the rest.
pub async fn fan_out(registry: &ConnectionRegistry, payload: Payload) -> FanoutReport {
    let members = registry.snapshot_members().await;
    let mut report = FanoutReport {
        bytes: payload.len(),
        ..Default::default()
    };

    for member in members {
        match member.send(Frame::Binary(Arc::clone(&payload))) {
            Ok(()) => report.delivered += 1,
            Err(HubError::QueueFull(queued)) => {
                tracing::warn!(
                    connection_id = %member.id(),
                    queued,
                    "Dashboard is not reading, dropping connection"
                );
                registry.unregister(&member.id()).await;
                report.failed += 1;
            }
            Err(e) => {
                tracing::debug!(
                    connection_id = %member.id(),
                    error = %e,
                    "Dropping connection from broadcast"
                );
                registry.unregister(&member.id()).await;
                report.failed += 1;
            }
        }
    }

    report
}
