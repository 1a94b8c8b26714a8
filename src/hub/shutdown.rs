//! Shutdown Coordinator
//!
//! Stops the registry from taking new connections, then sends every open
//! connection a normal-closure close frame, concurrently, and waits for the
//! notifications to complete, bounded by a deadline.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use super::error::HubError;
use super::registry::ConnectionRegistry;

/// WebSocket close code for a normal closure
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close reason sent to dashboards on shutdown
pub const SHUTDOWN_REASON: &str = "Server shutting down";

/// How the drain ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every close notification completed before the deadline
    Graceful { closed: usize, failed: usize },
    /// The deadline expired with notifications still outstanding
    DeadlineExceeded { pending: usize },
}

impl ShutdownOutcome {
    pub fn is_graceful(&self) -> bool {
        matches!(self, ShutdownOutcome::Graceful { .. })
    }
}

/// Drains the registry on shutdown
pub struct ShutdownCoordinator {
    registry: Arc<ConnectionRegistry>,
    deadline: Duration,
}

impl ShutdownCoordinator {
    pub fn new(registry: Arc<ConnectionRegistry>, deadline: Duration) -> Self {
        Self { registry, deadline }
    }

    /// Close every connection, waiting at most the deadline
    ///
    /// Connections that arrive after the drain starts are refused by the
    /// registry. Individual failures are logged and counted, never retried.
    pub async fn drain(&self) -> ShutdownOutcome {
        let members = self.registry.stop_accepting().await;
        let total = members.len();

        tracing::info!(
            connections = total,
            deadline_ms = self.deadline.as_millis() as u64,
            "Closing all dashboard connections"
        );

        let mut notifications = JoinSet::new();
        for member in members {
            notifications.spawn(async move {
                let result = match member.close(NORMAL_CLOSURE, SHUTDOWN_REASON) {
                    Ok(ack) => ack.await.unwrap_or(Err(HubError::ConnectionClosed)),
                    Err(e) => Err(e),
                };
                (member.id(), result)
            });
        }

        let mut closed = 0;
        let mut failed = 0;
        let all_done = async {
            while let Some(joined) = notifications.join_next().await {
                match joined {
                    Ok((_, Ok(()))) => closed += 1,
                    Ok((connection_id, Err(e))) => {
                        tracing::warn!(
                            connection_id = %connection_id,
                            error = %e,
                            "Failed to notify connection of shutdown"
                        );
                        failed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Close notification task failed");
                        failed += 1;
                    }
                }
            }
        };

        let finished = tokio::time::timeout(self.deadline, all_done).await.is_ok();

        if finished {
            tracing::info!(closed, failed, "All connections notified, shutdown complete");
            ShutdownOutcome::Graceful { closed, failed }
        } else {
            notifications.abort_all();
            let pending = total - closed - failed;
            tracing::warn!(
                closed,
                failed,
                pending,
                "Shutdown deadline exceeded, exiting with connections still open"
            );
            ShutdownOutcome::DeadlineExceeded { pending }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::connection::{spawn_writer, ConnectionHandle, Frame, FrameSink};
    use crate::hub::HubConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<Frame>>>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_frame(&mut self, frame: Frame) -> Result<(), HubError> {
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_drain_empty_registry() {
        let registry = Arc::new(ConnectionRegistry::default());
        let coordinator = ShutdownCoordinator::new(registry, Duration::from_secs(5));

        assert_eq!(
            coordinator.drain().await,
            ShutdownOutcome::Graceful {
                closed: 0,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_drain_sends_normal_closure() {
        let registry = Arc::new(ConnectionRegistry::new(HubConfig::default()));
        let sink = RecordingSink::default();
        let (handle, queue) = ConnectionHandle::new();
        registry.register(handle.clone()).await.unwrap();
        let _writer = spawn_writer(handle, queue, sink.clone(), Arc::clone(&registry));

        let coordinator = ShutdownCoordinator::new(Arc::clone(&registry), Duration::from_secs(5));
        let outcome = coordinator.drain().await;

        assert!(outcome.is_graceful());
        assert_eq!(
            sink.frames.lock().unwrap().last(),
            Some(&Frame::Close {
                code: NORMAL_CLOSURE,
                reason: SHUTDOWN_REASON.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_late_connection_refused_after_drain() {
        let registry = Arc::new(ConnectionRegistry::default());
        let coordinator = ShutdownCoordinator::new(Arc::clone(&registry), Duration::from_secs(5));
        assert!(coordinator.drain().await.is_graceful());

        let (late, _queue) = ConnectionHandle::new();
        assert_eq!(registry.register(late).await, Err(HubError::ShuttingDown));
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_drain_counts_dead_connection_as_failed() {
        let registry = Arc::new(ConnectionRegistry::default());
        let (handle, queue) = ConnectionHandle::new();
        registry.register(handle).await.unwrap();
        drop(queue);

        let coordinator = ShutdownCoordinator::new(registry, Duration::from_secs(5));
        assert_eq!(
            coordinator.drain().await,
            ShutdownOutcome::Graceful {
                closed: 0,
                failed: 1
            }
        );
    }
}
