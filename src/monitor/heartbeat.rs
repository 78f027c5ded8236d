//! Periodic heartbeat emitter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::core::ids::MachineId;
use crate::core::path_state::PathState;
use crate::core::traits::{BusPublisher, HeartbeatSnapshot};

/// Publishes a heartbeat every `interval`, snapshotting the connection flag
/// and every path's status without mutating anything. Missed ticks are not
/// recovered - a slow publish simply delays the next sleep.
pub async fn run(
    machine_id: MachineId,
    ip: String,
    connected: Arc<AtomicBool>,
    paths: Vec<Arc<RwLock<PathState>>>,
    publisher: Arc<dyn BusPublisher>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = sleep(interval) => {}
            _ = cancel.cancelled() => return,
        }

        let mut statuses = Vec::with_capacity(paths.len());
        let mut errors = Vec::with_capacity(paths.len());
        for path_state in &paths {
            let guard = path_state.read().await;
            statuses.push((guard.path, guard.status));
            errors.push((guard.path, guard.error_message.clone()));
        }

        let snapshot = HeartbeatSnapshot {
            connected: connected.load(Ordering::SeqCst),
            per_path_status: statuses,
            per_path_errors: errors,
        };

        if !publisher
            .publish_heartbeat(machine_id.as_str(), &ip, &snapshot)
            .await
        {
            error!(machine = %machine_id, "heartbeat publish failed");
        }
    }
}
