//! Per-path poller and error reporter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::detector::detect;
use crate::core::ids::{MachineId, PathId};
use crate::core::path_state::{PathState, PathStatus};
use crate::core::traits::{BusPublisher, ControllerClient};

const ERROR_RETHROTTLE: Duration = Duration::from_secs(60);
const DISCONNECTED_RETRY: Duration = Duration::from_millis(500);
const READ_FAILURE_MESSAGE: &str = "Failed to read tool";

/// Runs one path's poll/debounce/publish loop until cancelled.
///
/// `state` is shared with the heartbeat emitter (single writer - this
/// poller - multiple readers); each iteration holds the write lock only
/// long enough to apply one read's outcome.
pub async fn run(
    machine_id: MachineId,
    ip: String,
    path: PathId,
    client: Arc<Mutex<Box<dyn ControllerClient>>>,
    connected: Arc<AtomicBool>,
    publisher: Arc<dyn BusPublisher>,
    state: Arc<RwLock<PathState>>,
    poll_interval: Duration,
    debounce_n: u32,
    cancel: CancellationToken,
) {
    info!(machine = %machine_id, %path, poll_interval_ms = poll_interval.as_millis() as u64, "path poller started");

    loop {
        if cancel.is_cancelled() {
            return;
        }

        if !connected.load(Ordering::SeqCst) {
            tokio::select! {
                _ = sleep(DISCONNECTED_RETRY) => {}
                _ = cancel.cancelled() => return,
            }
            continue;
        }

        let read = {
            let mut guard = client.lock().await;
            guard.read_tool(path).await
        };

        match read {
            None => {
                let should_publish = {
                    let mut guard = state.write().await;
                    apply_read_error(&machine_id, &mut guard, READ_FAILURE_MESSAGE)
                };

                if should_publish {
                    publisher
                        .publish_error(machine_id.as_str(), path, &ip, READ_FAILURE_MESSAGE)
                        .await;
                }
            }
            Some(value) => {
                let mut guard = state.write().await;
                if clear_error_on_success(&mut guard) {
                    info!(machine = %machine_id, %path, "path recovered from error");
                }

                let outcome = detect(&mut guard, value, debounce_n);
                drop(guard);

                if let Some(event) = outcome.event {
                    info!(machine = %machine_id, %path, previous = event.previous, current = event.current, "tool change");
                    publisher
                        .publish_tool_change(
                            machine_id.as_str(),
                            path,
                            &ip,
                            event.previous,
                            event.current,
                        )
                        .await;
                }
            }
        }

        tokio::select! {
            _ = sleep(poll_interval) => {}
            _ = cancel.cancelled() => return,
        }
    }
}

/// Clear an ERROR path back to OK on a successful read. Returns whether a
/// recovery actually happened (for logging); never publishes anything - the
/// heartbeat is the only surface that reports recovery, per the error
/// reporter policy.
fn clear_error_on_success(state: &mut PathState) -> bool {
    if state.status == PathStatus::Error {
        state.status = PathStatus::Ok;
        state.error_message = None;
        true
    } else {
        false
    }
}

/// Apply one read failure to `state` and report whether the error reporter
/// policy requires publishing an error event for it. Synchronous and
/// lock-scoped: callers must drop the `PathState` write guard before acting
/// on the returned bool, so the lock is never held across the publish await.
fn apply_read_error(machine_id: &MachineId, state: &mut PathState, message: &str) -> bool {
    let now = chrono::Utc::now().timestamp_millis();

    if state.status == PathStatus::Ok {
        state.status = PathStatus::Error;
        state.error_message = Some(message.to_string());
        state.last_error_emit_ms = now;
        error!(machine = %machine_id, path = %state.path, message, "path entered error state");
        true
    } else {
        let elapsed = now - state.last_error_emit_ms;
        if elapsed >= ERROR_RETHROTTLE.as_millis() as i64 {
            state.last_error_emit_ms = now;
            debug!(machine = %machine_id, path = %state.path, "re-emitting throttled error");
            true
        } else {
            false
        }
    }
}
