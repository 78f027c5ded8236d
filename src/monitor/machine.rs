//! Machine monitor: owns one controller session and its path pollers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::ids::{MachineId, PathId};
use crate::core::path_state::PathState;
use crate::core::traits::{BusPublisher, ControllerClient};
use crate::monitor::supervisor::BackoffConfig;
use crate::monitor::{heartbeat, poller, supervisor};

/// Static configuration for one monitored machine.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub machine_id: MachineId,
    pub ip: String,
    pub port: u16,
    pub monitored_paths: Vec<PathId>,
    pub poll_interval: Duration,
    pub debounce_consecutive_reads: u32,
    pub heartbeat_interval: Duration,
    pub backoff: BackoffConfig,
}

/// Owns the PathStates, the connection supervisor task, one poller task per
/// path, and the heartbeat task for a single machine.
///
/// `start` brings all four up; `stop` cancels all of them, awaits
/// completion, then disconnects the client. `stop` is idempotent and safe
/// even if `start` was never called or failed partway through.
pub struct MachineMonitor {
    config: MachineConfig,
    client: Arc<Mutex<Box<dyn ControllerClient>>>,
    publisher: Arc<dyn BusPublisher>,
    connected: Arc<AtomicBool>,
    path_states: Vec<Arc<RwLock<PathState>>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl MachineMonitor {
    pub fn new(
        config: MachineConfig,
        client: Box<dyn ControllerClient>,
        publisher: Arc<dyn BusPublisher>,
    ) -> Self {
        let path_states = config
            .monitored_paths
            .iter()
            .map(|&path| Arc::new(RwLock::new(PathState::new(path))))
            .collect();

        Self {
            config,
            client: Arc::new(Mutex::new(client)),
            publisher,
            connected: Arc::new(AtomicBool::new(false)),
            path_states,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Start the supervisor, heartbeat, and one poller per monitored path.
    pub async fn start(&mut self) {
        if !self.tasks.is_empty() {
            return;
        }

        info!(machine = %self.config.machine_id, paths = self.config.monitored_paths.len(), "machine monitor starting");

        self.cancel = CancellationToken::new();

        self.tasks.push(tokio::spawn(supervisor::run(
            self.config.machine_id.clone(),
            self.client.clone(),
            self.connected.clone(),
            self.config.backoff,
            self.cancel.clone(),
        )));

        self.tasks.push(tokio::spawn(heartbeat::run(
            self.config.machine_id.clone(),
            self.config.ip.clone(),
            self.connected.clone(),
            self.path_states.clone(),
            self.publisher.clone(),
            self.config.heartbeat_interval,
            self.cancel.clone(),
        )));

        for (&path, state) in self.config.monitored_paths.iter().zip(&self.path_states) {
            self.tasks.push(tokio::spawn(poller::run(
                self.config.machine_id.clone(),
                self.config.ip.clone(),
                path,
                self.client.clone(),
                self.connected.clone(),
                self.publisher.clone(),
                state.clone(),
                self.config.poll_interval,
                self.config.debounce_consecutive_reads,
                self.cancel.clone(),
            )));
        }
    }

    /// Cancel every task, await completion, then disconnect the client.
    /// Safe to call multiple times and safe even if `start` was never
    /// called.
    pub async fn stop(&mut self) {
        self.cancel.cancel();

        for task in self.tasks.drain(..) {
            let _ = task.await;
        }

        let mut client = self.client.lock().await;
        client.disconnect().await;
        self.connected.store(false, Ordering::SeqCst);

        info!(machine = %self.config.machine_id, "machine monitor stopped");
    }

    pub fn machine_id(&self) -> &MachineId {
        &self.config.machine_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SimulatedController;
    use crate::core::traits::HeartbeatSnapshot;
    use async_trait::async_trait;

    struct NullPublisher;

    #[async_trait]
    impl BusPublisher for NullPublisher {
        async fn publish_tool_change(
            &self,
            _machine: &str,
            _path: PathId,
            _ip: &str,
            _previous: i64,
            _current: i64,
        ) -> bool {
            true
        }

        async fn publish_error(&self, _machine: &str, _path: PathId, _ip: &str, _message: &str) -> bool {
            true
        }

        async fn publish_heartbeat(&self, _machine: &str, _ip: &str, _snapshot: &HeartbeatSnapshot) -> bool {
            true
        }
    }

    fn test_config() -> MachineConfig {
        MachineConfig {
            machine_id: MachineId::new("m1"),
            ip: "10.0.0.1".to_string(),
            port: 8193,
            monitored_paths: vec![PathId(1), PathId(2)],
            poll_interval: Duration::from_millis(10),
            debounce_consecutive_reads: 2,
            heartbeat_interval: Duration::from_millis(50),
            backoff: BackoffConfig {
                min_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(100),
            },
        }
    }

    #[tokio::test]
    async fn start_and_stop_is_clean_and_idempotent() {
        let client = Box::new(
            SimulatedController::new(MachineId::new("m1"), "10.0.0.1").with_connect_fail_rate(0.0),
        );
        let mut monitor = MachineMonitor::new(test_config(), client, Arc::new(NullPublisher));

        monitor.start().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        monitor.stop().await;
        // Stopping twice must not panic or hang.
        monitor.stop().await;
    }
}
