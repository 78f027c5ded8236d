//! Top-level service: one publisher shared across one monitor per configured
//! machine, run until a shutdown signal arrives.

use std::sync::Arc;

use tracing::info;

use crate::core::traits::{BusPublisher, ControllerClient};
use crate::monitor::{MachineConfig, MachineMonitor};

/// Constructs one [`MachineMonitor`] per configured machine against a shared
/// publisher, starts them all, and stops them all on shutdown.
///
/// The publisher is shared because it must already be safe for concurrent
/// publish calls from many tasks (`BusPublisher: Send + Sync`); each monitor
/// only ever touches its own controller client and `PathState`s.
pub struct Service {
    publisher: Arc<dyn BusPublisher>,
    monitors: Vec<MachineMonitor>,
}

impl Service {
    /// Build a service from already-constructed per-machine clients. Callers
    /// (the CLI entry point) are responsible for picking the simulated or
    /// worker-thread controller client per `env` and wiring `machine_clients`
    /// in the same order as `machine_configs`.
    pub fn new(
        publisher: Arc<dyn BusPublisher>,
        machine_configs: Vec<MachineConfig>,
        machine_clients: Vec<Box<dyn ControllerClient>>,
    ) -> Self {
        assert_eq!(
            machine_configs.len(),
            machine_clients.len(),
            "one controller client is required per configured machine"
        );

        let monitors = machine_configs
            .into_iter()
            .zip(machine_clients)
            .map(|(config, client)| MachineMonitor::new(config, client, publisher.clone()))
            .collect();

        Self { publisher, monitors }
    }

    /// Start every machine monitor.
    pub async fn start(&mut self) {
        info!(machines = self.monitors.len(), "service starting");
        for monitor in &mut self.monitors {
            monitor.start().await;
        }
    }

    /// Run until `shutdown` resolves, then stop every monitor (order does not
    /// matter - each monitor's stop is independent) and drop the publisher.
    pub async fn run_until(mut self, shutdown: impl std::future::Future<Output = ()>) {
        self.start().await;
        shutdown.await;
        info!("shutdown signal received, stopping service");
        self.stop().await;
    }

    /// Stop every monitor, awaiting each one's tasks before returning. Safe
    /// to call even if some monitor never started.
    pub async fn stop(&mut self) {
        for monitor in &mut self.monitors {
            monitor.stop().await;
        }
        info!("service stopped");
    }
}

/// Waits for SIGINT or, on unix, SIGTERM - whichever arrives first.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SimulatedController;
    use crate::core::ids::{MachineId, PathId};
    use crate::core::traits::HeartbeatSnapshot;
    use crate::monitor::machine::MachineConfig as MonitorMachineConfig;
    use crate::monitor::supervisor::BackoffConfig;
    use async_trait::async_trait;
    use std::time::Duration;

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

    fn test_config(id: &str) -> MonitorMachineConfig {
        MonitorMachineConfig {
            machine_id: MachineId::new(id),
            ip: "10.0.0.1".to_string(),
            port: 8193,
            monitored_paths: vec![PathId(1)],
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
    async fn starts_and_stops_one_monitor_per_machine() {
        let publisher = Arc::new(NullPublisher);
        let configs = vec![test_config("m1"), test_config("m2")];
        let clients: Vec<Box<dyn ControllerClient>> = configs
            .iter()
            .map(|c| {
                Box::new(
                    SimulatedController::new(c.machine_id.clone(), c.ip.clone())
                        .with_connect_fail_rate(0.0),
                ) as Box<dyn ControllerClient>
            })
            .collect();

        let mut service = Service::new(publisher, configs, clients);
        service.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        service.stop().await;
    }

    #[tokio::test]
    #[should_panic(expected = "one controller client is required per configured machine")]
    async fn rejects_mismatched_client_count() {
        let publisher = Arc::new(NullPublisher);
        let configs = vec![test_config("m1"), test_config("m2")];
        let clients: Vec<Box<dyn ControllerClient>> = vec![Box::new(
            SimulatedController::new(MachineId::new("m1"), "10.0.0.1"),
        )];
        let _ = Service::new(publisher, configs, clients);
    }
}
