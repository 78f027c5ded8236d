//! Simulated controller client for development and testing.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::core::ids::{MachineId, PathId, ToolId};
use crate::core::traits::{ConnectionState, ControllerClient};

const DEFAULT_TOOLS: [ToolId; 4] = [2000, 2100, 2220, 2400];

/// Simulated CNC client: no network I/O, drifts tool numbers occasionally and
/// injects connection/read failures at configurable rates.
pub struct SimulatedController {
    machine_id: MachineId,
    ip: String,
    connected: bool,
    state: ConnectionState,
    current_tools: HashMap<PathId, ToolId>,
    connect_fail_rate: f64,
    read_fail_rate: f64,
    tool_change_rate: f64,
}

impl SimulatedController {
    pub fn new(machine_id: MachineId, ip: impl Into<String>) -> Self {
        Self {
            machine_id,
            ip: ip.into(),
            connected: false,
            state: ConnectionState::Disconnected,
            current_tools: HashMap::new(),
            connect_fail_rate: 0.1,
            read_fail_rate: 0.0,
            tool_change_rate: 0.05,
        }
    }

    /// Override the simulated connection failure rate (0.0 to 1.0).
    pub fn with_connect_fail_rate(mut self, rate: f64) -> Self {
        self.connect_fail_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Override the simulated read failure rate (0.0 to 1.0).
    pub fn with_read_fail_rate(mut self, rate: f64) -> Self {
        self.read_fail_rate = rate.clamp(0.0, 1.0);
        self
    }
}

#[async_trait]
impl ControllerClient for SimulatedController {
    async fn connect(&mut self) -> bool {
        self.state = ConnectionState::Connecting;
        info!(machine = %self.machine_id, ip = %self.ip, "simulating connection");
        sleep(Duration::from_millis(100)).await;

        if rand::rng().random_bool(self.connect_fail_rate) {
            warn!(machine = %self.machine_id, "simulated connection failure");
            self.state = ConnectionState::Error;
            self.connected = false;
            return false;
        }

        self.connected = true;
        self.state = ConnectionState::Connected;
        info!(machine = %self.machine_id, "simulated connection successful");
        true
    }

    async fn disconnect(&mut self) {
        if self.connected {
            info!(machine = %self.machine_id, "simulating disconnection");
            sleep(Duration::from_millis(50)).await;
        }
        self.connected = false;
        self.state = ConnectionState::Disconnected;
    }

    async fn read_tool(&mut self, path: PathId) -> Option<ToolId> {
        if !self.connected {
            return None;
        }

        sleep(Duration::from_millis(10)).await;

        if rand::rng().random_bool(self.read_fail_rate) {
            warn!(machine = %self.machine_id, %path, "simulated read failure");
            return None;
        }

        let current = *self.current_tools.entry(path).or_insert(DEFAULT_TOOLS[0]);

        let next = if rand::rng().random_bool(self.tool_change_rate) {
            let candidate = DEFAULT_TOOLS
                .iter()
                .copied()
                .filter(|t| *t != current)
                .collect::<Vec<_>>();
            let idx = rand::rng().random_range(0..candidate.len());
            let new_tool = candidate[idx];
            debug!(machine = %self.machine_id, %path, from = current, to = new_tool, "simulated tool change");
            new_tool
        } else {
            current
        };

        self.current_tools.insert(path, next);
        Some(next)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_when_failure_rate_is_zero() {
        let mut client = SimulatedController::new(MachineId::new("m1"), "10.0.0.1")
            .with_connect_fail_rate(0.0);
        assert!(client.connect().await);
        assert!(client.is_connected());
        assert_eq!(client.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn never_connects_when_failure_rate_is_one() {
        let mut client = SimulatedController::new(MachineId::new("m1"), "10.0.0.1")
            .with_connect_fail_rate(1.0);
        assert!(!client.connect().await);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn read_tool_fails_when_not_connected() {
        let mut client = SimulatedController::new(MachineId::new("m1"), "10.0.0.1");
        assert_eq!(client.read_tool(PathId(1)).await, None);
    }

    #[tokio::test]
    async fn read_tool_returns_a_value_once_connected() {
        let mut client = SimulatedController::new(MachineId::new("m1"), "10.0.0.1")
            .with_connect_fail_rate(0.0);
        client.connect().await;
        let tool = client.read_tool(PathId(1)).await;
        assert!(tool.is_some());
    }

    #[tokio::test]
    async fn forced_read_failures_always_return_none() {
        let mut client = SimulatedController::new(MachineId::new("m1"), "10.0.0.1")
            .with_connect_fail_rate(0.0)
            .with_read_fail_rate(1.0);
        client.connect().await;
        for _ in 0..5 {
            assert_eq!(client.read_tool(PathId(1)).await, None);
        }
    }
}
