//! Collaborator contracts the monitoring core consumes.
//!
//! The core depends only on these traits, never on a concrete controller or
//! bus implementation. That lets the simulated controller and the real MQTT
//! publisher plug in identically at the service layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::ids::{PathId, ToolId};
use crate::core::path_state::PathStatus;

/// Connection state of a controller client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl ConnectionState {
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// A snapshot of one machine's health, taken by the heartbeat emitter.
///
/// Carries no behavior; it exists purely to cross the trait boundary from the
/// monitor's `MachineState` into a publisher call without exposing the
/// monitor's internal types.
#[derive(Debug, Clone)]
pub struct HeartbeatSnapshot {
    pub connected: bool,
    pub per_path_status: Vec<(PathId, PathStatus)>,
    pub per_path_errors: Vec<(PathId, Option<String>)>,
}

/// Contract for reading a machine's current tool identifiers.
///
/// Implementations backed by a native library that binds a handle to the
/// calling OS thread must ensure every call for a given machine - `connect`,
/// `read_tool`, `disconnect` - executes on the same dedicated worker thread.
/// The monitor serializes calls per machine and pins them to a single
/// worker; it never calls this trait concurrently for the same machine.
#[async_trait]
pub trait ControllerClient: Send + Sync {
    /// Establish a connection. Idempotent: calling while already connected is
    /// a no-op success. Never panics; failures are reported via the return
    /// value, not via unwinding.
    async fn connect(&mut self) -> bool;

    /// Tear down the connection. Idempotent.
    async fn disconnect(&mut self);

    /// Read the current tool identifier for one path. Returns `None` on any
    /// failure (timeout, bad response, not connected). Must not block
    /// meaningfully longer than one poll interval in the common case.
    async fn read_tool(&mut self, path: PathId) -> Option<ToolId>;

    /// Whether the client currently believes it is connected.
    fn is_connected(&self) -> bool;

    /// Current connection state, for diagnostics and heartbeats.
    fn connection_state(&self) -> ConnectionState;
}

/// Contract for publishing monitoring events to the message bus.
///
/// The core never blocks the monitoring loop waiting on the bus: a
/// disconnected publisher returns `false` and the caller drops the message.
#[async_trait]
pub trait BusPublisher: Send + Sync {
    /// Publish a confirmed tool change. At-least-once delivery is expected
    /// of the implementation (QoS 1 over MQTT); this call itself is
    /// best-effort from the core's point of view.
    async fn publish_tool_change(
        &self,
        machine: &str,
        path: PathId,
        ip: &str,
        previous: ToolId,
        current: ToolId,
    ) -> bool;

    /// Publish a path error (read failure). Same durability expectations as
    /// `publish_tool_change`.
    async fn publish_error(&self, machine: &str, path: PathId, ip: &str, message: &str) -> bool;

    /// Publish a heartbeat snapshot. Fire-and-forget; QoS 0 is sufficient.
    async fn publish_heartbeat(&self, machine: &str, ip: &str, snapshot: &HeartbeatSnapshot) -> bool;
}
