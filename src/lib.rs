//! # toolwatch
//!
//! Edge monitoring service that watches one or more CNC machine controllers
//! for tool-change events and publishes those events, together with periodic
//! health state, to an MQTT bus.
//!
//! ## Architecture
//!
//! - [`core`]: the pure monitoring engine - the debounce/edge-detection
//!   state machine, path and error state, and the two trait contracts
//!   (`ControllerClient`, `BusPublisher`) the rest of the crate implements
//!   against.
//! - [`monitor`]: the per-machine task graph built on those contracts -
//!   session supervisor, path pollers, heartbeat emitter, and the
//!   `MachineMonitor` that composes and owns them.
//! - [`controller`]: concrete `ControllerClient`s - a simulated client for
//!   development and a dedicated-worker-thread client modeling the
//!   thread-affinity contract a native CNC driver library would impose.
//! - [`publisher`]: the MQTT-backed `BusPublisher`.
//! - [`service`]: wires one publisher and one monitor per configured machine
//!   together and runs them until a shutdown signal.
//! - [`config`]: TOML configuration loading and validation.
//!
//! Collaborator selection (which controller client, which publisher) is a
//! service-layer concern; the core only ever depends on the trait contracts
//! in [`core::traits`].

pub mod config;
pub mod controller;
pub mod core;
pub mod monitor;
pub mod publisher;
pub mod service;

/// Convenient re-exports for consumers of the crate.
pub mod prelude {
    pub use crate::core::{
        BusPublisher, ConnectionState, ControllerClient, HeartbeatSnapshot, MachineId, PathId,
        PathState, PathStatus, ToolChangeEvent, ToolId,
    };
    pub use crate::monitor::{MachineConfig, MachineMonitor};
    pub use crate::service::Service;
}

pub use crate::service::Service;
