//! Per-machine monitoring: connection supervision, path polling, heartbeats.

pub mod heartbeat;
pub mod machine;
pub mod poller;
pub mod supervisor;

pub use machine::{MachineConfig, MachineMonitor};
