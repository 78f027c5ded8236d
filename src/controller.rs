//! Controller client implementations.
//!
//! The monitoring core only ever depends on [`crate::core::ControllerClient`].
//! This module provides the two concrete collaborators selected by the
//! service layer: a simulated client for development, and a dedicated-worker
//! client that models the thread-affinity contract a native CNC library
//! would impose on a real implementation.

pub mod simulated;
pub mod worker;

pub use simulated::SimulatedController;
pub use worker::WorkerController;
