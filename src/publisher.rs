//! Bus publisher implementations.
//!
//! The monitoring core only depends on [`crate::core::BusPublisher`]. This
//! module provides the real MQTT-backed implementation selected by the
//! service layer in production.

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttPublisher, MqttPublisherConfig};
