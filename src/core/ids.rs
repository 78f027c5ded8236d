//! Identifier types for machines, paths, and tools.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque machine identifier, unique per configured controller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineId(String);

impl MachineId {
    /// Wrap a raw string as a machine identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MachineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MachineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Small positive integer identifying one tool-path on a machine (typically 1 or 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(pub u32);

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PathId {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

/// Signed tool identifier read from the controller's register.
///
/// The wire value is a decimal fixed-point number (`mcr_val / 10^dec_val`);
/// the detector only ever sees the value after it has been rounded
/// half-away-from-zero to the nearest integer.
pub type ToolId = i64;

/// Round a fixed-point register value to the nearest integer, ties away from zero.
///
/// `dec_val == 0` means the register is already integral.
pub fn round_register(mcr_val: i32, dec_val: u32) -> ToolId {
    if dec_val == 0 {
        return mcr_val as ToolId;
    }
    let scale = 10f64.powi(dec_val as i32);
    let value = mcr_val as f64 / scale;
    round_half_away_from_zero(value)
}

/// `f64::round` already rounds halves away from zero, but we keep this named
/// wrapper so the rounding rule is explicit at the call site and independently
/// testable against non-register floats (e.g. values the publisher formats).
fn round_half_away_from_zero(value: f64) -> ToolId {
    if value >= 0.0 {
        (value + 0.5).floor() as ToolId
    } else {
        (value - 0.5).ceil() as ToolId
    }
}
