//! Per-path monitoring state.

use serde::{Deserialize, Serialize};

use super::ids::{PathId, ToolId};

/// Health status of a single monitored path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStatus {
    Ok,
    Error,
}

/// State owned by one monitored path. Constructed at monitor start, mutated
/// only by that path's own poller task, discarded on stop.
#[derive(Debug, Clone)]
pub struct PathState {
    pub path: PathId,
    /// Most recent raw read.
    pub last_read: Option<ToolId>,
    /// Last confirmed (debounced) value.
    pub stable: Option<ToolId>,
    /// Consecutive equal reads of `last_read` that differ from `stable`.
    pub run_length: u32,
    pub status: PathStatus,
    pub error_message: Option<String>,
    /// Epoch milliseconds of the last error event emitted for this path, 0 if none.
    pub last_error_emit_ms: i64,
}

impl PathState {
    /// Construct a fresh, unarmed path state.
    pub fn new(path: PathId) -> Self {
        Self {
            path,
            last_read: None,
            stable: None,
            run_length: 0,
            status: PathStatus::Ok,
            error_message: None,
            last_error_emit_ms: 0,
        }
    }
}

/// A confirmed tool-path transition, emitted exactly once per stable change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolChangeEvent {
    pub path: PathId,
    pub previous: ToolId,
    pub current: ToolId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_unarmed_and_ok() {
        let s = PathState::new(PathId(1));
        assert_eq!(s.stable, None);
        assert_eq!(s.last_read, None);
        assert_eq!(s.run_length, 0);
        assert_eq!(s.status, PathStatus::Ok);
        assert_eq!(s.error_message, None);
    }
}
