//! Pure debouncing / edge-detection state machine for one tool-path.
//!
//! [`detect`] is a pure function of (current [`PathState`], incoming [`ToolId`])
//! that returns the next state and an optional [`ToolChangeEvent`]. It holds no
//! references and performs no I/O, so it needs no locking: the owning poller
//! task is the only writer of the `PathState` it mutates.

use super::ids::ToolId;
use super::path_state::{PathState, ToolChangeEvent};

/// Result of feeding one read through the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOutcome {
    pub event: Option<ToolChangeEvent>,
}

/// Apply one incoming read to `state`, given a debounce threshold `n >= 1`.
///
/// `state` is mutated in place to the next state; the returned value carries
/// any tool-change event this read confirmed.
pub fn detect(state: &mut PathState, incoming: ToolId, n: u32) -> DetectOutcome {
    debug_assert!(n >= 1, "debounce threshold must be at least 1");

    if Some(incoming) == state.stable {
        // No pending change: this is the steady-state case.
        state.last_read = Some(incoming);
        state.run_length = 0;
        return DetectOutcome { event: None };
    }

    if Some(incoming) == state.last_read {
        state.run_length += 1;
        if state.run_length >= n {
            let event = state.stable.map(|previous| ToolChangeEvent {
                path: state.path,
                previous,
                current: incoming,
            });
            state.stable = Some(incoming);
            state.run_length = 0;
            return DetectOutcome { event };
        }
        return DetectOutcome { event: None };
    }

    // Different from both stable and the last read: a new run begins.
    state.last_read = Some(incoming);
    state.run_length = 1;
    DetectOutcome { event: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::PathId;

    fn path() -> PathId {
        PathId(1)
    }

    fn feed(state: &mut PathState, reads: &[ToolId], n: u32) -> Vec<ToolChangeEvent> {
        reads
            .iter()
            .filter_map(|&r| detect(state, r, n).event)
            .collect()
    }

    // Scenario 1: initial-then-change. 5,5,5,12,12 with N=2.
    #[test]
    fn initial_then_change() {
        let mut state = PathState::new(path());
        let events = feed(&mut state, &[5, 5, 5, 12, 12], 2);
        assert_eq!(
            events,
            vec![ToolChangeEvent {
                path: path(),
                previous: 5,
                current: 12
            }]
        );
        assert_eq!(state.stable, Some(12));
        assert_eq!(state.run_length, 0);
    }

    // Scenario 2 / P5: flicker suppressed, stable=5, reads 7,5,7,5,7,5.
    #[test]
    fn flicker_rejection() {
        let mut state = PathState::new(path());
        state.stable = Some(5);
        let events = feed(&mut state, &[7, 5, 7, 5, 7, 5], 2);
        assert!(events.is_empty());
        assert_eq!(state.stable, Some(5));
        assert_eq!(state.run_length, 0);
    }

    // Scenario 3 / P2: two transitions in order, stable=5, reads 12,12,8,8.
    #[test]
    fn two_transitions_in_order() {
        let mut state = PathState::new(path());
        state.stable = Some(5);
        let events = feed(&mut state, &[12, 12, 8, 8], 2);
        assert_eq!(
            events,
            vec![
                ToolChangeEvent { path: path(), previous: 5, current: 12 },
                ToolChangeEvent { path: path(), previous: 12, current: 8 },
            ]
        );
    }

    // P3: first confirmed value from an unset stable produces no event.
    #[test]
    fn no_initial_event() {
        let mut state = PathState::new(path());
        let events = feed(&mut state, &[9, 9], 2);
        assert!(events.is_empty());
        assert_eq!(state.stable, Some(9));
    }

    // P4: repeating the current stable value never emits and keeps run_length at 0.
    #[test]
    fn idempotent_stable() {
        let mut state = PathState::new(path());
        state.stable = Some(5);
        for _ in 0..10 {
            let outcome = detect(&mut state, 5, 2);
            assert_eq!(outcome.event, None);
            assert_eq!(state.run_length, 0);
        }
    }

    // P1: any tail-run shorter than N produces no event.
    #[test]
    fn no_premature_emission_below_threshold() {
        let mut state = PathState::new(path());
        state.stable = Some(5);
        // Only a single read of the new value - below the N=3 threshold.
        let events = feed(&mut state, &[9], 3);
        assert!(events.is_empty());
        assert_eq!(state.run_length, 1);
    }

    // P7: operating on independent PathState instances never cross-contaminates.
    #[test]
    fn path_independence() {
        let mut p1 = PathState::new(PathId(1));
        let mut p2 = PathState::new(PathId(2));
        p1.stable = Some(5);
        p2.stable = Some(10);

        let p1_events = feed(&mut p1, &[12, 12], 2);
        assert_eq!(p1_events.len(), 1);
        assert_eq!(p1_events[0].path, PathId(1));

        // p2 untouched by p1's reads.
        assert_eq!(p2.stable, Some(10));
        assert_eq!(p2.run_length, 0);

        let p2_events = feed(&mut p2, &[10, 10, 10], 2);
        assert!(p2_events.is_empty());
    }

    #[test]
    fn higher_threshold_requires_more_confirmations() {
        let mut state = PathState::new(path());
        state.stable = Some(5);
        // Flicker: 7,5,7 then stable run of two more 7s.
        let events = feed(&mut state, &[7, 5, 7, 7, 7], 3);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].current, 7);
    }
}
