//! Connection session supervisor.
//!
//! Owns reconnect/backoff for one machine's controller client. It is the
//! sole writer of the shared connection flag; pollers and the heartbeat
//! emitter only read it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::ids::MachineId;
use crate::core::traits::ControllerClient;

/// Backoff parameters for the reconnect loop.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Runs the connection supervision loop until cancelled.
///
/// Loop: while connected, sleep ~1s and recheck. While disconnected, attempt
/// `connect()`; on success reset the backoff to `min_delay`, on failure sleep
/// `delay * jitter` (jitter uniform in [0.8, 1.2]) and double `delay`, capped
/// at `max_delay`.
pub async fn run(
    machine_id: MachineId,
    client: Arc<Mutex<Box<dyn ControllerClient>>>,
    connected: Arc<AtomicBool>,
    backoff: BackoffConfig,
    cancel: CancellationToken,
) {
    let mut delay = backoff.min_delay;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        if connected.load(Ordering::SeqCst) {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                _ = cancel.cancelled() => return,
            }
            continue;
        }

        info!(machine = %machine_id, "attempting controller connection");
        let ok = {
            let mut guard = client.lock().await;
            guard.connect().await
        };

        if ok {
            connected.store(true, Ordering::SeqCst);
            delay = backoff.min_delay;
            info!(machine = %machine_id, "controller connection established");
        } else {
            connected.store(false, Ordering::SeqCst);
            let jitter = rand::rng().random_range(0.8..=1.2);
            let jittered = delay.mul_f64(jitter).min(backoff.max_delay);
            warn!(machine = %machine_id, delay_ms = jittered.as_millis() as u64, "controller connection failed, retrying");
            tokio::select! {
                _ = tokio::time::sleep(jittered) => {}
                _ = cancel.cancelled() => return,
            }
            delay = delay.saturating_mul(2).min(backoff.max_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let backoff = BackoffConfig {
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        };
        let mut delay = backoff.min_delay;
        for _ in 0..10 {
            delay = delay.saturating_mul(2).min(backoff.max_delay);
        }
        assert_eq!(delay, backoff.max_delay);
        assert!(delay >= backoff.min_delay);
    }
}
