//! Dedicated-worker controller client.
//!
//! Models the thread-affinity contract a native CNC driver library imposes:
//! a connection handle obtained on one OS thread must only ever be used from
//! that same thread. We replicate the single-worker `ThreadPoolExecutor`
//! pattern by spawning one dedicated `std::thread` per machine and funneling
//! every `connect` / `read_tool` / `disconnect` call through a single-slot
//! command queue, FIFO, never processed concurrently.
//!
//! The actual native calls are behind [`RawSession`], the integration seam
//! for whatever vendor driver crate a deployment links against. No such
//! driver ships in this crate; [`RawSession`] has no implementation here
//! beyond what tests need.

use std::thread;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{error, warn};

use crate::core::ids::{MachineId, PathId, ToolId};
use crate::core::traits::{ConnectionState, ControllerClient};

/// Conservative per-call timeout so a hung native session cannot stall a
/// path poller indefinitely. The dedicated worker thread itself may still be
/// blocked inside the native call after this timeout fires; the timeout only
/// bounds how long the async caller waits for a reply.
const CALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Blocking, thread-affine session to a real controller. Implementations of
/// this trait are expected to make blocking native calls; all methods are
/// invoked from the single dedicated worker thread that owns the handle.
pub trait RawSession: Send {
    /// Establish the underlying connection. Blocking.
    fn connect(&mut self) -> bool;

    /// Tear down the underlying connection. Blocking, idempotent.
    fn disconnect(&mut self);

    /// Read the current tool identifier for one path. Blocking.
    fn read_tool(&mut self, path: PathId) -> Option<ToolId>;
}

enum Command {
    Connect(oneshot::Sender<bool>),
    Disconnect(oneshot::Sender<()>),
    ReadTool(PathId, oneshot::Sender<Option<ToolId>>),
    Shutdown,
}

/// Controller client that serializes all calls onto one dedicated OS thread.
pub struct WorkerController {
    machine_id: MachineId,
    tx: mpsc::Sender<Command>,
    worker: Option<thread::JoinHandle<()>>,
    connected: bool,
    state: ConnectionState,
}

impl WorkerController {
    /// Spawn the dedicated worker thread and wrap it in a `ControllerClient`.
    /// `session` is constructed on the calling thread but only ever touched
    /// from the worker thread from this point on.
    pub fn spawn(machine_id: MachineId, mut session: Box<dyn RawSession>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(1);
        let thread_name = format!("ctrl-{}", machine_id.as_str());

        let worker = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                while let Some(cmd) = rx.blocking_recv() {
                    match cmd {
                        Command::Connect(reply) => {
                            let ok = session.connect();
                            let _ = reply.send(ok);
                        }
                        Command::Disconnect(reply) => {
                            session.disconnect();
                            let _ = reply.send(());
                        }
                        Command::ReadTool(path, reply) => {
                            let value = session.read_tool(path);
                            let _ = reply.send(value);
                        }
                        Command::Shutdown => break,
                    }
                }
            })
            .expect("failed to spawn controller worker thread");

        Self {
            machine_id,
            tx,
            worker: Some(worker),
            connected: false,
            state: ConnectionState::Disconnected,
        }
    }

    async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(build(reply_tx)).await.is_err() {
            error!(machine = %self.machine_id, "controller worker thread is gone");
            return None;
        }
        match timeout(CALL_TIMEOUT, reply_rx).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(_)) => {
                error!(machine = %self.machine_id, "controller worker dropped reply channel");
                None
            }
            Err(_) => {
                warn!(machine = %self.machine_id, "controller call timed out");
                None
            }
        }
    }
}

impl Drop for WorkerController {
    fn drop(&mut self) {
        // Best-effort: if the channel is full or closed we let the thread
        // exit on its own once the sender side is fully dropped.
        let _ = self.tx.try_send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[async_trait]
impl ControllerClient for WorkerController {
    async fn connect(&mut self) -> bool {
        self.state = ConnectionState::Connecting;
        let ok = self.call(Command::Connect).await.unwrap_or(false);
        self.connected = ok;
        self.state = if ok {
            ConnectionState::Connected
        } else {
            ConnectionState::Error
        };
        ok
    }

    async fn disconnect(&mut self) {
        let _: Option<()> = self.call(Command::Disconnect).await;
        self.connected = false;
        self.state = ConnectionState::Disconnected;
    }

    async fn read_tool(&mut self, path: PathId) -> Option<ToolId> {
        if !self.connected {
            return None;
        }
        self.call(|reply| Command::ReadTool(path, reply))
            .await
            .flatten()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }
}

/// Placeholder [`RawSession`] for deployments that have not yet linked a
/// vendor driver crate (e.g. a FOCAS binding) into the build. `connect`
/// always fails; the supervisor's ordinary backoff loop handles that the
/// same way it handles any other connection failure, so the service still
/// runs end to end - it just never reaches `Connected` for this machine.
pub struct UnavailableSession;

impl RawSession for UnavailableSession {
    fn connect(&mut self) -> bool {
        false
    }

    fn disconnect(&mut self) {}

    fn read_tool(&mut self, _path: PathId) -> Option<ToolId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSession {
        tool: ToolId,
        fail_connect: bool,
    }

    impl RawSession for FakeSession {
        fn connect(&mut self) -> bool {
            !self.fail_connect
        }

        fn disconnect(&mut self) {}

        fn read_tool(&mut self, _path: PathId) -> Option<ToolId> {
            Some(self.tool)
        }
    }

    #[tokio::test]
    async fn connect_and_read_round_trip_through_the_worker_thread() {
        let session = Box::new(FakeSession {
            tool: 2000,
            fail_connect: false,
        });
        let mut client = WorkerController::spawn(MachineId::new("m1"), session);
        assert!(client.connect().await);
        assert_eq!(client.read_tool(PathId(1)).await, Some(2000));
        client.disconnect().await;
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn failed_connect_surfaces_as_error_state() {
        let session = Box::new(FakeSession {
            tool: 2000,
            fail_connect: true,
        });
        let mut client = WorkerController::spawn(MachineId::new("m1"), session);
        assert!(!client.connect().await);
        assert_eq!(client.connection_state(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn read_tool_before_connect_returns_none_without_touching_the_worker() {
        let session = Box::new(FakeSession {
            tool: 2000,
            fail_connect: false,
        });
        let mut client = WorkerController::spawn(MachineId::new("m1"), session);
        assert_eq!(client.read_tool(PathId(1)).await, None);
    }
}
