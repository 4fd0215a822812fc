//! The external API facade (spec §1: "thin request/response API facade";
//! spec §6 configuration knobs). Every call here is a synchronous
//! request: send a [`mlag_proto::Command`] over the reactor's command
//! channel, wake the poll loop, and for query-style calls block on a
//! paired reply channel the same way the teacher's `fsm::Command`
//! variants carry their own `chan::Sender<T>`.
use std::net::Ipv4Addr;

use mlag_common::ids::IplId;
use mlag_net::WakeHandle;
use mlag_proto::{Command, CoreSnapshot};

use crate::error::{FacadeError, Result};

/// A handle to a running core. Cheap to clone; every clone shares the same
/// command channel and wake handle, so any number of callers (CLI, control
/// socket, tests) can drive the same core concurrently.
#[derive(Clone)]
pub struct Handle {
    commands: crossbeam_channel::Sender<Command>,
    waker: WakeHandle,
}

impl Handle {
    /// Wrap an existing command sender/waker pair. `mlag-node` constructs
    /// these from the same channel/`Reactor::waker()` it hands to the
    /// dispatcher thread.
    pub fn new(commands: crossbeam_channel::Sender<Command>, waker: WakeHandle) -> Self {
        Self { commands, waker }
    }

    fn post(&self, cmd: Command) -> Result<()> {
        self.commands
            .send(cmd)
            .map_err(|_| FacadeError(mlag_common::error::Error::precondition("core not running")))?;
        self.waker
            .wake()
            .map_err(|e| FacadeError(mlag_common::error::Error::Io(e.to_string())))
    }

    /// Bring the core up (spec §4.7 `Start`).
    pub fn start(&self) -> Result<()> {
        self.post(Command::Start)
    }

    /// Tear the core down (spec §4.7 `Stop`).
    pub fn stop(&self) -> Result<()> {
        self.post(Command::Stop)
    }

    /// Add a peer by its IPL ip.
    pub fn peer_add(&self, ip: Ipv4Addr) -> Result<()> {
        self.post(Command::PeerAdd(ip))
    }

    /// Remove a peer by its IPL ip.
    pub fn peer_delete(&self, ip: Ipv4Addr) -> Result<()> {
        self.post(Command::PeerDelete(ip))
    }

    /// Set the local and/or peer IPL-ip configuration.
    pub fn config_change(&self, my_ip: Option<Ipv4Addr>, peer_ip: Option<Ipv4Addr>) -> Result<()> {
        self.post(Command::ConfigChange { my_ip, peer_ip })
    }

    /// Set the reload-delay window, in milliseconds (spec §6: `0..=300_000`;
    /// out-of-range values are rejected by the manager, not here).
    pub fn set_reload_delay_ms(&self, ms: u32) -> Result<()> {
        self.post(Command::SetReloadDelayMs(ms))
    }

    /// Delete an IPL.
    pub fn ipl_delete(&self, id: IplId) -> Result<()> {
        self.post(Command::IplDelete(id))
    }

    /// Create a new IPL, blocking for its allocated id.
    pub fn ipl_create(&self) -> Result<IplId> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.post(Command::IplCreate(reply_tx))?;
        reply_rx
            .recv()
            .map_err(|_| FacadeError(mlag_common::error::Error::precondition("core shut down before replying")))?
            .map_err(FacadeError)
    }

    /// Read a point-in-time snapshot of manager state, blocking for the
    /// reply.
    pub fn snapshot(&self) -> Result<CoreSnapshot> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.post(Command::GetSnapshot(reply_tx))?;
        reply_rx
            .recv()
            .map_err(|_| FacadeError(mlag_common::error::Error::precondition("core shut down before replying")))
    }
}
