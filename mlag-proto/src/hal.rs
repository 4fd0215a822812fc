//! The out-of-scope collaborators the core calls into but does not
//! implement: the hardware/forwarding driver ("HAL") and the per-feature
//! managers (FDB/MAC-sync, IGMP tunneling, LACP, L3) named only by
//! interface in spec §1/§6. Grounded on `fsm.rs`'s `Hooks` struct: a typed
//! rewrite of the source's "leak of C-era extensibility" callback style
//! (spec §9).
use std::fmt;
use std::sync::Arc;

use mlag_common::error::Result;
use mlag_common::ids::{IplId, LocalPeerIndex};

/// The hardware/forwarding driver calls the core makes (spec §6: "port
/// admin state set/get; port redirect set/get; port isolation
/// set/get/clear; VLAN membership add/remove; VLAN and port
/// operational-status triggers; L2 trap fd open/close and
/// register/unregister by trap-id; packet receive and loopback-ctrl
/// send").
pub trait HalDriver: Send + Sync {
    /// Set a port's admin (enable/disable) state.
    fn set_port_admin_state(&self, port_id: u32, up: bool) -> Result<()>;
    /// Read a port's admin state.
    fn port_admin_state(&self, port_id: u32) -> Result<bool>;
    /// Set (or clear, with `None`) the IPL a port redirects through.
    fn set_port_redirect(&self, port_id: u32, target_ipl: Option<IplId>) -> Result<()>;
    /// Read a port's redirect target, if any.
    fn port_redirect(&self, port_id: u32) -> Result<Option<IplId>>;
    /// Set a port's isolation flag.
    fn set_port_isolation(&self, port_id: u32, isolated: bool) -> Result<()>;
    /// Read a port's isolation flag.
    fn port_isolation(&self, port_id: u32) -> Result<bool>;
    /// Clear a port's isolation flag unconditionally.
    fn clear_port_isolation(&self, port_id: u32) -> Result<()>;
    /// Add a port to a VLAN's membership.
    fn add_vlan_member(&self, port_id: u32, vlan_id: u16) -> Result<()>;
    /// Remove a port from a VLAN's membership.
    fn remove_vlan_member(&self, port_id: u32, vlan_id: u16) -> Result<()>;
    /// Notify the driver of a VLAN operational-state change. The source
    /// marks this "temporary and next release considered obsolete"; the
    /// call is preserved per spec §9's open question.
    fn notify_vlan_state_change(&self, vlan_id: u16, up: bool);
    /// Notify the driver of a port operational-state change.
    fn notify_port_state_change(&self, port_id: u32, up: bool);
    /// Open the L2 trap fd for `trap_id`.
    fn open_trap(&self, trap_id: u32) -> Result<()>;
    /// Close the L2 trap fd for `trap_id`.
    fn close_trap(&self, trap_id: u32) -> Result<()>;
    /// Register `port_id` to receive `trap_id` traps.
    fn register_trap(&self, trap_id: u32, port_id: u32) -> Result<()>;
    /// Unregister `port_id` from `trap_id` traps.
    fn unregister_trap(&self, trap_id: u32, port_id: u32) -> Result<()>;
    /// Send a frame out the loopback-control path.
    fn send_loopback(&self, port_id: u32, buffer: &[u8]) -> Result<()>;
}

/// One bit of a `STOP_DONE` reply, identifying the replying subsystem
/// (spec §4.7 "start/stop barriers").
pub type StopBit = u32;

/// Start/stop/sync-done hooks for a per-feature manager (FDB/MAC-sync,
/// IGMP tunneling, LACP aggregator selection, L3-interface sync — spec
/// §1 "their internal algorithms are not part of this spec").
#[derive(Clone)]
pub struct ModuleHooks {
    /// Called when the manager starts a peer's sync for this module.
    pub on_start: Arc<dyn Fn(LocalPeerIndex) + Send + Sync>,
    /// Called when the manager tears down a peer's state for this module.
    /// Returns the `STOP_DONE` bit this module owns.
    pub on_stop: Arc<dyn Fn(LocalPeerIndex) -> StopBit + Send + Sync>,
}

impl fmt::Debug for ModuleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHooks").finish()
    }
}

impl Default for ModuleHooks {
    fn default() -> Self {
        Self {
            on_start: Arc::new(|_| {}),
            on_stop: Arc::new(|_| 0),
        }
    }
}

/// One [`ModuleHooks`] per synchronized subsystem, registered at manager
/// construction (spec §4.7 "stop() emits stop requests to each
/// collaborator").
#[derive(Clone, Default, Debug)]
pub struct Collaborators {
    /// Out-of-band keepalive / health signaling.
    pub health: ModuleHooks,
    /// IGMP snooping tunneling payload forwarding.
    pub igmp: ModuleHooks,
    /// FDB/MAC-sync.
    pub mac: ModuleHooks,
    /// LACP aggregator selection.
    pub lacp: ModuleHooks,
    /// L3-interface sync.
    pub l3: ModuleHooks,
}
