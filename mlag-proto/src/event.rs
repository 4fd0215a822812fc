//! System events and external commands (spec §4.3, §9 "Opcode tables").
//!
//! The source multiplexes two parallel integer-opcode tables (system
//! events, peer IBC messages) through a runtime command DB. Per the
//! REDESIGN FLAGS this becomes one typed sum type per table: unknown
//! opcodes are a distinct variant rather than a lookup miss, and each
//! variant already carries its decoded payload.
use std::fmt;
use std::net::Ipv4Addr;

use mlag_common::ids::LocalPeerIndex;

use crate::election::PeerHealth;
use crate::hal::StopBit;
use crate::peering::SyncKind;
use crate::wire::Message;

/// Everything the dispatcher can post to itself or receive from a
/// collaborator (spec §4.3: "external collaborators post system events
/// into C3"). Inbound peer messages are re-posted as `MessageReceived`
/// so every transition runs on the dispatcher thread (spec §5).
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Bring the core up.
    Start,
    /// Tear the core down.
    Stop,
    /// A peer was added to the registry.
    PeerAdd(Ipv4Addr),
    /// A peer was removed from the registry.
    PeerDelete(Ipv4Addr),
    /// Local or peer IPL-ip configuration changed.
    ConfigChange {
        /// New local ip, if changed.
        my_ip: Option<Ipv4Addr>,
        /// New peer ip, if changed.
        peer_ip: Option<Ipv4Addr>,
    },
    /// The out-of-band keepalive reported a health change for a peer.
    PeerStatusChange {
        /// Which peer.
        peer_index: LocalPeerIndex,
        /// Its new health.
        health: PeerHealth,
    },
    /// The transport observed a live connection to a peer.
    PeerConnected(LocalPeerIndex),
    /// The transport observed a peer disconnect.
    PeerDisconnected(LocalPeerIndex),
    /// The reconnect timer fired for a peer (Slave role only).
    Reconnect(LocalPeerIndex),
    /// The reload-delay timer expired.
    ReloadDelayExpired,
    /// A module finished its per-peer sync.
    SyncArrived {
        /// Which peer.
        peer_index: LocalPeerIndex,
        /// Which module.
        kind: SyncKind,
    },
    /// A framed message arrived from a peer's transport socket.
    MessageReceived {
        /// Which peer sent it.
        peer_index: LocalPeerIndex,
        /// The decoded message.
        message: Message,
    },
    /// A collaborator replied to a stop request (spec §4.7).
    StopDone(StopBit),
    /// The dispatcher's high-priority shutdown source fired (spec §5).
    Deinit,
}

/// Requests crossing the external API facade (spec §1: "thin
/// request/response API facade"; spec §6 configuration knobs). The
/// facade (out of scope here) is responsible for validating these before
/// they reach the manager; the manager still re-validates ranges per
/// spec §7 ("rejected before any state change"). Query-style commands
/// carry a reply channel, the same shape `fsm::Command` uses for its
/// `chan::Sender<T>` variants.
#[derive(Clone)]
pub enum Command {
    /// Start the core.
    Start,
    /// Stop the core.
    Stop,
    /// Add a peer by its IPL ip.
    PeerAdd(Ipv4Addr),
    /// Remove a peer by its IPL ip.
    PeerDelete(Ipv4Addr),
    /// Create a new IPL, replying with its allocated id.
    IplCreate(crossbeam_channel::Sender<Result<mlag_common::ids::IplId, mlag_common::error::Error>>),
    /// Delete an IPL.
    IplDelete(mlag_common::ids::IplId),
    /// Set the local/peer IPL-ip configuration.
    ConfigChange {
        /// New local ip, if changed.
        my_ip: Option<Ipv4Addr>,
        /// New peer ip, if changed.
        peer_ip: Option<Ipv4Addr>,
    },
    /// Set the reload-delay, in milliseconds (`0..=300_000`, spec §6).
    SetReloadDelayMs(u32),
    /// Read a point-in-time snapshot of manager state.
    GetSnapshot(crossbeam_channel::Sender<crate::manager::CoreSnapshot>),
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::Stop => write!(f, "Stop"),
            Self::PeerAdd(ip) => write!(f, "PeerAdd({ip})"),
            Self::PeerDelete(ip) => write!(f, "PeerDelete({ip})"),
            Self::IplCreate(_) => write!(f, "IplCreate(..)"),
            Self::IplDelete(id) => write!(f, "IplDelete({id})"),
            Self::ConfigChange { my_ip, peer_ip } => {
                write!(f, "ConfigChange {{ my_ip: {my_ip:?}, peer_ip: {peer_ip:?} }}")
            }
            Self::SetReloadDelayMs(ms) => write!(f, "SetReloadDelayMs({ms})"),
            Self::GetSnapshot(_) => write!(f, "GetSnapshot(..)"),
        }
    }
}
