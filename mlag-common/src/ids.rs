//! Identifier newtypes for the peer/topology data model (spec §3).
use std::fmt;

/// Maximum number of peers the registry can hold (spec §3: "N is a small
/// constant — typical 2"). Grounded on `original_source`'s `MLAG_MAX_PEERS`.
pub const MAX_PEERS: usize = 2;

/// Maximum number of IPLs the topology registry can hold.
pub const MAX_IPLS: usize = 4;

/// Local-node slot; always occupied, never deleted (spec §3 invariant 1).
pub const LOCAL_PEER_INDEX: LocalPeerIndex = LocalPeerIndex(0);

/// Index of a peer within the fixed-capacity peer table (`0..MAX_PEERS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalPeerIndex(pub usize);

impl fmt::Display for LocalPeerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protocol-level small integer (0 = Master, 1 = Slave), negotiated by the
/// master-election FSM. `INVALID` until assigned (original_source:
/// `INVALID_MLAG_PEER_ID` = 255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MlagId(pub u8);

impl MlagId {
    /// The sentinel value for "not yet assigned".
    pub const INVALID: MlagId = MlagId(255);
    /// The role id always held by the Master.
    pub const MASTER: MlagId = MlagId(0);
    /// The role id always held by the Slave.
    pub const SLAVE: MlagId = MlagId(1);

    /// Whether this id has been assigned.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for MlagId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for MlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}

/// 64-bit stable chassis identifier (typically a MAC address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SystemId(pub u64);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}

/// Identifier of an Inter-Peer Link record (`0..MAX_IPLS`). IPL id 0 is
/// always the redirect IPL (spec §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IplId(pub usize);

impl IplId {
    /// The IPL used to redirect overflow traffic; always id 0.
    pub const REDIRECT: IplId = IplId(0);
}

impl fmt::Display for IplId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
