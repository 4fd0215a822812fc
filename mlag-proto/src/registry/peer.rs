//! The peer registry (spec §4.1, component C1): the identifier translation
//! layer between IPv4 address, local peer index, mlag_id, and system_id.
//!
//! Per REDESIGN FLAGS (spec §9, "Peer registry"), this has a single owner
//! (the mlag dispatcher thread, via `manager::Core`) instead of the
//! original's reader/writer lock plus spinlock pair; cross-thread readers
//! take a [`PeerSnapshot`] instead of a shared lock.
use std::net::Ipv4Addr;

use mlag_common::error::{Error, Result};
use mlag_common::ids::{IplId, LocalPeerIndex, MlagId, SystemId, LOCAL_PEER_INDEX, MAX_PEERS};

/// One slot in the registry. A slot is occupied iff `peer_ip` is non-zero
/// (spec §3 invariant 4); index 0 ("self") may have a zero `peer_ip` before
/// local configuration (spec §3 invariant 1).
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerRecord {
    /// IPv4 address of the peer's IPL interface. Zero means "empty".
    pub peer_ip: Ipv4Addr,
    /// Protocol role id, `MlagId::INVALID` until assigned.
    pub mlag_id: MlagId,
    /// 64-bit chassis identifier advertised by this peer.
    pub system_id: SystemId,
    /// Which IPL this peer sits on.
    pub ipl_id: IplId,
}

impl PeerRecord {
    fn occupied(&self) -> bool {
        !self.peer_ip.is_unspecified()
    }
}

/// A point-in-time copy of every occupied slot, for cross-thread readers
/// (spec §5: "the tunneling thread ... shares ... the peer registry
/// (read-only)").
#[derive(Debug, Clone, Default)]
pub struct PeerSnapshot {
    /// `(index, record)` for every occupied slot, in index order.
    pub peers: Vec<(LocalPeerIndex, PeerRecord)>,
}

/// The fixed-capacity peer table.
#[derive(Debug)]
pub struct PeerRegistry {
    slots: [PeerRecord; MAX_PEERS],
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self {
            slots: [PeerRecord::default(); MAX_PEERS],
        }
    }
}

impl PeerRegistry {
    /// Construct an empty registry (index 0 reserved, unconfigured).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or find) the peer at `peer_ip`. Index 0 ("self") is matched
    /// first; otherwise the lowest-index empty slot in `1..MAX_PEERS` is
    /// used. Re-adding an already-present ip returns its existing index,
    /// not an error (spec §4.1).
    pub fn add(&mut self, peer_ip: Ipv4Addr) -> Result<LocalPeerIndex> {
        if peer_ip == self.slots[0].peer_ip && !peer_ip.is_unspecified() {
            return Ok(LOCAL_PEER_INDEX);
        }
        for (i, slot) in self.slots.iter().enumerate().skip(1) {
            if slot.peer_ip == peer_ip {
                return Ok(LocalPeerIndex(i));
            }
        }
        for (i, slot) in self.slots.iter_mut().enumerate().skip(1) {
            if !slot.occupied() {
                slot.peer_ip = peer_ip;
                return Ok(LocalPeerIndex(i));
            }
        }
        Err(Error::Full(format!(
            "peer registry at capacity ({MAX_PEERS} slots)"
        )))
    }

    /// Remove the peer at `peer_ip`. Index 0 is never deleted by this call
    /// (spec §4.1).
    pub fn delete(&mut self, peer_ip: Ipv4Addr) -> Result<()> {
        for slot in self.slots.iter_mut().skip(1) {
            if slot.peer_ip == peer_ip {
                *slot = PeerRecord::default();
                return Ok(());
            }
        }
        Err(Error::not_found(format!("peer ip {peer_ip}")))
    }

    /// Find the local index of `peer_ip`.
    pub fn local_index_of(&self, peer_ip: Ipv4Addr) -> Result<LocalPeerIndex> {
        self.slots
            .iter()
            .position(|s| s.occupied() && s.peer_ip == peer_ip)
            .map(LocalPeerIndex)
            .ok_or_else(|| Error::not_found(format!("peer ip {peer_ip}")))
    }

    /// Find the mlag_id of `peer_ip`.
    pub fn mlag_id_of(&self, peer_ip: Ipv4Addr) -> Result<MlagId> {
        self.local_index_of(peer_ip).map(|i| self.slots[i.0].mlag_id)
    }

    /// Find the peer_ip bound to `local_index`.
    pub fn peer_ip_of_index(&self, local_index: LocalPeerIndex) -> Result<Ipv4Addr> {
        self.slot(local_index).map(|s| s.peer_ip)
    }

    /// Find the peer_ip for `mlag_id`.
    pub fn peer_ip_of_mlag_id(&self, mlag_id: MlagId) -> Result<Ipv4Addr> {
        self.slots
            .iter()
            .find(|s| s.occupied() && s.mlag_id == mlag_id)
            .map(|s| s.peer_ip)
            .ok_or_else(|| Error::not_found(format!("mlag_id {mlag_id}")))
    }

    /// Find the local index carrying `system_id`.
    pub fn local_index_of_system_id(&self, system_id: SystemId) -> Result<LocalPeerIndex> {
        self.slots
            .iter()
            .position(|s| s.occupied() && s.system_id == system_id)
            .map(LocalPeerIndex)
            .ok_or_else(|| Error::not_found(format!("system_id {system_id}")))
    }

    /// The mlag_id bound to `local_index`.
    pub fn mlag_id_of_index(&self, local_index: LocalPeerIndex) -> Result<MlagId> {
        self.slot(local_index).map(|s| s.mlag_id)
    }

    /// The system_id bound to `local_index`.
    pub fn system_id_of(&self, local_index: LocalPeerIndex) -> Result<SystemId> {
        self.slot(local_index).map(|s| s.system_id)
    }

    /// Bind `mlag_id` to the peer at `peer_ip`.
    pub fn set_mlag_id(&mut self, peer_ip: Ipv4Addr, mlag_id: MlagId) -> Result<()> {
        let index = self.local_index_of(peer_ip)?;
        self.slots[index.0].mlag_id = mlag_id;
        Ok(())
    }

    /// Bind `system_id` to `local_index`.
    pub fn set_system_id(&mut self, local_index: LocalPeerIndex, system_id: SystemId) -> Result<()> {
        self.slot(local_index)?;
        self.slots[local_index.0].system_id = system_id;
        Ok(())
    }

    /// Set the local node's (index 0) IPL ip.
    pub fn set_local_ip(&mut self, ip: Ipv4Addr) {
        self.slots[0].peer_ip = ip;
    }

    /// Set the local node's (index 0) system id.
    pub fn set_local_system_id(&mut self, system_id: SystemId) {
        self.slots[0].system_id = system_id;
    }

    /// The local node's configured ip (zero if unconfigured).
    pub fn local_ip(&self) -> Ipv4Addr {
        self.slots[0].peer_ip
    }

    /// A read-only snapshot of every occupied slot, for cross-thread
    /// consumers (spec §5).
    pub fn snapshot(&self) -> PeerSnapshot {
        PeerSnapshot {
            peers: self
                .slots
                .iter()
                .enumerate()
                .filter(|(i, s)| *i == 0 || s.occupied())
                .map(|(i, s)| (LocalPeerIndex(i), *s))
                .collect(),
        }
    }

    fn slot(&self, index: LocalPeerIndex) -> Result<&PeerRecord> {
        self.slots
            .get(index.0)
            .ok_or_else(|| Error::not_found(format!("local peer index {index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
        Ipv4Addr::new(a, b, c, d)
    }

    #[test]
    fn add_picks_lowest_free_slot_and_is_idempotent() {
        let mut reg = PeerRegistry::new();
        let i1 = reg.add(ip(10, 0, 0, 1)).unwrap();
        assert_eq!(i1, LocalPeerIndex(1));

        // Re-adding the same ip returns the same index, no error.
        let i1_again = reg.add(ip(10, 0, 0, 1)).unwrap();
        assert_eq!(i1_again, i1);
    }

    #[test]
    fn add_fails_when_full() {
        let mut reg = PeerRegistry::new();
        for i in 1..MAX_PEERS {
            reg.add(ip(10, 0, 0, i as u8)).unwrap();
        }
        let err = reg.add(ip(10, 0, 0, 99)).unwrap_err();
        assert!(matches!(err, Error::Full(_)));
    }

    #[test]
    fn delete_never_touches_index_zero() {
        let mut reg = PeerRegistry::new();
        reg.set_local_ip(ip(10, 0, 0, 2));
        let err = reg.delete(ip(10, 0, 0, 2)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(reg.local_ip(), ip(10, 0, 0, 2));
    }

    #[test]
    fn delete_unknown_ip_is_not_found() {
        let mut reg = PeerRegistry::new();
        let err = reg.delete(ip(10, 0, 0, 5)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn registry_bijection_holds_after_add_delete_set_mlag_id() {
        let mut reg = PeerRegistry::new();
        let addr = ip(10, 0, 0, 1);
        let idx = reg.add(addr).unwrap();
        reg.set_mlag_id(addr, MlagId::SLAVE).unwrap();

        assert_eq!(reg.peer_ip_of_index(reg.local_index_of(addr).unwrap()).unwrap(), addr);
        assert_eq!(
            reg.mlag_id_of(reg.peer_ip_of_mlag_id(MlagId::SLAVE).unwrap())
                .unwrap(),
            MlagId::SLAVE
        );
        assert_eq!(idx, LocalPeerIndex(1));

        reg.delete(addr).unwrap();
        assert!(reg.local_index_of(addr).is_err());
    }
}
