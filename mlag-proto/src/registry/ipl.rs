//! The IPL topology registry (spec §4.2, component C2).
use std::net::Ipv4Addr;

use mlag_common::error::{Error, Result};
use mlag_common::ids::{IplId, MAX_IPLS};

/// Operational state of an IPL's bound port (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperState {
    /// The IPL's port is down.
    #[default]
    Down,
    /// The IPL's port is up.
    Up,
}

/// One IPL's configuration (spec §3). The IPL may exist (`valid`) before
/// its port binding exists (`port_valid`) — the two flags are independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct IplRecord {
    /// Whether this id has been created.
    pub valid: bool,
    /// Whether a hardware port has been bound to this IPL.
    pub port_valid: bool,
    /// The bound hardware interface index, meaningful iff `port_valid`.
    pub port_id: u32,
    /// Local IPv4 address of the IPL VLAN interface.
    pub local_ip: Ipv4Addr,
    /// Peer's IPv4 address of the IPL VLAN interface.
    pub peer_ip: Ipv4Addr,
    /// The IPL's VLAN, `1..=4095`.
    pub vlan_id: u16,
    /// Current operational state.
    pub current_state: OperState,
}

/// The fixed-capacity IPL table. IPL id 0 is always the redirect IPL
/// (spec §3 invariant); deleting an id clears its fields and re-creating
/// one picks the lowest free id.
#[derive(Debug, Default)]
pub struct IplRegistry {
    slots: [IplRecord; MAX_IPLS],
}

impl IplRegistry {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new IPL, returning the lowest free id.
    pub fn create(&mut self) -> Result<IplId> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !slot.valid {
                *slot = IplRecord {
                    valid: true,
                    ..IplRecord::default()
                };
                return Ok(IplId(i));
            }
        }
        Err(Error::Full(format!("ipl registry at capacity ({MAX_IPLS} slots)")))
    }

    /// Destroy the IPL at `id`, clearing all of its fields.
    pub fn delete(&mut self, id: IplId) -> Result<()> {
        let slot = self.slot_mut(id)?;
        if !slot.valid {
            return Err(Error::not_found(format!("ipl {id}")));
        }
        *slot = IplRecord::default();
        Ok(())
    }

    /// Bind `port_id` to `id`.
    pub fn set_port(&mut self, id: IplId, port_id: u32) -> Result<()> {
        let slot = self.slot_mut(id)?;
        slot.port_id = port_id;
        slot.port_valid = true;
        Ok(())
    }

    /// Set the local/peer VLAN interface ips for `id`.
    pub fn set_ips(&mut self, id: IplId, local_ip: Ipv4Addr, peer_ip: Ipv4Addr) -> Result<()> {
        let slot = self.slot_mut(id)?;
        slot.local_ip = local_ip;
        slot.peer_ip = peer_ip;
        Ok(())
    }

    /// Set the VLAN id for `id`. Must be in `1..=4095` (spec §6).
    pub fn set_vlan(&mut self, id: IplId, vlan_id: u16) -> Result<()> {
        if !(1..=4095).contains(&vlan_id) {
            return Err(Error::invalid(format!("vlan_id {vlan_id} out of range 1..=4095")));
        }
        self.slot_mut(id)?.vlan_id = vlan_id;
        Ok(())
    }

    /// Set the operational state for `id`.
    pub fn set_state(&mut self, id: IplId, state: OperState) -> Result<()> {
        self.slot_mut(id)?.current_state = state;
        Ok(())
    }

    /// A copy of `id`'s record.
    pub fn get(&self, id: IplId) -> Result<IplRecord> {
        self.slot(id).copied()
    }

    /// The redirect IPL's id, if its port is bound (spec §3).
    pub fn redirect_id(&self) -> Result<IplId> {
        let redirect = self.slot(IplId::REDIRECT)?;
        if redirect.valid && redirect.port_valid {
            Ok(IplId::REDIRECT)
        } else {
            Err(Error::not_found("redirect ipl has no bound port"))
        }
    }

    /// Find the IPL id bound to `port_id`, scanning occupied slots.
    pub fn port_id_to_ipl(&self, port_id: u32) -> Result<IplId> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.valid && s.port_valid && s.port_id == port_id)
            .map(|(i, _)| IplId(i))
            .ok_or_else(|| Error::not_found(format!("port_id {port_id}")))
    }

    fn slot(&self, id: IplId) -> Result<&IplRecord> {
        self.slots
            .get(id.0)
            .ok_or_else(|| Error::not_found(format!("ipl id {id}")))
    }

    fn slot_mut(&mut self, id: IplId) -> Result<&mut IplRecord> {
        self.slots
            .get_mut(id.0)
            .ok_or_else(|| Error::not_found(format!("ipl id {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_picks_lowest_free_id_including_after_delete() {
        let mut reg = IplRegistry::new();
        let a = reg.create().unwrap();
        let b = reg.create().unwrap();
        assert_eq!(a, IplId(0));
        assert_eq!(b, IplId(1));

        reg.delete(a).unwrap();
        let c = reg.create().unwrap();
        assert_eq!(c, IplId(0));
    }

    #[test]
    fn redirect_id_requires_bound_port() {
        let mut reg = IplRegistry::new();
        reg.create().unwrap();
        assert!(reg.redirect_id().is_err());

        reg.set_port(IplId::REDIRECT, 7).unwrap();
        assert_eq!(reg.redirect_id().unwrap(), IplId::REDIRECT);
    }

    #[test]
    fn vlan_id_out_of_range_is_rejected() {
        let mut reg = IplRegistry::new();
        reg.create().unwrap();
        assert!(reg.set_vlan(IplId::REDIRECT, 0).is_err());
        assert!(reg.set_vlan(IplId::REDIRECT, 4096).is_err());
        assert!(reg.set_vlan(IplId::REDIRECT, 10).is_ok());
    }

    #[test]
    fn port_id_to_ipl_scans_occupied_slots() {
        let mut reg = IplRegistry::new();
        let a = reg.create().unwrap();
        let b = reg.create().unwrap();
        reg.set_port(b, 42).unwrap();

        assert_eq!(reg.port_id_to_ipl(42).unwrap(), b);
        assert!(reg.port_id_to_ipl(1).is_err());
        let _ = a;
    }
}
