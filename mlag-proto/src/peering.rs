//! The per-peer peering FSM (spec §4.6, component C6): tracks a peer from
//! `Configured` through `Peering` to `PeerUp` as each synchronized module
//! (port, L3, IGMP, MAC, LACP) reports done.
use mlag_common::ids::LocalPeerIndex;

/// A subsystem whose per-peer sync must complete before `PeerUp` (spec
/// §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// Port admin/oper state.
    Port,
    /// L3 interface state.
    L3,
    /// IGMP snooping state.
    Igmp,
    /// FDB/MAC entries.
    Mac,
    /// LACP aggregator selection.
    Lacp,
}

const fn bit(kind: SyncKind) -> u8 {
    match kind {
        SyncKind::Port => 1 << 0,
        SyncKind::L3 => 1 << 1,
        SyncKind::Igmp => 1 << 2,
        SyncKind::Mac => 1 << 3,
        SyncKind::Lacp => 1 << 4,
    }
}

const ALWAYS_ON_MASK: u8 = bit(SyncKind::Port) | bit(SyncKind::L3) | bit(SyncKind::Mac);

/// The FSM's position (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Registered but no transport connection has been seen yet.
    Configured,
    /// Transport is connected; waiting on module sync.
    Peering,
    /// Every enabled module has signaled sync done.
    PeerUp,
}

/// Events this FSM reacts to (spec §4.6).
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// The peer registry marked this peer present.
    PeerUp,
    /// The transport reports a live connection to this peer.
    PeerConn,
    /// The transport or registry reports this peer gone.
    PeerDown,
    /// A module finished its per-peer sync.
    SyncArrived(SyncKind),
}

/// Effects the manager must carry out after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Kick off the sync handshake: send `PEER_START` to this peer.
    SyncStart(LocalPeerIndex),
    /// Every enabled module is synced: notify the manager.
    SyncDone(LocalPeerIndex),
    /// This peer went down; tear down its transport.
    StopTransport(LocalPeerIndex),
}

/// The FSM's per-peer state.
#[derive(Debug, Clone, Copy)]
pub struct PeeringState {
    peer_index: LocalPeerIndex,
    phase: Phase,
    sync_states: u8,
    /// Whether IGMP sync is required for this peer's enabled-module mask.
    pub igmp_enabled: bool,
    /// Whether LACP sync is required for this peer's enabled-module mask.
    pub lacp_enabled: bool,
}

impl PeeringState {
    /// Construct a fresh `Configured` FSM for `peer_index`.
    pub fn new(peer_index: LocalPeerIndex) -> Self {
        Self {
            peer_index,
            phase: Phase::Configured,
            sync_states: 0,
            igmp_enabled: false,
            lacp_enabled: false,
        }
    }

    /// Current FSM position.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Which modules must report sync before `PeerUp` (spec §4.6).
    pub fn enabled_mask(&self) -> u8 {
        ALWAYS_ON_MASK
            | if self.igmp_enabled { bit(SyncKind::Igmp) } else { 0 }
            | if self.lacp_enabled { bit(SyncKind::Lacp) } else { 0 }
    }

    /// Advance the FSM by one event.
    pub fn step(&mut self, event: Event) -> Vec<Effect> {
        match (self.phase, event) {
            (Phase::Configured, Event::PeerUp) => vec![],

            (Phase::Configured | Phase::Peering, Event::PeerConn) => {
                self.phase = Phase::Peering;
                vec![Effect::SyncStart(self.peer_index)]
            }

            (Phase::Peering, Event::SyncArrived(kind)) => {
                self.sync_states |= bit(kind);
                if self.sync_states == self.enabled_mask() {
                    self.phase = Phase::PeerUp;
                    vec![Effect::SyncDone(self.peer_index)]
                } else {
                    vec![]
                }
            }

            (_, Event::PeerDown) => {
                self.sync_states = 0;
                self.phase = Phase::Configured;
                vec![Effect::StopTransport(self.peer_index)]
            }

            // A stray `SyncArrived` outside `Peering`, or `PeerUp` once
            // already past `Configured`, has no effect.
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_conn_starts_sync_handshake() {
        let mut fsm = PeeringState::new(LocalPeerIndex(1));
        let effects = fsm.step(Event::PeerConn);
        assert_eq!(fsm.phase(), Phase::Peering);
        assert_eq!(effects, vec![Effect::SyncStart(LocalPeerIndex(1))]);
    }

    #[test]
    fn peer_up_requires_all_enabled_modules_synced() {
        let mut fsm = PeeringState::new(LocalPeerIndex(1));
        fsm.step(Event::PeerConn);

        assert!(fsm.step(Event::SyncArrived(SyncKind::Port)).is_empty());
        assert!(fsm.step(Event::SyncArrived(SyncKind::L3)).is_empty());
        assert_eq!(fsm.phase(), Phase::Peering);

        let effects = fsm.step(Event::SyncArrived(SyncKind::Mac));
        assert_eq!(fsm.phase(), Phase::PeerUp);
        assert_eq!(effects, vec![Effect::SyncDone(LocalPeerIndex(1))]);
    }

    #[test]
    fn igmp_and_lacp_join_the_mask_only_when_enabled() {
        let mut fsm = PeeringState::new(LocalPeerIndex(1));
        fsm.igmp_enabled = true;
        fsm.step(Event::PeerConn);

        fsm.step(Event::SyncArrived(SyncKind::Port));
        fsm.step(Event::SyncArrived(SyncKind::L3));
        let effects = fsm.step(Event::SyncArrived(SyncKind::Mac));
        // IGMP required but not yet arrived.
        assert!(effects.is_empty());
        assert_eq!(fsm.phase(), Phase::Peering);

        let effects = fsm.step(Event::SyncArrived(SyncKind::Igmp));
        assert_eq!(fsm.phase(), Phase::PeerUp);
        assert_eq!(effects, vec![Effect::SyncDone(LocalPeerIndex(1))]);
    }

    #[test]
    fn peer_down_resets_sync_state_and_stops_transport() {
        let mut fsm = PeeringState::new(LocalPeerIndex(1));
        fsm.step(Event::PeerConn);
        fsm.step(Event::SyncArrived(SyncKind::Port));

        let effects = fsm.step(Event::PeerDown);
        assert_eq!(fsm.phase(), Phase::Configured);
        assert_eq!(effects, vec![Effect::StopTransport(LocalPeerIndex(1))]);

        // Reconnecting starts a fresh handshake with no leftover sync bits.
        fsm.step(Event::PeerConn);
        let effects = fsm.step(Event::SyncArrived(SyncKind::Port));
        assert!(effects.is_empty());
    }
}
