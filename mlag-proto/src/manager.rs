//! The mlag manager (spec §4.7, component C7): wires the registries, the
//! master-election and peering FSMs, and the transport into the
//! end-to-end protocol. Implements [`mlag_net::StateMachine`] so
//! `mlag_net::Reactor` can drive it directly.
use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use mlag_common::counters::CounterBlock;
use mlag_common::ids::{LocalPeerIndex, MlagId, LOCAL_PEER_INDEX};
use mlag_common::time::LocalTime;
use mlag_net::timer::{OneShotTimer, DEFAULT_RECONNECT_INTERVAL};
use mlag_net::{Disconnect, Io, Link, StateMachine};

use crate::counters::{ElectionCounters, ManagerCounters, TransportCounters};
use crate::election::{self, ElectionState, PeerHealth};
use crate::event::{Command, SystemEvent};
use crate::hal::Collaborators;
use crate::peering::{self, PeeringState, SyncKind};
use crate::registry::{IplRegistry, PeerRegistry};
use crate::wire::{self, Message};

/// The lone remote peer slot this crate wires up (spec §3: "N is a small
/// constant — typical 2"). A third+ peer would need `peering` keyed
/// generically, which the registry already supports; the manager's
/// transport wiring only speaks to this one remote today.
const REMOTE_PEER_INDEX: LocalPeerIndex = LocalPeerIndex(1);

/// Tunable knobs enforced at the API edge (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct ManagerConfig {
    /// Reload-delay window, `0..=300_000` ms.
    pub reload_delay: Duration,
    /// TCP port the peer transport listens/connects on.
    pub tcp_port: u16,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            reload_delay: mlag_net::timer::DEFAULT_RELOAD_DELAY,
            tcp_port: 7000,
        }
    }
}

/// A point-in-time, cheaply cloneable view of manager state for
/// cross-thread readers (spec §9: "snapshot getters" replace the reader
/// lock).
#[derive(Debug, Clone)]
pub struct CoreSnapshot {
    /// Current master-election role.
    pub role: election::Status,
    /// Whether local ports are currently enabled.
    pub ports_enabled: bool,
    /// Whether the reload-delay window is still open.
    pub reload_delay_active: bool,
    /// A copy of every occupied peer slot.
    pub peers: crate::registry::PeerSnapshot,
}

/// Owns every piece of protocol state (spec §9: "Global state ... becomes
/// explicitly owned by a `Core` value").
pub struct Core {
    peers: PeerRegistry,
    ipls: IplRegistry,
    election: ElectionState,
    peering: HashMap<LocalPeerIndex, PeeringState>,
    collaborators: Collaborators,
    transport_counters: TransportCounters,
    manager_counters: ManagerCounters,
    election_counters: ElectionCounters,
    config: ManagerConfig,
    ports_enabled: bool,
    reload_delay_active: bool,
    running: bool,
    pending: VecDeque<SystemEvent>,
    outbox: VecDeque<Io<Message, SystemEvent, String>>,
    /// The reload-delay one-shot, armed on entry to `Master`/`Standalone`
    /// (spec §4.8, C8) and cancelled whenever that window closes early.
    reload_delay_timer: Option<OneShotTimer>,
    /// One reconnect one-shot per peer, armed on disconnect while `Slave`
    /// (spec §4.4 / scenario S5: "fires every 500 ms").
    reconnect_timers: HashMap<LocalPeerIndex, OneShotTimer>,
    timer_tx: crossbeam_channel::Sender<SystemEvent>,
    timer_rx: crossbeam_channel::Receiver<SystemEvent>,
}

impl Core {
    /// Construct a fresh, unstarted core.
    pub fn new(config: ManagerConfig, collaborators: Collaborators) -> Self {
        let (timer_tx, timer_rx) = crossbeam_channel::unbounded();
        Self {
            peers: PeerRegistry::new(),
            ipls: IplRegistry::new(),
            election: ElectionState::default(),
            peering: HashMap::new(),
            collaborators,
            transport_counters: TransportCounters::default(),
            manager_counters: ManagerCounters::default(),
            election_counters: ElectionCounters::default(),
            config,
            ports_enabled: false,
            reload_delay_active: false,
            running: false,
            pending: VecDeque::new(),
            outbox: VecDeque::new(),
            reload_delay_timer: None,
            reconnect_timers: HashMap::new(),
            timer_tx,
            timer_rx,
        }
    }

    /// A cheap, cloneable snapshot for cross-thread readers.
    pub fn snapshot(&self) -> CoreSnapshot {
        CoreSnapshot {
            role: self.election.current_status,
            ports_enabled: self.ports_enabled,
            reload_delay_active: self.reload_delay_active,
            peers: self.peers.snapshot(),
        }
    }

    /// The configured reload-delay.
    pub fn reload_delay(&self) -> Duration {
        self.config.reload_delay
    }

    /// Post an event onto the internal queue and drain it to completion.
    /// Every public entry point funnels through here so a single event can
    /// cascade (election effect → peering event → transport write) without
    /// re-entrant calls (spec §5: "state transitions ... totally ordered").
    fn post(&mut self, event: SystemEvent) {
        self.pending.push_back(event);
        while let Some(event) = self.pending.pop_front() {
            self.apply(event);
        }
    }

    /// Apply every `ReloadDelayExpired`/`Reconnect` a timer thread has
    /// posted since the last drain (spec §4.8, C8). Called every reactor
    /// loop via `tick`, and directly by tests simulating a timer fire.
    fn drain_timers(&mut self) {
        while let Ok(event) = self.timer_rx.try_recv() {
            self.post(event);
        }
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        let ip = self.peers.peer_ip_of_index(REMOTE_PEER_INDEX).ok()?;
        if ip.is_unspecified() {
            None
        } else {
            Some(SocketAddr::new(ip.into(), self.config.tcp_port))
        }
    }

    fn addr_of(&self, index: LocalPeerIndex) -> Option<SocketAddr> {
        let ip = self.peers.peer_ip_of_index(index).ok()?;
        if ip.is_unspecified() {
            None
        } else {
            Some(SocketAddr::new(ip.into(), self.config.tcp_port))
        }
    }

    fn send(&mut self, index: LocalPeerIndex, msg: Message) {
        if let Some(addr) = self.addr_of(index) {
            self.outbox.push_back(Io::Write(addr, msg));
            self.transport_counters.tx.incr();
        }
    }

    /// (Re)arm the reload-delay one-shot. Cancels any timer already armed
    /// so re-entering `Master`/`Standalone` never leaves two timers racing
    /// to post `ReloadDelayExpired`.
    fn arm_reload_delay_timer(&mut self) {
        if let Some(timer) = self.reload_delay_timer.take() {
            timer.cancel();
        }
        let tx = self.timer_tx.clone();
        self.reload_delay_timer = Some(OneShotTimer::arm(self.config.reload_delay, move || {
            let _ = tx.send(SystemEvent::ReloadDelayExpired);
        }));
    }

    fn cancel_reload_delay_timer(&mut self) {
        if let Some(timer) = self.reload_delay_timer.take() {
            timer.cancel();
        }
    }

    /// Arm the 500 ms reconnect one-shot for `index` (spec §4.4, scenario
    /// S5), replacing any one already pending for that peer.
    fn arm_reconnect_timer(&mut self, index: LocalPeerIndex) {
        if let Some(timer) = self.reconnect_timers.remove(&index) {
            timer.cancel();
        }
        let tx = self.timer_tx.clone();
        let timer = OneShotTimer::arm(DEFAULT_RECONNECT_INTERVAL, move || {
            let _ = tx.send(SystemEvent::Reconnect(index));
        });
        self.reconnect_timers.insert(index, timer);
    }

    fn cancel_reconnect_timer(&mut self, index: LocalPeerIndex) {
        if let Some(timer) = self.reconnect_timers.remove(&index) {
            timer.cancel();
        }
    }

    fn apply(&mut self, event: SystemEvent) {
        match event {
            SystemEvent::Start => {
                self.running = true;
                self.ports_enabled = false;
                self.transport_counters.clear();
                self.manager_counters.clear();
                self.election_counters.clear();
                self.cancel_reload_delay_timer();
                for (_, timer) in self.reconnect_timers.drain() {
                    timer.cancel();
                }
                while self.timer_rx.try_recv().is_ok() {}
                let effects = election::step(&mut self.election, election::Event::Start);
                self.apply_election_effects(effects);
            }

            SystemEvent::Stop => {
                let effects = election::step(&mut self.election, election::Event::Stop);
                self.apply_election_effects(effects);
                let mut stop_bits = 0u32;
                for hooks in [
                    &self.collaborators.health,
                    &self.collaborators.igmp,
                    &self.collaborators.mac,
                    &self.collaborators.lacp,
                    &self.collaborators.l3,
                ] {
                    stop_bits |= (hooks.on_stop)(LOCAL_PEER_INDEX);
                }
                self.running = false;
                self.ports_enabled = false;
                self.reload_delay_active = false;
                self.cancel_reload_delay_timer();
                for (_, timer) in self.reconnect_timers.drain() {
                    timer.cancel();
                }
                self.pending.push_back(SystemEvent::StopDone(stop_bits));
            }

            SystemEvent::PeerAdd(ip) => {
                if let Ok(index) = self.peers.add(ip) {
                    if index != LOCAL_PEER_INDEX {
                        self.peering.entry(index).or_insert_with(|| PeeringState::new(index));
                        if self.election.current_status == election::Status::Slave {
                            if let Some(addr) = self.addr_of(index) {
                                self.outbox.push_back(Io::Connect(addr));
                            }
                        }
                    }
                }
            }

            SystemEvent::PeerDelete(ip) => {
                if let Ok(index) = self.peers.local_index_of(ip) {
                    self.peering.remove(&index);
                    self.cancel_reconnect_timer(index);
                }
                let _ = self.peers.delete(ip);
            }

            SystemEvent::ConfigChange { my_ip, peer_ip } => {
                if let Some(ip) = my_ip {
                    self.peers.set_local_ip(ip);
                }
                if let Some(ip) = peer_ip {
                    let _ = self.peers.add(ip);
                }
                let effects = election::step(
                    &mut self.election,
                    election::Event::ConfigChange { my_ip, peer_ip },
                );
                self.apply_election_effects(effects);
            }

            SystemEvent::PeerStatusChange { peer_index: _, health } => {
                let effects =
                    election::step(&mut self.election, election::Event::PeerStatusChange { health });
                self.apply_election_effects(effects);
            }

            SystemEvent::PeerConnected(index) => {
                let effects = self
                    .peering
                    .entry(index)
                    .or_insert_with(|| PeeringState::new(index))
                    .step(peering::Event::PeerConn);
                self.apply_peering_effects(effects);
            }

            SystemEvent::PeerDisconnected(index) => {
                if let Some(fsm) = self.peering.get_mut(&index) {
                    let effects = fsm.step(peering::Event::PeerDown);
                    self.apply_peering_effects(effects);
                }
                if self.election.current_status == election::Status::Slave {
                    self.arm_reconnect_timer(index);
                }
            }

            SystemEvent::Reconnect(index) => {
                self.reconnect_timers.remove(&index);
                if self.election.current_status == election::Status::Slave {
                    if let Some(addr) = self.addr_of(index) {
                        self.outbox.push_back(Io::Connect(addr));
                    }
                }
            }

            SystemEvent::ReloadDelayExpired => {
                self.manager_counters.reload_delay_expired.incr();
                if self.reload_delay_active {
                    self.reload_delay_active = false;
                    if matches!(
                        self.election.current_status,
                        election::Status::Master | election::Status::Standalone
                    ) {
                        self.ports_enabled = true;
                    }
                }
            }

            SystemEvent::SyncArrived { peer_index, kind } => {
                if let Some(fsm) = self.peering.get_mut(&peer_index) {
                    let effects = fsm.step(peering::Event::SyncArrived(kind));
                    self.apply_peering_effects(effects);
                }
            }

            SystemEvent::MessageReceived { peer_index, message } => {
                self.transport_counters.rx.incr();
                self.handle_message(peer_index, message);
            }

            SystemEvent::StopDone(_bits) => {
                // Observed by whichever `Barrier` the caller is waiting on
                // (mlag-node owns the barrier instance, spec §4.7).
            }

            SystemEvent::Deinit => {
                self.running = false;
            }
        }
    }

    fn handle_message(&mut self, peer_index: LocalPeerIndex, message: Message) {
        match message {
            Message::PeerStart(m) => {
                if let Ok(peer_ip) = self.peers.peer_ip_of_index(peer_index) {
                    let _ = self.peers.set_mlag_id(peer_ip, MlagId(m.mlag_id as u8));
                }
                (self.collaborators.mac.on_start)(peer_index);
                (self.collaborators.l3.on_start)(peer_index);
                if self.peering.get(&peer_index).map(|f| f.igmp_enabled).unwrap_or(false) {
                    (self.collaborators.igmp.on_start)(peer_index);
                }
                if self.peering.get(&peer_index).map(|f| f.lacp_enabled).unwrap_or(false) {
                    (self.collaborators.lacp.on_start)(peer_index);
                }
                // Port state itself is read straight from the HAL, not an
                // external collaborator; treat it as synced immediately.
                self.pending.push_back(SystemEvent::SyncArrived {
                    peer_index,
                    kind: SyncKind::Port,
                });
            }
            Message::PeerEnable(m) => {
                self.manager_counters.peer_enable_rx.incr();
                let _ = m;
                self.ports_enabled = true;
            }
            Message::IgmpMessage(_m) => {
                // Tunneled snooping payload; forwarding it to the HAL trap
                // path is the tunneling dispatcher's job (spec §5), not the
                // mlag dispatcher's. Nothing further to do here beyond the
                // counter bump already applied by the caller.
            }
            Message::Unknown(opcode) => {
                log::warn!(target: "mlag::transport", "dropping unknown opcode {opcode}");
            }
        }
    }

    fn apply_election_effects(&mut self, effects: Vec<election::Effect>) {
        for effect in effects {
            match effect {
                election::Effect::SwitchStatusChange { prev, curr, .. } => {
                    match curr {
                        election::Status::Master => self.election_counters.became_master.incr(),
                        election::Status::Slave => self.election_counters.became_slave.incr(),
                        election::Status::Standalone => {
                            self.election_counters.became_standalone.incr()
                        }
                        election::Status::Idle => {}
                    }
                    self.on_role_change(prev, curr);
                }
                election::Effect::SetMlagId { ip, mlag_id } => {
                    let _ = self.peers.set_mlag_id(ip, mlag_id);
                }
                election::Effect::LogError(msg) => {
                    self.election_counters.equal_ip_errors.incr();
                    log::error!(target: "mlag::election", "{msg}");
                }
            }
        }
    }

    fn on_role_change(&mut self, prev: election::Status, curr: election::Status) {
        match curr {
            election::Status::Master => {
                for (idx, fsm) in self.peering.iter_mut() {
                    *fsm = PeeringState::new(*idx);
                }
                self.reload_delay_active = true;
                self.ports_enabled = false;
                self.arm_reload_delay_timer();
                self.start_local_peering();
            }
            election::Status::Slave => {
                self.reload_delay_active = false;
                self.ports_enabled = false;
                self.cancel_reload_delay_timer();
                if let Some(addr) = self.remote_addr() {
                    self.outbox.push_back(Io::Connect(addr));
                }
            }
            election::Status::Standalone => {
                let already_up = prev == election::Status::Slave && self.ports_enabled;
                self.reload_delay_active = !already_up;
                self.ports_enabled = false;
                if self.reload_delay_active {
                    self.arm_reload_delay_timer();
                } else {
                    self.cancel_reload_delay_timer();
                }
                self.start_local_peering();
            }
            election::Status::Idle => {
                self.reload_delay_active = false;
                self.ports_enabled = false;
                self.cancel_reload_delay_timer();
            }
        }
    }

    /// Bring the local-peer peering FSM straight to `PeerUp` (spec §4.7:
    /// "start local-peer peering FSM by firing `PeerUp` then `PeerConn`").
    /// Local module sync has no network round trip, so every always-on
    /// module is fed immediately.
    fn start_local_peering(&mut self) {
        let fsm = self
            .peering
            .entry(LOCAL_PEER_INDEX)
            .or_insert_with(|| PeeringState::new(LOCAL_PEER_INDEX));
        fsm.step(peering::Event::PeerUp);
        let effects = fsm.step(peering::Event::PeerConn);
        self.apply_peering_effects(effects);

        for kind in [SyncKind::Port, SyncKind::L3, SyncKind::Mac] {
            if let Some(fsm) = self.peering.get_mut(&LOCAL_PEER_INDEX) {
                let effects = fsm.step(peering::Event::SyncArrived(kind));
                self.apply_peering_effects(effects);
            }
        }
    }

    fn apply_peering_effects(&mut self, effects: Vec<peering::Effect>) {
        for effect in effects {
            match effect {
                peering::Effect::SyncStart(idx) => {
                    if idx != LOCAL_PEER_INDEX {
                        let mlag_id = self.peers.mlag_id_of_index(LOCAL_PEER_INDEX).unwrap_or_default();
                        self.send(
                            idx,
                            Message::PeerStart(wire::PeerStart {
                                mlag_id: mlag_id.0 as u32,
                                health_state: 1,
                            }),
                        );
                    }
                }
                peering::Effect::SyncDone(idx) => {
                    if idx == LOCAL_PEER_INDEX {
                        if !self.reload_delay_active {
                            self.ports_enabled = true;
                        }
                    } else if self.election.current_status == election::Status::Master {
                        self.reload_delay_active = false;
                        self.ports_enabled = true;
                        let mlag_id = self.peers.mlag_id_of_index(idx).unwrap_or_default();
                        self.send(
                            idx,
                            Message::PeerEnable(wire::PeerEnable {
                                mlag_id: mlag_id.0 as u32,
                                state: 1,
                            }),
                        );
                        self.manager_counters.peer_enable_tx.incr();
                    }
                }
                peering::Effect::StopTransport(idx) => {
                    if idx != LOCAL_PEER_INDEX {
                        if let Some(addr) = self.addr_of(idx) {
                            self.outbox.push_back(Io::Disconnect(
                                addr,
                                Disconnect::StateMachine("peer down".to_string()),
                            ));
                        }
                    }
                }
            }
        }
    }
}

impl StateMachine for Core {
    type Message = Message;
    type Event = SystemEvent;
    type DisconnectReason = String;
    type Command = Command;

    fn initialize(&mut self, _time: LocalTime) {}

    fn message_received(&mut self, addr: &SocketAddr, msg: Self::Message) {
        let ip = match addr.ip() {
            std::net::IpAddr::V4(v4) => v4,
            std::net::IpAddr::V6(_) => return,
        };
        if let Ok(peer_index) = self.peers.local_index_of(ip) {
            self.post(SystemEvent::MessageReceived { peer_index, message: msg });
        }
    }

    fn attempted(&mut self, _addr: &SocketAddr) {}

    fn connected(&mut self, addr: SocketAddr, _local_addr: &SocketAddr, _link: Link) {
        let ip = match addr.ip() {
            std::net::IpAddr::V4(v4) => v4,
            std::net::IpAddr::V6(_) => return,
        };
        let index = match self.peers.local_index_of(ip) {
            Ok(i) => i,
            Err(_) => return,
        };
        self.cancel_reconnect_timer(index);
        self.post(SystemEvent::PeerConnected(index));
    }

    fn disconnected(&mut self, addr: &SocketAddr, _reason: Disconnect<Self::DisconnectReason>) {
        let ip = match addr.ip() {
            std::net::IpAddr::V4(v4) => v4,
            std::net::IpAddr::V6(_) => return,
        };
        if let Ok(index) = self.peers.local_index_of(ip) {
            self.post(SystemEvent::PeerDisconnected(index));
        }
    }

    fn command(&mut self, cmd: Self::Command) {
        match cmd {
            Command::Start => self.post(SystemEvent::Start),
            Command::Stop => self.post(SystemEvent::Stop),
            Command::PeerAdd(ip) => self.post(SystemEvent::PeerAdd(ip)),
            Command::PeerDelete(ip) => self.post(SystemEvent::PeerDelete(ip)),
            Command::IplCreate(reply) => {
                let _ = reply.send(self.ipls.create());
            }
            Command::IplDelete(id) => {
                let _ = self.ipls.delete(id);
            }
            Command::ConfigChange { my_ip, peer_ip } => {
                self.post(SystemEvent::ConfigChange { my_ip, peer_ip })
            }
            Command::SetReloadDelayMs(ms) => {
                self.config.reload_delay = Duration::from_millis(ms as u64);
            }
            Command::GetSnapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn tick(&mut self, _local_time: LocalTime) {
        self.drain_timers();
    }

    fn timer_expired(&mut self) {
        self.drain_timers();
    }

    fn next(&mut self) -> Option<Io<Self::Message, Self::Event, Self::DisconnectReason>> {
        self.outbox.pop_front()
    }
}

/// Report a local ip to the election FSM directly (used by tests and the
/// node's init sequence before the reactor is running, spec §4.5
/// `ConfigChange`).
impl Core {
    /// Directly add the local node's own ip to the registry and feed it to
    /// the election FSM (equivalent to a `ConfigChange` with `peer_ip` left
    /// unset).
    pub fn configure_local_ip(&mut self, ip: Ipv4Addr) {
        self.post(SystemEvent::ConfigChange { my_ip: Some(ip), peer_ip: None });
    }

    /// Directly configure the peer's ip (equivalent to a `ConfigChange`
    /// with `my_ip` left unset).
    pub fn configure_peer_ip(&mut self, ip: Ipv4Addr) {
        self.post(SystemEvent::ConfigChange { my_ip: None, peer_ip: Some(ip) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> Core {
        Core::new(ManagerConfig::default(), Collaborators::default())
    }

    #[test]
    fn scenario_s1_master_emits_peer_start_then_peer_enable() {
        let mut c = core();
        c.configure_local_ip(Ipv4Addr::new(10, 0, 0, 2));
        c.configure_peer_ip(Ipv4Addr::new(10, 0, 0, 1));
        c.command(Command::Start);

        assert_eq!(c.snapshot().role, election::Status::Master);

        c.connected(
            SocketAddr::new(Ipv4Addr::new(10, 0, 0, 1).into(), 7000),
            &SocketAddr::new(Ipv4Addr::new(10, 0, 0, 2).into(), 7000),
            Link::Inbound,
        );

        let first = c.next().expect("PEER_START should be queued");
        match first {
            Io::Write(_, Message::PeerStart(m)) => assert_eq!(m.mlag_id, 0),
            other => panic!("expected PeerStart, got {other:?}"),
        }

        for kind in [SyncKind::Port, SyncKind::L3, SyncKind::Mac] {
            c.post(SystemEvent::SyncArrived { peer_index: REMOTE_PEER_INDEX, kind });
        }

        let second = c.next().expect("PEER_ENABLE should be queued");
        assert!(matches!(second, Io::Write(_, Message::PeerEnable(_))));
        assert!(c.snapshot().ports_enabled);
    }

    #[test]
    fn scenario_s2_slave_degrades_to_standalone_on_peer_down() {
        let mut c = core();
        c.configure_local_ip(Ipv4Addr::new(10, 0, 0, 1));
        c.configure_peer_ip(Ipv4Addr::new(10, 0, 0, 2));
        c.command(Command::Start);
        assert_eq!(c.snapshot().role, election::Status::Slave);

        c.post(SystemEvent::PeerStatusChange {
            peer_index: REMOTE_PEER_INDEX,
            health: PeerHealth::Down,
        });

        assert_eq!(c.snapshot().role, election::Status::Standalone);
        assert_eq!(c.election_counters.became_standalone.0, 1);
    }

    #[test]
    fn scenario_s2_master_records_peer_down_without_transition() {
        let mut c = core();
        c.configure_local_ip(Ipv4Addr::new(10, 0, 0, 2));
        c.configure_peer_ip(Ipv4Addr::new(10, 0, 0, 1));
        c.command(Command::Start);
        assert_eq!(c.snapshot().role, election::Status::Master);

        c.post(SystemEvent::PeerStatusChange {
            peer_index: REMOTE_PEER_INDEX,
            health: PeerHealth::Down,
        });

        assert_eq!(c.snapshot().role, election::Status::Master);
        assert_eq!(c.election_counters.became_standalone.0, 0);
    }

    #[test]
    fn scenario_s5_reconnect_storm_produces_no_duplicate_peer_start() {
        let mut c = core();
        c.configure_local_ip(Ipv4Addr::new(10, 0, 0, 1));
        c.configure_peer_ip(Ipv4Addr::new(10, 0, 0, 2));
        c.command(Command::Start);
        assert_eq!(c.snapshot().role, election::Status::Slave);

        // Drain the initial connect attempt emitted by the role transition.
        while c.next().is_some() {}

        // Several failed attempts before the timer finally succeeds.
        for _ in 0..3 {
            c.post(SystemEvent::Reconnect(REMOTE_PEER_INDEX));
        }
        let connect_attempts = std::iter::from_fn(|| c.next())
            .filter(|io| matches!(io, Io::Connect(_)))
            .count();
        assert_eq!(connect_attempts, 3);

        c.connected(
            SocketAddr::new(Ipv4Addr::new(10, 0, 0, 2).into(), 7000),
            &SocketAddr::new(Ipv4Addr::new(10, 0, 0, 1).into(), 7000),
            Link::Outbound,
        );

        let peer_starts = std::iter::from_fn(|| c.next())
            .filter(|io| matches!(io, Io::Write(_, Message::PeerStart(_))))
            .count();
        assert_eq!(peer_starts, 1);
    }

    #[test]
    fn scenario_s3_equal_ip_keeps_role_idle() {
        let mut c = core();
        c.configure_local_ip(Ipv4Addr::new(10, 0, 0, 5));
        c.configure_peer_ip(Ipv4Addr::new(10, 0, 0, 5));
        c.command(Command::Start);

        assert_eq!(c.snapshot().role, election::Status::Idle);
        assert_eq!(c.election_counters.equal_ip_errors.0, 1);
    }

    #[test]
    fn reload_delay_expiry_enables_ports_without_sync() {
        let mut config = ManagerConfig::default();
        config.reload_delay = Duration::from_millis(20);
        let mut c = Core::new(config, Collaborators::default());
        c.configure_local_ip(Ipv4Addr::new(10, 0, 0, 2));
        c.configure_peer_ip(Ipv4Addr::new(10, 0, 0, 1));
        c.command(Command::Start);
        assert!(!c.snapshot().ports_enabled);

        std::thread::sleep(Duration::from_millis(80));
        c.timer_expired();
        assert!(c.snapshot().ports_enabled);
    }

    #[test]
    fn stop_collects_stop_bits_from_every_collaborator() {
        let mut collaborators = Collaborators::default();
        collaborators.health.on_stop = std::sync::Arc::new(|_| 0b0001);
        collaborators.mac.on_stop = std::sync::Arc::new(|_| 0b0010);

        let mut c = Core::new(ManagerConfig::default(), collaborators);
        c.command(Command::Start);
        c.command(Command::Stop);

        assert!(!c.running);
    }

    #[test]
    fn scenario_s6_restart_after_stop_clears_counters() {
        let mut c = core();
        c.configure_local_ip(Ipv4Addr::new(10, 0, 0, 2));
        c.configure_peer_ip(Ipv4Addr::new(10, 0, 0, 1));
        c.command(Command::Start);

        c.post(SystemEvent::PeerStatusChange {
            peer_index: REMOTE_PEER_INDEX,
            health: PeerHealth::Down,
        });
        c.election_counters.equal_ip_errors.incr();
        c.manager_counters.reload_delay_expired.incr();
        c.transport_counters.rx.incr();
        assert!(c.election_counters.became_standalone.0 > 0 || c.election_counters.equal_ip_errors.0 > 0);

        c.command(Command::Stop);
        c.command(Command::Start);

        assert_eq!(c.election_counters.became_standalone.0, 0);
        assert_eq!(c.election_counters.equal_ip_errors.0, 0);
        assert_eq!(c.manager_counters.reload_delay_expired.0, 0);
        assert_eq!(c.transport_counters.rx.0, 0);
        assert_eq!(c.snapshot().role, election::Status::Master);
    }
}
