//! The master-election FSM (spec §4.5, component C5).
//!
//! Encoded as a pure `step(state, event) -> Vec<Effect>` function per the
//! REDESIGN FLAGS in spec §9 ("FSM framework"): no side effects happen
//! inside the transition itself, so properties 1/2 (role determinism,
//! tie-break) are table tests with no mocking required. Grounded on
//! `original_source/mlag_master_election_fsm.c`'s `is_master_entry_func`,
//! generalized away from its generated-scaffolding/`goto bail` style.
use std::net::Ipv4Addr;

use mlag_common::ids::MlagId;

/// The FSM's state, one per installation (spec §3: "singleton").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not yet started.
    Idle,
    /// We are the Master.
    Master,
    /// We are the Slave.
    Slave,
    /// Neither side is reachable/healthy enough to form a pair.
    Standalone,
}

/// Peer health, as reported by the out-of-band keepalive (spec §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerHealth {
    /// The peer is reachable and healthy.
    Up,
    /// The peer is unreachable or unhealthy.
    Down,
}

/// Events the FSM reacts to (spec §4.5).
#[derive(Debug, Clone)]
pub enum Event {
    /// Bring the FSM up from `Idle`.
    Start,
    /// Tear the FSM down to `Idle`.
    Stop,
    /// The local or peer IPL ip changed.
    ConfigChange {
        /// New local ip, if changed.
        my_ip: Option<Ipv4Addr>,
        /// New peer ip, if changed.
        peer_ip: Option<Ipv4Addr>,
    },
    /// The out-of-band keepalive reported a health change.
    PeerStatusChange {
        /// The new health value.
        health: PeerHealth,
    },
}

/// Side effects the manager must carry out after a step (spec §9: "effects
/// ... returned as values, not executed inside the transition").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The FSM's role changed; notify the rest of the system (spec §4.5
    /// "Entry actions").
    SwitchStatusChange {
        /// The role before this transition.
        prev: Status,
        /// The role after this transition.
        curr: Status,
        /// Our own negotiated peer id.
        my_peer_id: MlagId,
        /// The Master's negotiated peer id.
        master_peer_id: MlagId,
        /// Our ip at the time of transition.
        my_ip: Ipv4Addr,
        /// The peer's ip at the time of transition.
        peer_ip: Ipv4Addr,
    },
    /// Write the resolved mlag_id back into the peer registry (spec §4.5:
    /// "Also write the resolved mlag_id back into the peer registry for
    /// both self and peer if their ips are known").
    SetMlagId {
        /// The ip whose registry slot to update.
        ip: Ipv4Addr,
        /// The mlag_id to assign.
        mlag_id: MlagId,
    },
    /// The equal-ip misconfiguration (spec §8 scenario S3): logged, no
    /// transition taken.
    LogError(String),
}

/// The FSM's full state (spec §3).
#[derive(Debug, Clone, Copy)]
pub struct ElectionState {
    /// Current role.
    pub current_status: Status,
    /// Role before the last transition.
    pub previous_status: Status,
    /// Our IPL ip.
    pub my_ip: Ipv4Addr,
    /// The peer's IPL ip.
    pub peer_ip: Ipv4Addr,
    /// Last known peer health.
    pub peer_health: PeerHealth,
    /// Our negotiated peer id.
    pub my_peer_id: MlagId,
    /// The Master's negotiated peer id.
    pub master_peer_id: MlagId,
}

impl Default for ElectionState {
    fn default() -> Self {
        Self {
            current_status: Status::Idle,
            previous_status: Status::Idle,
            my_ip: Ipv4Addr::UNSPECIFIED,
            peer_ip: Ipv4Addr::UNSPECIFIED,
            // Health is unknown before the first keepalive report; we
            // default optimistic so `Start` with both ips already
            // configured can resolve a role immediately (scenario S1).
            // This is a judgment call where the original leaves the
            // initial value to whatever `health_manager` reports first.
            peer_health: PeerHealth::Up,
            my_peer_id: MlagId::INVALID,
            master_peer_id: MlagId::INVALID,
        }
    }
}

fn is_operational(status: Status) -> bool {
    !matches!(status, Status::Idle)
}

/// The pure decision function behind the `IsMaster` pseudo-state (spec
/// §4.5). Returns `None` for the equal-ip misconfiguration, in which case
/// the caller must log and leave state untouched (scenario S3).
fn decide(my_ip: Ipv4Addr, peer_ip: Ipv4Addr, health: PeerHealth) -> Option<Status> {
    if my_ip.is_unspecified() || peer_ip.is_unspecified() {
        Some(Status::Standalone)
    } else if health == PeerHealth::Down {
        Some(Status::Standalone)
    } else if my_ip < peer_ip {
        Some(Status::Slave)
    } else if my_ip > peer_ip {
        Some(Status::Master)
    } else {
        None
    }
}

fn enter_is_master(state: &mut ElectionState) -> Vec<Effect> {
    let Some(target) = decide(state.my_ip, state.peer_ip, state.peer_health) else {
        return vec![Effect::LogError(format!(
            "local ip address is the same as peer ip address: {}",
            state.my_ip
        ))];
    };

    let prev = state.current_status;
    state.previous_status = prev;
    state.current_status = target;

    match target {
        Status::Slave => {
            state.master_peer_id = MlagId::MASTER;
            state.my_peer_id = MlagId::SLAVE;
        }
        Status::Master | Status::Standalone => {
            state.master_peer_id = MlagId::MASTER;
            state.my_peer_id = MlagId::MASTER;
        }
        Status::Idle => unreachable!("decide() never targets Idle"),
    }

    let mut effects = vec![Effect::SwitchStatusChange {
        prev,
        curr: target,
        my_peer_id: state.my_peer_id,
        master_peer_id: state.master_peer_id,
        my_ip: state.my_ip,
        peer_ip: state.peer_ip,
    }];

    if !state.my_ip.is_unspecified() {
        effects.push(Effect::SetMlagId {
            ip: state.my_ip,
            mlag_id: state.my_peer_id,
        });
    }
    if !state.peer_ip.is_unspecified() {
        effects.push(Effect::SetMlagId {
            ip: state.peer_ip,
            mlag_id: state.master_peer_id,
        });
    }

    effects
}

/// Advance `state` by one `event`, returning the effects to carry out.
pub fn step(state: &mut ElectionState, event: Event) -> Vec<Effect> {
    match (state.current_status, event) {
        (Status::Idle, Event::Start) => enter_is_master(state),

        (Status::Master, Event::PeerStatusChange { health }) => {
            state.peer_health = health;
            vec![]
        }

        (Status::Slave, Event::PeerStatusChange { health: PeerHealth::Down }) => {
            state.peer_health = PeerHealth::Down;
            let prev = state.current_status;
            state.previous_status = prev;
            state.current_status = Status::Standalone;
            state.master_peer_id = MlagId::MASTER;
            state.my_peer_id = MlagId::MASTER;

            vec![Effect::SwitchStatusChange {
                prev,
                curr: Status::Standalone,
                my_peer_id: state.my_peer_id,
                master_peer_id: state.master_peer_id,
                my_ip: state.my_ip,
                peer_ip: state.peer_ip,
            }]
        }

        (Status::Slave, Event::PeerStatusChange { health }) => {
            state.peer_health = health;
            vec![]
        }

        (Status::Standalone, Event::PeerStatusChange { health }) => {
            state.peer_health = health;
            enter_is_master(state)
        }

        (status, Event::Stop) if is_operational(status) => {
            state.current_status = Status::Idle;
            state.previous_status = status;
            vec![]
        }

        (status, Event::ConfigChange { my_ip, peer_ip }) if is_operational(status) => {
            if let Some(ip) = my_ip {
                state.my_ip = ip;
            }
            if let Some(ip) = peer_ip {
                state.peer_ip = ip;
            }
            enter_is_master(state)
        }

        // `Idle` ignores everything but `Start`; any other combination
        // (e.g. a stray `ConfigChange` before `Start`) is recorded and
        // applied lazily at the next `Start`.
        (Status::Idle, Event::ConfigChange { my_ip, peer_ip }) => {
            if let Some(ip) = my_ip {
                state.my_ip = ip;
            }
            if let Some(ip) = peer_ip {
                state.peer_ip = ip;
            }
            vec![]
        }

        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(my_ip: Ipv4Addr, peer_ip: Ipv4Addr, health: PeerHealth) -> (ElectionState, Vec<Effect>) {
        let mut state = ElectionState {
            my_ip,
            peer_ip,
            peer_health: health,
            ..ElectionState::default()
        };
        let effects = step(&mut state, Event::Start);
        (state, effects)
    }

    #[test]
    fn role_determinism_both_healthy_complementary_roles() {
        let a = Ipv4Addr::new(10, 0, 0, 2);
        let b = Ipv4Addr::new(10, 0, 0, 1);

        let (state_a, _) = start(a, b, PeerHealth::Up);
        let (state_b, _) = start(b, a, PeerHealth::Up);

        assert_eq!(state_a.current_status, Status::Master);
        assert_eq!(state_b.current_status, Status::Slave);
    }

    #[test]
    fn tie_break_lower_ip_is_slave() {
        let lower = Ipv4Addr::new(10, 0, 0, 1);
        let higher = Ipv4Addr::new(10, 0, 0, 2);

        let (state, _) = start(lower, higher, PeerHealth::Up);
        assert_eq!(state.current_status, Status::Slave);
    }

    #[test]
    fn both_down_peer_yields_standalone_as_master() {
        let a = Ipv4Addr::new(10, 0, 0, 2);
        let b = Ipv4Addr::new(10, 0, 0, 1);

        let (state, _) = start(a, b, PeerHealth::Down);
        assert_eq!(state.current_status, Status::Standalone);
        assert_eq!(state.my_peer_id, MlagId::MASTER);
    }

    #[test]
    fn equal_ip_logs_and_does_not_transition() {
        let ip = Ipv4Addr::new(10, 0, 0, 5);
        let (state, effects) = start(ip, ip, PeerHealth::Up);

        assert_eq!(state.current_status, Status::Idle);
        assert!(matches!(effects.as_slice(), [Effect::LogError(_)]));
    }

    #[test]
    fn scenario_s2_slave_degrades_to_standalone_on_peer_down() {
        let lower = Ipv4Addr::new(10, 0, 0, 1);
        let higher = Ipv4Addr::new(10, 0, 0, 2);
        let (mut state, _) = start(lower, higher, PeerHealth::Up);
        assert_eq!(state.current_status, Status::Slave);

        let effects = step(&mut state, Event::PeerStatusChange { health: PeerHealth::Down });

        assert_eq!(state.current_status, Status::Standalone);
        assert_eq!(state.my_peer_id, MlagId::MASTER);
        assert!(matches!(
            effects.as_slice(),
            [Effect::SwitchStatusChange { prev: Status::Slave, curr: Status::Standalone, .. }]
        ));
    }

    #[test]
    fn scenario_s2_master_just_records_health_no_transition() {
        let higher = Ipv4Addr::new(10, 0, 0, 2);
        let lower = Ipv4Addr::new(10, 0, 0, 1);
        let (mut state, _) = start(higher, lower, PeerHealth::Up);
        assert_eq!(state.current_status, Status::Master);

        let effects = step(&mut state, Event::PeerStatusChange { health: PeerHealth::Down });

        assert_eq!(state.current_status, Status::Master);
        assert!(effects.is_empty());
    }

    #[test]
    fn stop_always_returns_to_idle() {
        let a = Ipv4Addr::new(10, 0, 0, 2);
        let b = Ipv4Addr::new(10, 0, 0, 1);
        let (mut state, _) = start(a, b, PeerHealth::Up);

        step(&mut state, Event::Stop);
        assert_eq!(state.current_status, Status::Idle);
    }

    #[test]
    fn config_change_recomputes_role() {
        let mut state = ElectionState::default();
        let effects = step(
            &mut state,
            Event::ConfigChange {
                my_ip: Some(Ipv4Addr::new(10, 0, 0, 2)),
                peer_ip: Some(Ipv4Addr::new(10, 0, 0, 1)),
            },
        );
        // `Idle` records config but does not resolve a role yet.
        assert_eq!(state.current_status, Status::Idle);
        assert!(effects.is_empty());

        step(&mut state, Event::Start);
        assert_eq!(state.current_status, Status::Master);
    }
}
