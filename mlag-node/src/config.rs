//! Daemon configuration (teacher: `p2p::fsm::Config`, `p2p::fsm::Limits` —
//! a plain struct with a `Default` impl and a `from(..)`-style
//! constructor, validated at the API edge per spec §6/§7).
use std::net::Ipv4Addr;
use std::time::Duration;

use mlag_net::timer::DEFAULT_RELOAD_DELAY;

/// Startup configuration for [`crate::run`].
#[derive(Debug, Clone)]
pub struct Config {
    /// This node's own IPL ip, if already known at startup.
    pub local_ip: Option<Ipv4Addr>,
    /// The peer's IPL ip, if already known at startup.
    pub peer_ip: Option<Ipv4Addr>,
    /// TCP port the peer transport listens/connects on (spec §6).
    pub listen_port: u16,
    /// TCP port the tunneling dispatcher's parallel endpoint binds
    /// (spec §5).
    pub tunnel_port: u16,
    /// Local port the API/RPC receive thread's control socket binds.
    pub control_port: u16,
    /// Reload-delay window (spec §6, default 30 000 ms).
    pub reload_delay: Duration,
    /// How long the mlag dispatcher's `poll` call blocks between wake-ups.
    pub poll_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_ip: None,
            peer_ip: None,
            listen_port: 7000,
            tunnel_port: 7001,
            control_port: 7002,
            reload_delay: DEFAULT_RELOAD_DELAY,
            poll_timeout: Duration::from_millis(200),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_are_distinct_and_ips_unset() {
        let c = Config::default();
        assert_eq!(c.local_ip, None);
        assert_eq!(c.peer_ip, None);
        assert_ne!(c.listen_port, c.tunnel_port);
        assert_ne!(c.listen_port, c.control_port);
        assert_ne!(c.tunnel_port, c.control_port);
        assert_eq!(c.reload_delay, DEFAULT_RELOAD_DELAY);
    }
}
