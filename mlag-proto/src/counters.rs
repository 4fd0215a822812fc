//! Per-module counters (spec §4.9, component C9): transport tx/rx,
//! manager tx/rx, and master-election event counts.
use mlag_common::counters::{Counter, CounterBlock};

/// Transport-layer send/receive/error counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportCounters {
    /// Messages sent.
    pub tx: Counter,
    /// Messages received.
    pub rx: Counter,
    /// Reconnect attempts started.
    pub reconnects: Counter,
    /// Connection errors observed.
    pub errors: Counter,
}

impl CounterBlock for TransportCounters {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn fields(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("tx", self.tx.0),
            ("rx", self.rx.0),
            ("reconnects", self.reconnects.0),
            ("errors", self.errors.0),
        ]
    }
}

/// Manager-level orchestration counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerCounters {
    /// `PEER_ENABLE` messages sent.
    pub peer_enable_tx: Counter,
    /// `PEER_ENABLE` messages received.
    pub peer_enable_rx: Counter,
    /// Reload-delay timer expirations observed.
    pub reload_delay_expired: Counter,
    /// `STOP_DONE` timeouts observed (spec §8 property 8).
    pub stop_timeouts: Counter,
}

impl CounterBlock for ManagerCounters {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn fields(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("peer_enable_tx", self.peer_enable_tx.0),
            ("peer_enable_rx", self.peer_enable_rx.0),
            ("reload_delay_expired", self.reload_delay_expired.0),
            ("stop_timeouts", self.stop_timeouts.0),
        ]
    }
}

/// Master-election event counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElectionCounters {
    /// Role transitions into Master.
    pub became_master: Counter,
    /// Role transitions into Slave.
    pub became_slave: Counter,
    /// Role transitions into Standalone.
    pub became_standalone: Counter,
    /// Equal-ip misconfigurations logged (spec §8 scenario S3).
    pub equal_ip_errors: Counter,
}

impl CounterBlock for ElectionCounters {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn fields(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("became_master", self.became_master.0),
            ("became_slave", self.became_slave.0),
            ("became_standalone", self.became_standalone.0),
            ("equal_ip_errors", self.equal_ip_errors.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn election_counters_clear_resets_all_fields() {
        let mut c = ElectionCounters::default();
        c.became_master.incr();
        c.equal_ip_errors.incr();
        c.clear();
        assert_eq!(c.fields(), vec![
            ("became_master", 0),
            ("became_slave", 0),
            ("became_standalone", 0),
            ("equal_ip_errors", 0),
        ]);
    }
}
