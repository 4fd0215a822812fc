//! Counter scaffolding shared by transport, manager, and master-election
//! telemetry (spec §4.9, component C9). Grounded on the per-module counter
//! structs in `original_source/src/libs/mlag_manager/mlag_manager.h`.
use std::fmt;

/// A single named, monotonically increasing counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter(pub u64);

impl Counter {
    /// Increment by one.
    pub fn incr(&mut self) {
        self.0 += 1;
    }
}

/// Common behavior every per-module counter block exposes: `clear` zeros
/// every field, `get` returns a snapshot copy, `dump` renders a
/// human-readable snapshot either via the given callback or, if none is
/// given, via the `log` facade.
pub trait CounterBlock: Clone + fmt::Debug {
    /// Zero every counter.
    fn clear(&mut self);

    /// Render this block's counters as `(name, value)` pairs, in
    /// declaration order.
    fn fields(&self) -> Vec<(&'static str, u64)>;

    /// Copy the current values.
    fn get(&self) -> Self {
        self.clone()
    }

    /// Render a snapshot either to `callback`, or to the log at info level
    /// when `callback` is `None` (spec §4.9: "via callback or via logging
    /// when callback is null").
    fn dump(&self, callback: Option<&mut dyn FnMut(&str)>) {
        match callback {
            Some(cb) => {
                for (name, value) in self.fields() {
                    cb(&format!("{name} = {value}"));
                }
            }
            None => {
                for (name, value) in self.fields() {
                    log::info!(target: "counters", "{name} = {value}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Block {
        tx: Counter,
        rx: Counter,
    }

    impl CounterBlock for Block {
        fn clear(&mut self) {
            *self = Self::default();
        }

        fn fields(&self) -> Vec<(&'static str, u64)> {
            vec![("tx", self.tx.0), ("rx", self.rx.0)]
        }
    }

    #[test]
    fn clear_zeros_all_fields() {
        let mut b = Block::default();
        b.tx.incr();
        b.rx.incr();
        b.clear();
        assert_eq!(b.fields(), vec![("tx", 0), ("rx", 0)]);
    }

    #[test]
    fn dump_invokes_callback_once_per_field() {
        let mut b = Block::default();
        b.tx.incr();

        let mut seen = Vec::new();
        let mut cb = |line: &str| seen.push(line.to_string());
        b.dump(Some(&mut cb));

        assert_eq!(seen, vec!["tx = 1", "rx = 0"]);
    }
}
