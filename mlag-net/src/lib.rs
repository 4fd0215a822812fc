//! The poll-based reactor, role-aware peer transport mechanics, and timers
//! underlying the core (spec §4.3, §4.4, §4.8 — components C3, C4, C8).
#![warn(missing_docs)]

pub mod io;
pub mod reactor;
pub mod timer;
pub mod wire;

pub use io::{Disconnect, Io, Link};
pub use reactor::{Error, Reactor, StateMachine, WakeHandle};
pub use timer::{Barrier, OneShotTimer};
