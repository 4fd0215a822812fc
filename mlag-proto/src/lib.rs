//! The MLAG peer-coordination protocol core: registries (C1/C2),
//! master-election and peering FSMs (C5/C6), and the orchestrating
//! manager (C7) that wires them to `mlag-net`'s reactor and transport.
#![warn(missing_docs)]

pub mod counters;
pub mod election;
pub mod event;
pub mod hal;
pub mod manager;
pub mod peering;
pub mod registry;
pub mod wire;

pub use event::{Command, SystemEvent};
pub use manager::{Core, CoreSnapshot, ManagerConfig};
