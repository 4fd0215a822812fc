//! The peer and topology registries (spec §4.1/§4.2, components C1/C2).
pub mod ipl;
pub mod peer;

pub use ipl::{IplRecord, IplRegistry, OperState};
pub use peer::{PeerRecord, PeerRegistry, PeerSnapshot};
