//! Top-level facade re-exporting the workspace's crates, mirroring how
//! `nakamoto`'s root crate gates its workspace members behind its own
//! `[dependencies]` table.
pub use mlag_common as common;
pub use mlag_ffi as ffi;
pub use mlag_net as net;
pub use mlag_proto as proto;
