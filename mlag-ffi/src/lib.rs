//! Thin request/response API facade over the mlag core (spec §1, §6).
//!
//! This crate owns no state of its own: a [`handle::Handle`] is just a
//! cloneable command-channel sender plus a wake handle into whichever
//! reactor `mlag-node` is driving, with POSIX-style error remapping
//! (spec §7) at the boundary.
#![warn(missing_docs)]

pub mod error;
pub mod handle;

pub use error::{FacadeError, Result};
pub use handle::Handle;
