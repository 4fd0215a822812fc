//! The error taxonomy shared across the core (spec §7).
use std::fmt;

use thiserror::Error;

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

/// A core-level error, carrying enough information to be mapped back to a
/// POSIX-style negative return code at the API boundary (`to_errno`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Out-of-range or null input at the API boundary.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Operation called before init/start, or on a non-existent entity.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    /// Lookup of an unknown peer, IPL, or opcode.
    #[error("not found: {0}")]
    NotFound(String),
    /// Socket, file, or timer backend failure.
    #[error("i/o error: {0}")]
    Io(String),
    /// A bounded wait (stop-done, port-delete-done) expired.
    #[error("operation timed out: {0}")]
    Timeout(String),
    /// IPv6 was requested for the IPL link, which is unsupported.
    #[error("address family not supported")]
    AddressFamilyUnsupported,
    /// The peer or IPL registry is at capacity.
    #[error("registry full: {0}")]
    Full(String),
}

impl Error {
    /// Construct an [`Error::InvalidArgument`] with the given context.
    pub fn invalid(context: impl fmt::Display) -> Self {
        Self::InvalidArgument(context.to_string())
    }

    /// Construct an [`Error::NotFound`] with the given context.
    pub fn not_found(context: impl fmt::Display) -> Self {
        Self::NotFound(context.to_string())
    }

    /// Construct a [`Error::PreconditionFailed`] with the given context.
    pub fn precondition(context: impl fmt::Display) -> Self {
        Self::PreconditionFailed(context.to_string())
    }

    /// The POSIX-style negative errno this error maps to at the API edge
    /// (spec §7's propagation table).
    pub fn to_errno(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => -libc_einval(),
            Self::PreconditionFailed(_) => -libc_eperm(),
            Self::NotFound(_) => -libc_enoent(),
            Self::Io(_) => -libc_eio(),
            Self::Timeout(_) => -libc_etimedout(),
            Self::AddressFamilyUnsupported => -libc_eafnosupport(),
            Self::Full(_) => -libc_enospc(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// The core has no direct libc dependency (it never shells out, per the
// REDESIGN FLAGS in spec §9); these mirror the fixed POSIX constants the
// API boundary is documented to return.
const fn libc_einval() -> i32 {
    22
}
const fn libc_eperm() -> i32 {
    1
}
const fn libc_enoent() -> i32 {
    2
}
const fn libc_eio() -> i32 {
    5
}
const fn libc_etimedout() -> i32 {
    110
}
const fn libc_eafnosupport() -> i32 {
    97
}
const fn libc_enospc() -> i32 {
    28
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_variant_to_its_documented_errno() {
        assert_eq!(Error::invalid("x").to_errno(), -22);
        assert_eq!(Error::precondition("x").to_errno(), -1);
        assert_eq!(Error::not_found("x").to_errno(), -2);
        assert_eq!(Error::Io("x".into()).to_errno(), -5);
        assert_eq!(Error::Timeout("x".into()).to_errno(), -110);
        assert_eq!(Error::AddressFamilyUnsupported.to_errno(), -97);
        assert_eq!(Error::Full("x".into()).to_errno(), -28);
    }
}
