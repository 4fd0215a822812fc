//! POSIX code remap at the API boundary (spec §7: "the external API
//! returns POSIX-style negative integer codes mapped from the
//! taxonomy"). Everywhere else in the core, errors stay as
//! [`mlag_common::error::Error`]; this module is the one place that
//! collapses them to a C-callable `i32`.
use mlag_common::error::Error;

/// An API call failed. Wraps the core's error taxonomy; [`FacadeError::code`]
/// gives the POSIX code a caller on the other side of the control socket
/// would see.
#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct FacadeError(#[from] pub Error);

impl FacadeError {
    /// The negative `errno`-style code for this failure (spec §7 mapping
    /// table).
    pub fn code(&self) -> i32 {
        self.0.to_errno()
    }
}

/// Shorthand for facade call results.
pub type Result<T> = std::result::Result<T, FacadeError>;
