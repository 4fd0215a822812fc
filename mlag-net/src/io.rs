//! The effect types a [`crate::reactor::StateMachine`] hands back to the
//! reactor, instead of performing I/O inline (REDESIGN FLAGS, spec §9: "FSM
//! framework" — effects are returned as values, not executed inside the
//! transition). Grounded on `nakamoto_net::Io` / `Link` / `Disconnect`, used
//! throughout the teacher's `p2p::fsm`.
use std::fmt;
use std::net::SocketAddr;

/// Whether a connection was accepted (`Inbound`) or dialed (`Outbound`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// We accepted this connection (we are the Master, listening).
    Inbound,
    /// We dialed this connection (we are the Slave, connecting to Master).
    Outbound,
}

impl Link {
    /// Whether this is an outbound (dialed) connection.
    pub fn is_outbound(&self) -> bool {
        matches!(self, Self::Outbound)
    }
}

/// Why a peer connection was torn down.
#[derive(Debug, Clone)]
pub enum Disconnect<R> {
    /// The state machine requested the disconnect, for the given reason.
    StateMachine(R),
    /// The connection was closed or reset by the transport layer, with one
    /// of the errno-equivalents named in spec §4.4 ("CONN_RESET",
    /// "PIPE_BROKEN", "TIMEOUT", "NOT_CONN").
    ConnectionError(String),
}

impl<R: fmt::Display> fmt::Display for Disconnect<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateMachine(r) => write!(f, "{r}"),
            Self::ConnectionError(e) => write!(f, "connection error: {e}"),
        }
    }
}

/// An effect produced by a state machine step, to be carried out by the
/// reactor. `M` is the wire message type, `E` the state machine's own event
/// type, `R` its disconnect-reason type.
#[derive(Debug, Clone)]
pub enum Io<M, E, R> {
    /// Write `M` to the peer at `SocketAddr`.
    Write(SocketAddr, M),
    /// Dial the peer at `SocketAddr` (Slave role only, spec §4.4).
    Connect(SocketAddr),
    /// Tear down the connection to `SocketAddr`.
    Disconnect(SocketAddr, Disconnect<R>),
    /// An event to be delivered back into the state machine itself (used to
    /// re-inject decoded peer messages as system events, spec §2 / §5, so
    /// that everything interleaves on the one dispatcher thread).
    Event(E),
}
