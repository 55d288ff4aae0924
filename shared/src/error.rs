//! Error taxonomy for the network layer.
//!
//! Nothing here is fatal to the process: corruption discards a buffer but
//! keeps the connection, lost connections tear down one session, capacity
//! refusals reject one accept, and malformed payloads drop one message.
//! Only failing to bind the listening socket aborts startup, and that is
//! surfaced as a plain I/O error by the server facade.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    /// Malformed frame header or command token; the receive buffer was
    /// discarded but the connection stays up.
    #[error("protocol corruption: {0}")]
    ProtocolCorruption(&'static str),

    /// Socket-level failure; the session is torn down and its slot freed.
    #[error("connection lost: {0}")]
    ConnectionLost(#[from] std::io::Error),

    /// Accept attempted with every connection slot claimed.
    #[error("connection refused: no free session slot")]
    CapacityExceeded,

    /// A payload field did not match its declared layout; the message is
    /// ignored and no state is mutated.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
