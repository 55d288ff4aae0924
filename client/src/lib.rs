//! # Game Client Library
//!
//! Client side of the ninja-arena multiplayer game. The client holds a
//! mirror of the world and trusts the server completely: it adopts the
//! session id it is given, renders whatever roster and positions arrive,
//! and asks the server to relay its attacks.
//!
//! ## Module Organization
//!
//! - [`network`]: the single session to the server and the id it was
//!   assigned.
//! - [`game`]: the local world mirror, the client lifecycle state machine
//!   and per-command dispatch.
//!
//! The join handshake is driven entirely by server messages: a session id
//! triggers the level request, the level triggers the join request, and
//! the roster reply puts the client in play.

pub mod game;
pub mod network;
