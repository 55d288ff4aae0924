//! # Game Server Library
//!
//! Authoritative server for the ninja-arena multiplayer game. It owns the
//! connection slot pool, relays and arbitrates client messages, and decides
//! the outcome of the game.
//!
//! ## Module Organization
//!
//! - [`pool`]: the fixed pool of 7 connection slots (1 ninja + 6 samurai),
//!   sole owner of session lifetime.
//! - [`network`]: the accept worker and the session multiplexer
//!   (broadcast, all-but-one, unicast, drain-all).
//! - [`game`]: per-command dispatch rules, the active roster and
//!   end-of-game arbitration.
//!
//! ## Architecture
//!
//! Each session runs its own receive/transmit worker pair, the listener
//! runs on its own task, and the dispatcher drains every session from a
//! single control loop on a fixed cadence. The slot pool is the only state
//! shared between the listener and the dispatcher and sits behind one lock.

pub mod game;
pub mod network;
pub mod pool;
