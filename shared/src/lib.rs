//! Shared protocol and session layer for the ninja-arena multiplayer game.
//!
//! The server and client crates both build on this one:
//! - [`message`] and [`codec`]: the framed ASCII wire protocol.
//! - [`payload`]: command-specific payload layouts.
//! - [`session`]: a TCP connection driven by paired receive/transmit
//!   workers over bounded queues.
//! - [`level`] and [`player`]: the game data that travels over the wire.
//! - [`error`]: the per-connection error taxonomy; nothing here is fatal
//!   to the whole process.

pub mod codec;
pub mod error;
pub mod level;
pub mod message;
pub mod payload;
pub mod player;
pub mod session;

pub use error::NetError;
pub use level::{Level, Tile, TileKind};
pub use message::{
    Command, Message, BROADCAST, SERVER_ID, UNDEFINED_ID, VICTORY_NINJA, VICTORY_SAMURAI,
};
pub use player::{Facing, Player, NINJA_SLOT, PLAYER_COUNT};
pub use session::Session;
