//! Server-side application dispatch: per-command routing rules, the active
//! roster and end-of-game arbitration.

use crate::network::NetServer;
use log::{debug, info, warn};
use shared::payload;
use shared::player::NINJA_SLOT;
use shared::{Command, Level, Message, VICTORY_NINJA, VICTORY_SAMURAI};
use std::time::Duration;

/// Built-in arena used when no level file is supplied.
pub const DEFAULT_LEVEL: &str = "\
WWWWWWWWWWWWWWWWWWWW\n\
W1     S       2   W\n\
W   S         S    W\n\
W3       N        4W\n\
W   SS        S    W\n\
W        E         W\n\
W  S        SS     W\n\
W5     S        6  W\n\
W          S       W\n\
WWWWWWWWWWWWWWWWWWWW\n";

/// Outcome of an end-of-game evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victory {
    Ninja,
    Samurai,
}

impl Victory {
    pub const fn token(self) -> &'static str {
        match self {
            Victory::Ninja => VICTORY_NINJA,
            Victory::Samurai => VICTORY_SAMURAI,
        }
    }
}

/// End-of-game rule, evaluated against the roster after `closed` was
/// removed from it:
/// - empty roster: nobody left to win, the caller logs and stands down;
/// - the ninja closed while others remain: the samurai win;
/// - only the ninja remains: the ninja wins.
pub fn decide_victory(roster: &[u8], closed: u8) -> Option<Victory> {
    if roster.is_empty() {
        None
    } else if closed == NINJA_SLOT {
        Some(Victory::Samurai)
    } else if roster.len() == 1 && roster[0] == NINJA_SLOT {
        Some(Victory::Ninja)
    } else {
        None
    }
}

/// Adds `id` unless already present. Returns whether the roster changed.
fn roster_join(roster: &mut Vec<u8>, id: u8) -> bool {
    if roster.contains(&id) {
        false
    } else {
        roster.push(id);
        true
    }
}

/// Removes `id` if present. Removing twice is a no-op.
fn roster_remove(roster: &mut Vec<u8>, id: u8) -> bool {
    let before = roster.len();
    roster.retain(|entry| *entry != id);
    roster.len() != before
}

/// The authoritative game server: consumes every message the multiplexer
/// received, mutates the roster and issues replies and relays.
pub struct GameServer {
    net: NetServer,
    level: Level,
    roster: Vec<u8>,
    game_started: bool,
}

impl GameServer {
    pub fn new(net: NetServer, level: Level) -> Self {
        Self {
            net,
            level,
            roster: Vec::new(),
            game_started: false,
        }
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.net.local_addr()
    }

    /// One dispatch pass: drain every session, route each message, then
    /// reclaim sessions that died without a close message and treat them
    /// as implicit closes.
    pub async fn handle_messages(&mut self) {
        for message in self.net.receive_all().await {
            self.dispatch(message).await;
        }

        for id in self.net.sweep_dead().await {
            self.handle_close(id, "0".to_string()).await;
        }
    }

    /// Dispatch loop for the server binary: drains on a fixed cadence.
    pub async fn run(&mut self, tick: Duration) {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;
            self.handle_messages().await;
        }
    }

    pub async fn stop(&mut self) {
        self.net.stop().await;
    }

    async fn dispatch(&mut self, message: Message) {
        match message.command {
            Command::Position => {
                // Relay verbatim so every peer can render this player.
                let relay = Message::broadcast(Command::Position, message.source, message.data);
                self.net.send_to_all_but(relay, message.source).await;
            }
            Command::Level => self.handle_level_request(message.source).await,
            Command::Active => self.handle_join(message.source).await,
            Command::Close => {
                let source = message.source;
                self.handle_close(source, message.data).await;
            }
            Command::Hit => {
                // One named target, never a broadcast.
                if message.destination == shared::BROADCAST {
                    warn!(
                        "ignoring broadcast-addressed hit from {}",
                        message.source
                    );
                } else {
                    debug!(
                        "relaying hit from {} to {}",
                        message.source, message.destination
                    );
                    self.net.send(message).await;
                }
            }
            Command::SessionId | Command::Players | Command::QueryPosition | Command::EndGame => {
                debug!(
                    "ignoring server-originated command {:?} from {}",
                    message.command, message.source
                );
            }
        }
    }

    /// Replies with the level and the roster as it stood before this
    /// client, and announces the newcomer to everyone else. The ninja's
    /// request arms end-of-game evaluation.
    async fn handle_level_request(&mut self, source: u8) {
        info!("client {} requested the level", source);
        self.net
            .send(Message::from_server(
                Command::Level,
                source,
                self.level.to_wire(),
            ))
            .await;
        self.net
            .send(Message::from_server(
                Command::Players,
                source,
                payload::encode_roster(&self.roster),
            ))
            .await;
        self.net
            .send_to_all_but(Message::broadcast(Command::Active, source, "1"), source)
            .await;

        if source == NINJA_SLOT && !self.game_started {
            self.game_started = true;
            info!("ninja joined, the game can now be decided");
        }
    }

    /// Joins the requester, replies with the updated roster, announces the
    /// join and asks the newcomer for its starting position.
    async fn handle_join(&mut self, source: u8) {
        if roster_join(&mut self.roster, source) {
            info!("client {} joined the roster {:?}", source, self.roster);
        }
        self.net
            .send(Message::from_server(
                Command::Players,
                source,
                payload::encode_roster(&self.roster),
            ))
            .await;
        self.net
            .send_to_all_but(Message::broadcast(Command::Active, source, "1"), source)
            .await;
        self.net
            .send(Message::from_server(Command::QueryPosition, source, ""))
            .await;
    }

    /// Removes the source from the roster, relays the close, frees the
    /// slot and arbitrates the outcome.
    async fn handle_close(&mut self, source: u8, data: String) {
        let removed = roster_remove(&mut self.roster, source);
        if removed {
            info!("client {} left the roster {:?}", source, self.roster);
        }

        self.net
            .send_to_all_but(Message::broadcast(Command::Close, source, data), source)
            .await;
        self.net.close_session(source).await;

        if self.game_started && removed {
            self.evaluate_end_game(source).await;
        }
    }

    async fn evaluate_end_game(&mut self, closed: u8) {
        match decide_victory(&self.roster, closed) {
            Some(victory) => {
                info!("game over: {:?} victory", victory);
                self.net
                    .send(Message::from_server(
                        Command::EndGame,
                        shared::BROADCAST,
                        victory.token(),
                    ))
                    .await;
                // Decided once; later departures are just cleanup.
                self.game_started = false;
            }
            None if self.roster.is_empty() => {
                // Everyone left before a decision: no contest. Stand down
                // and let a fresh roster start over.
                warn!("all players disconnected, game ends without a winner");
                self.game_started = false;
            }
            None => {}
        }
    }
}
