//! Client-side game state and per-command dispatch.
//!
//! The client never decides anything about the game: it mirrors what the
//! server tells it, answers position queries and asks permission to attack
//! by relaying a hit through the server.

use crate::network::NetClient;
use log::{debug, info, warn};
use shared::payload;
use shared::player::NINJA_SLOT;
use shared::{Command, Facing, Level, Message, Player, SERVER_ID, UNDEFINED_ID};
use std::time::{Duration, Instant};

/// Minimum delay between two outgoing attacks.
pub const ATTACK_COOLDOWN: Duration = Duration::from_millis(800);

/// Client lifecycle, advanced by server messages only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting for the session id.
    Connecting,
    /// Id adopted, level requested.
    Started,
    /// Level parsed, join requested.
    LevelReceived,
    /// Roster received, in the game.
    Playing,
    /// Dead, game over or connection lost.
    Finished,
}

/// Local mirror of the game world: the level and one entry per slot.
pub struct ClientGame {
    state: ClientState,
    slot: u8,
    level: Option<Level>,
    players: Vec<Player>,
    outcome: Option<String>,
}

impl ClientGame {
    pub fn new() -> Self {
        Self {
            state: ClientState::Connecting,
            slot: UNDEFINED_ID,
            level: None,
            players: Vec::new(),
            outcome: None,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub fn is_ninja(&self) -> bool {
        self.slot == NINJA_SLOT
    }

    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    pub fn outcome(&self) -> Option<&str> {
        self.outcome.as_deref()
    }

    pub fn adopt_slot(&mut self, slot: u8) {
        self.slot = slot;
        self.state = ClientState::Started;
    }

    /// Installs the level and spawns every slot's player at its marked
    /// starting tile, slot 0 as the ninja.
    pub fn set_level(&mut self, level: Level) {
        self.players = level
            .starting_positions()
            .iter()
            .enumerate()
            .map(|(slot, &(x, y))| {
                if slot as u8 == NINJA_SLOT {
                    Player::ninja(x, y)
                } else {
                    Player::samurai(x, y)
                }
            })
            .collect();
        self.level = Some(level);
        self.state = ClientState::LevelReceived;
    }

    /// Marks every listed slot active. The first roster after the join
    /// request puts the client in play.
    pub fn apply_roster(&mut self, ids: &[u8]) {
        for &id in ids {
            self.set_active(id, true);
        }
        if self.state == ClientState::LevelReceived {
            self.state = ClientState::Playing;
        }
    }

    pub fn set_active(&mut self, id: u8, active: bool) {
        if let Some(player) = self.players.get_mut(id as usize) {
            player.active = active;
        }
    }

    pub fn update_position(&mut self, id: u8, x: u16, y: u16, facing: Option<Facing>) {
        if let Some(player) = self.players.get_mut(id as usize) {
            player.x = x;
            player.y = y;
            if let Some(facing) = facing {
                player.facing = facing;
            }
        }
    }

    pub fn player(&self, id: u8) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.players.get(self.slot as usize)
    }

    /// Applies incoming damage to the local player and returns the
    /// remaining hit points, or `None` when no player has spawned yet.
    pub fn hit_local(&mut self, damage: u8) -> Option<u8> {
        self.players
            .get_mut(self.slot as usize)
            .map(|player| player.hit(damage))
    }

    pub fn finish(&mut self, outcome: Option<String>) {
        if outcome.is_some() {
            self.outcome = outcome;
        }
        self.state = ClientState::Finished;
    }

    pub fn is_finished(&self) -> bool {
        self.state == ClientState::Finished
    }
}

impl Default for ClientGame {
    fn default() -> Self {
        Self::new()
    }
}

/// Connected client: routes server messages into [`ClientGame`] and sends
/// the handshake, position answers and attacks back out.
pub struct GameClient {
    net: NetClient,
    game: ClientGame,
    last_attack: Option<Instant>,
}

impl GameClient {
    pub async fn connect(addr: &str) -> std::io::Result<Self> {
        Ok(Self {
            net: NetClient::connect(addr).await?,
            game: ClientGame::new(),
            last_attack: None,
        })
    }

    pub fn game(&self) -> &ClientGame {
        &self.game
    }

    pub fn is_finished(&self) -> bool {
        self.game.is_finished()
    }

    /// One dispatch pass: route everything the session received. A lost
    /// connection ends the game.
    pub fn handle_messages(&mut self) {
        for message in self.net.receive() {
            self.dispatch(message);
        }

        if !self.net.is_connected() && !self.game.is_finished() {
            warn!("connection to the server lost");
            self.game.finish(None);
        }
    }

    fn dispatch(&mut self, message: Message) {
        match message.command {
            Command::SessionId => match payload::parse_slot_id(&message.data) {
                Ok(id) => {
                    self.net.set_session_id(id);
                    self.game.adopt_slot(id);
                    let role = if self.game.is_ninja() { "ninja" } else { "samurai" };
                    info!("assigned session id {} ({})", id, role);
                    self.send_to_server(Command::Level, "");
                }
                Err(e) => warn!("ignoring session id: {}", e),
            },
            Command::Level => match Level::from_wire(&message.data) {
                Ok(level) => {
                    info!(
                        "received level {} ({}x{})",
                        level.number(),
                        level.width(),
                        level.height()
                    );
                    self.game.set_level(level);
                    self.send_to_server(Command::Active, "1");
                }
                Err(e) => warn!("ignoring level payload: {}", e),
            },
            Command::Players => match payload::parse_roster(&message.data) {
                Ok(ids) => {
                    debug!("roster update: {:?}", ids);
                    self.game.apply_roster(&ids);
                }
                Err(e) => warn!("ignoring roster: {}", e),
            },
            Command::Active => {
                self.game.set_active(message.source, message.data == "1");
            }
            Command::Close => {
                debug!("player {} left", message.source);
                self.game.set_active(message.source, false);
            }
            Command::QueryPosition => self.send_position(),
            Command::Position => match payload::parse_position(&message.data) {
                Ok((x, y, facing)) => {
                    self.game.update_position(message.source, x, y, facing);
                }
                Err(e) => warn!("ignoring position from {}: {}", message.source, e),
            },
            Command::Hit => match payload::parse_hit(&message.data) {
                Ok(damage) => match self.game.hit_local(damage) {
                    Some(remaining) => {
                        info!("took {} damage, {} hp left", damage, remaining);
                        if remaining == 0 {
                            info!("local player died");
                            self.game.finish(None);
                        }
                    }
                    None => debug!("hit from {} before spawn, ignored", message.source),
                },
                Err(e) => warn!("ignoring hit from {}: {}", message.source, e),
            },
            Command::EndGame => {
                info!("game over: {} victory", message.data);
                self.game.finish(Some(message.data));
            }
        }
    }

    /// Sends a hit to `target` unless the cooldown is still running.
    /// Returns whether the attack went out.
    pub fn try_attack(&mut self, target: u8) -> bool {
        if self.game.state() != ClientState::Playing {
            return false;
        }
        if let Some(last) = self.last_attack {
            if last.elapsed() < ATTACK_COOLDOWN {
                return false;
            }
        }
        let damage = match self.game.local_player() {
            Some(player) => player.damage(),
            None => return false,
        };

        self.net.send(Message::new(
            Command::Hit,
            self.net.session_id(),
            target,
            payload::encode_hit(damage),
        ));
        self.last_attack = Some(Instant::now());
        true
    }

    fn send_position(&self) {
        if let Some(player) = self.game.local_player() {
            self.send_to_server(
                Command::Position,
                payload::encode_position(player.x, player.y, player.facing),
            );
        }
    }

    fn send_to_server(&self, command: Command, data: impl Into<String>) {
        self.net
            .send(Message::new(command, self.net.session_id(), SERVER_ID, data));
    }

    /// Announces the departure, then stops the session.
    pub async fn stop(&mut self) {
        self.send_to_server(Command::Close, "0");
        self.net.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::codec::{self, Decoded};
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::sleep;

    const TEXT: &str = "WWWWWWW\n\
                        WN1 2EW\n\
                        W3 4 5W\n\
                        W  6  W\n\
                        WWWWWWW\n";

    async fn harness() -> (GameClient, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let connect = GameClient::connect(&addr);
        let accept = async { listener.accept().await.unwrap().0 };
        let (server_side, client) = tokio::join!(accept, connect);
        (client.unwrap(), server_side)
    }

    async fn feed(raw: &mut TcpStream, message: &Message) {
        raw.write_all(codec::encode(message).as_bytes())
            .await
            .unwrap();
    }

    async fn pump<F>(client: &mut GameClient, done: F) -> bool
    where
        F: Fn(&GameClient) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            client.handle_messages();
            if done(client) {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    async fn read_frame(raw: &mut TcpStream) -> Message {
        use tokio::io::AsyncReadExt;

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 256];
        while Instant::now() < deadline {
            match codec::decode(&buffer) {
                Decoded::Frame { message, consumed } => {
                    buffer.drain(..consumed);
                    return message;
                }
                Decoded::Incomplete => {}
                Decoded::Corrupt(reason) => panic!("corrupt frame from client: {}", reason),
            }
            match tokio::time::timeout(Duration::from_millis(100), raw.read(&mut chunk)).await {
                Ok(Ok(0)) => panic!("client closed the connection"),
                Ok(Ok(n)) => buffer.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => panic!("read failed: {}", e),
                Err(_) => {}
            }
        }
        panic!("no frame from the client within the deadline");
    }

    async fn join_as_ninja(client: &mut GameClient, raw: &mut TcpStream) {
        feed(raw, &Message::from_server(Command::SessionId, 0, "00")).await;
        assert!(pump(client, |c| c.game().state() == ClientState::Started).await);

        let request = read_frame(raw).await;
        assert_eq!(request.command, Command::Level);

        let level = Level::from_text(1, TEXT).unwrap();
        feed(raw, &Message::from_server(Command::Level, 0, level.to_wire())).await;
        assert!(pump(client, |c| c.game().state() == ClientState::LevelReceived).await);

        let join = read_frame(raw).await;
        assert_eq!(join.command, Command::Active);
        assert_eq!(join.data, "1");

        feed(raw, &Message::from_server(Command::Players, 0, "0")).await;
        assert!(pump(client, |c| c.game().state() == ClientState::Playing).await);
    }

    #[tokio::test]
    async fn adopts_session_id_and_requests_level() {
        let (mut client, mut raw) = harness().await;

        feed(&mut raw, &Message::from_server(Command::SessionId, 0, "00")).await;
        assert!(pump(&mut client, |c| c.game().slot() == 0).await);
        assert!(client.game().is_ninja());
        assert_eq!(client.game().state(), ClientState::Started);

        let request = read_frame(&mut raw).await;
        assert_eq!(request.command, Command::Level);
        assert_eq!(request.source, 0);
        assert_eq!(request.destination, SERVER_ID);
        assert_eq!(request.data, "");
    }

    #[tokio::test]
    async fn spawns_players_at_level_markers() {
        let (mut client, mut raw) = harness().await;
        join_as_ninja(&mut client, &mut raw).await;

        // Ninja spawn is the N tile of the fixture.
        let local = client.game().local_player().unwrap();
        assert_eq!((local.x, local.y), (1, 1));
        assert!(local.active);

        // Samurai 6 spawns at its digit tile, inactive until announced.
        let samurai = client.game().player(6).unwrap();
        assert_eq!((samurai.x, samurai.y), (3, 3));
        assert!(!samurai.active);
    }

    #[tokio::test]
    async fn attack_cooldown_blocks_the_second_swing() {
        let (mut client, mut raw) = harness().await;
        join_as_ninja(&mut client, &mut raw).await;

        assert!(client.try_attack(3));
        let hit = read_frame(&mut raw).await;
        assert_eq!(hit.command, Command::Hit);
        assert_eq!(hit.destination, 3);
        assert_eq!(hit.data, "01"); // ninja damage

        // Within the cooldown window nothing is sent.
        assert!(!client.try_attack(3));
    }

    #[tokio::test]
    async fn lethal_damage_finishes_the_game() {
        let (mut client, mut raw) = harness().await;
        join_as_ninja(&mut client, &mut raw).await;

        // Five samurai hits of 2 exhaust 10 hp.
        for _ in 0..5 {
            feed(&mut raw, &Message::new(Command::Hit, 3, 0, "02")).await;
        }
        assert!(pump(&mut client, |c| c.is_finished()).await);
        assert_eq!(client.game().local_player().unwrap().hp(), 0);

        // Dead players cannot attack.
        assert!(!client.try_attack(3));
    }

    #[tokio::test]
    async fn end_game_surfaces_the_outcome() {
        let (mut client, mut raw) = harness().await;
        join_as_ninja(&mut client, &mut raw).await;

        feed(
            &mut raw,
            &Message::from_server(Command::EndGame, shared::BROADCAST, shared::VICTORY_SAMURAI),
        )
        .await;
        assert!(pump(&mut client, |c| c.is_finished()).await);
        assert_eq!(client.game().outcome(), Some(shared::VICTORY_SAMURAI));
    }

    #[tokio::test]
    async fn hit_before_spawn_does_not_kill() {
        let (mut client, mut raw) = harness().await;

        feed(&mut raw, &Message::from_server(Command::SessionId, 0, "00")).await;
        assert!(pump(&mut client, |c| c.game().state() == ClientState::Started).await);

        // Damage arriving before the level has nobody to land on.
        feed(&mut raw, &Message::new(Command::Hit, 3, 0, "02")).await;
        for _ in 0..30 {
            client.handle_messages();
            sleep(Duration::from_millis(10)).await;
        }
        assert!(!client.is_finished());

        // The join continues normally and the player spawns at full hp.
        let request = read_frame(&mut raw).await;
        assert_eq!(request.command, Command::Level);
        let level = Level::from_text(1, TEXT).unwrap();
        feed(&mut raw, &Message::from_server(Command::Level, 0, level.to_wire())).await;
        assert!(pump(&mut client, |c| c.game().state() == ClientState::LevelReceived).await);
        assert_eq!(
            client.game().local_player().unwrap().hp(),
            shared::player::MAX_HP
        );
    }

    #[tokio::test]
    async fn position_updates_track_remote_players() {
        let (mut client, mut raw) = harness().await;
        join_as_ninja(&mut client, &mut raw).await;

        feed(&mut raw, &Message::broadcast(Command::Position, 3, "004002e")).await;
        assert!(pump(&mut client, |c| {
            c.game().player(3).is_some_and(|p| (p.x, p.y) == (4, 2))
        })
        .await);
        assert_eq!(client.game().player(3).unwrap().facing, Facing::East);
    }

    #[tokio::test]
    async fn answers_position_queries() {
        let (mut client, mut raw) = harness().await;
        join_as_ninja(&mut client, &mut raw).await;

        feed(&mut raw, &Message::from_server(Command::QueryPosition, 0, "")).await;
        for _ in 0..30 {
            client.handle_messages();
            sleep(Duration::from_millis(10)).await;
        }

        let position = read_frame(&mut raw).await;
        assert_eq!(position.command, Command::Position);
        assert_eq!(position.source, 0);
        assert_eq!(position.data, "001001s"); // spawn tile, facing south
    }
}
