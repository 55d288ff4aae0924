//! Protocol message model shared by the server and client crates.

/// Source id used by messages originating from the server.
pub const SERVER_ID: u8 = 99;
/// Destination id addressing every connected session.
pub const BROADCAST: u8 = 99;
/// Placeholder id for a client that has not yet been assigned a slot.
pub const UNDEFINED_ID: u8 = 98;

/// Payload carried by an end-game message when the ninja wins.
pub const VICTORY_NINJA: &str = "ninja";
/// Payload carried by an end-game message when the samurai win.
pub const VICTORY_SAMURAI: &str = "samourais";

/// Closed set of protocol commands, one 3-character ASCII token each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Server-assigned slot id for a new connection.
    SessionId,
    /// Player position (and facing) update.
    Position,
    /// Level transfer, or a client's request for one.
    Level,
    /// A player became active or inactive.
    Active,
    /// Comma-joined list of active slot ids.
    Players,
    /// A session is closing.
    Close,
    /// Damage dealt to a single target.
    Hit,
    /// Server asking a client to report its position.
    QueryPosition,
    /// Game over, payload names the winning side.
    EndGame,
}

impl Command {
    /// Wire token for this command.
    pub const fn token(self) -> &'static str {
        match self {
            Command::SessionId => "SID",
            Command::Position => "POS",
            Command::Level => "LVL",
            Command::Active => "ACT",
            Command::Players => "PLL",
            Command::Close => "CLO",
            Command::Hit => "HIT",
            Command::QueryPosition => "QPO",
            Command::EndGame => "END",
        }
    }

    /// Maps a wire token back to a command, `None` for unknown tokens.
    pub fn from_token(token: &str) -> Option<Command> {
        match token {
            "SID" => Some(Command::SessionId),
            "POS" => Some(Command::Position),
            "LVL" => Some(Command::Level),
            "ACT" => Some(Command::Active),
            "PLL" => Some(Command::Players),
            "CLO" => Some(Command::Close),
            "HIT" => Some(Command::Hit),
            "QPO" => Some(Command::QueryPosition),
            "END" => Some(Command::EndGame),
            _ => None,
        }
    }
}

/// One protocol message: a command, two 2-digit endpoint ids and a
/// command-specific UTF-8 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub command: Command,
    pub source: u8,
    pub destination: u8,
    pub data: String,
}

impl Message {
    pub fn new(
        command: Command,
        source: u8,
        destination: u8,
        data: impl Into<String>,
    ) -> Self {
        debug_assert!(source <= 99 && destination <= 99);
        Self {
            command,
            source,
            destination,
            data: data.into(),
        }
    }

    /// Message originating from the server.
    pub fn from_server(command: Command, destination: u8, data: impl Into<String>) -> Self {
        Self::new(command, SERVER_ID, destination, data)
    }

    /// Message addressed to every connected session.
    pub fn broadcast(command: Command, source: u8, data: impl Into<String>) -> Self {
        Self::new(command, source, BROADCAST, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_roundtrip() {
        let commands = [
            Command::SessionId,
            Command::Position,
            Command::Level,
            Command::Active,
            Command::Players,
            Command::Close,
            Command::Hit,
            Command::QueryPosition,
            Command::EndGame,
        ];

        for command in commands {
            assert_eq!(command.token().len(), 3);
            assert_eq!(Command::from_token(command.token()), Some(command));
        }
    }

    #[test]
    fn unknown_token_rejected() {
        assert_eq!(Command::from_token("XXX"), None);
        assert_eq!(Command::from_token(""), None);
        assert_eq!(Command::from_token("sid"), None);
    }

    #[test]
    fn broadcast_addresses_everyone() {
        let message = Message::broadcast(Command::Position, 2, "001002n");
        assert_eq!(message.destination, BROADCAST);
        assert_eq!(message.source, 2);
    }

    #[test]
    fn server_messages_carry_server_source() {
        let message = Message::from_server(Command::SessionId, 0, "00");
        assert_eq!(message.source, SERVER_ID);
        assert_eq!(message.destination, 0);
    }
}
