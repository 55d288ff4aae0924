//! Wire codec for the framed ASCII protocol.
//!
//! A frame is `CMD(3) SRC(2) DST(2) LEN(5) DATA(LEN)` with no delimiters.
//! The stream carries no sync markers, so a malformed header makes the rest
//! of the buffer unrecoverable: decoding reports it as corrupt and the
//! caller discards everything it has buffered.

use crate::message::{Command, Message};

pub const CMD_BYTES: usize = 3;
pub const SRC_BYTES: usize = 2;
pub const DEST_BYTES: usize = 2;
pub const DATA_LENGTH_BYTES: usize = 5;

pub const CMD_OFFSET: usize = 0;
pub const SRC_OFFSET: usize = CMD_OFFSET + CMD_BYTES;
pub const DEST_OFFSET: usize = SRC_OFFSET + SRC_BYTES;
pub const DATA_LENGTH_OFFSET: usize = DEST_OFFSET + DEST_BYTES;

/// Fixed header size: command, source, destination and payload length.
pub const HEADER_BYTES: usize = CMD_BYTES + SRC_BYTES + DEST_BYTES + DATA_LENGTH_BYTES;

/// Largest payload the 5-digit length field can declare.
pub const MAX_DATA_LEN: usize = 99999;

/// Outcome of one decode attempt against a reassembly buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// One complete frame; `consumed` bytes must be removed from the buffer.
    Frame { message: Message, consumed: usize },
    /// Not enough bytes yet; consume nothing and wait for more.
    Incomplete,
    /// Malformed header; the entire buffer must be discarded.
    Corrupt(&'static str),
}

/// Encodes a message into its wire representation.
///
/// The payload length is taken from the data's byte length; payloads above
/// [`MAX_DATA_LEN`] violate the protocol invariant and are a caller bug.
pub fn encode(message: &Message) -> String {
    debug_assert!(message.data.len() <= MAX_DATA_LEN);
    format!(
        "{}{:02}{:02}{:05}{}",
        message.command.token(),
        message.source,
        message.destination,
        message.data.len(),
        message.data
    )
}

/// Attempts to decode one frame from the front of `buffer`.
///
/// Field validation order follows the protocol contract: the numeric fields
/// are checked digit-by-digit before the declared length is trusted, and the
/// command token is matched against the closed command set.
pub fn decode(buffer: &[u8]) -> Decoded {
    if buffer.len() < HEADER_BYTES {
        return Decoded::Incomplete;
    }

    let source = match parse_digits(&buffer[SRC_OFFSET..SRC_OFFSET + SRC_BYTES]) {
        Some(id) => id as u8,
        None => return Decoded::Corrupt("non-digit source field"),
    };

    let destination = match parse_digits(&buffer[DEST_OFFSET..DEST_OFFSET + DEST_BYTES]) {
        Some(id) => id as u8,
        None => return Decoded::Corrupt("non-digit destination field"),
    };

    let data_length =
        match parse_digits(&buffer[DATA_LENGTH_OFFSET..DATA_LENGTH_OFFSET + DATA_LENGTH_BYTES]) {
            Some(len) => len,
            None => return Decoded::Corrupt("non-digit length field"),
        };

    let command = match std::str::from_utf8(&buffer[CMD_OFFSET..CMD_OFFSET + CMD_BYTES])
        .ok()
        .and_then(Command::from_token)
    {
        Some(command) => command,
        None => return Decoded::Corrupt("unknown command token"),
    };

    if buffer.len() < HEADER_BYTES + data_length {
        return Decoded::Incomplete;
    }

    let data = match std::str::from_utf8(&buffer[HEADER_BYTES..HEADER_BYTES + data_length]) {
        Ok(data) => data.to_string(),
        Err(_) => return Decoded::Corrupt("non-utf8 payload"),
    };

    Decoded::Frame {
        message: Message::new(command, source, destination, data),
        consumed: HEADER_BYTES + data_length,
    }
}

/// Parses an all-ASCII-digit field. Rejects signs, whitespace and anything
/// else `str::parse` would tolerate.
fn parse_digits(field: &[u8]) -> Option<usize> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let mut value = 0usize;
    for byte in field {
        value = value * 10 + (byte - b'0') as usize;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(message: &Message) -> Vec<u8> {
        encode(message).into_bytes()
    }

    #[test]
    fn encode_layout() {
        let message = Message::new(Command::Position, 3, 99, "001002n");
        assert_eq!(encode(&message), "POS039900007001002n");
    }

    #[test]
    fn encode_empty_payload() {
        let message = Message::new(Command::Level, 0, 99, "");
        assert_eq!(encode(&message), "LVL009900000");
    }

    #[test]
    fn roundtrip_all_commands() {
        let messages = [
            Message::new(Command::SessionId, 99, 0, "00"),
            Message::new(Command::Position, 4, 99, "012345e"),
            Message::new(Command::Level, 99, 2, "01005SSSSS    N"),
            Message::new(Command::Active, 1, 99, "1"),
            Message::new(Command::Players, 99, 3, "0,1,3"),
            Message::new(Command::Close, 2, 99, "0"),
            Message::new(Command::Hit, 0, 5, "01"),
            Message::new(Command::QueryPosition, 99, 1, ""),
            Message::new(Command::EndGame, 99, 99, "ninja"),
        ];

        for message in messages {
            match decode(&frame(&message)) {
                Decoded::Frame { message: decoded, consumed } => {
                    assert_eq!(decoded, message);
                    assert_eq!(consumed, HEADER_BYTES + message.data.len());
                }
                other => panic!("expected frame, got {:?}", other),
            }
        }
    }

    #[test]
    fn short_header_is_incomplete() {
        assert_eq!(decode(b""), Decoded::Incomplete);
        assert_eq!(decode(b"POS0399"), Decoded::Incomplete);
        assert_eq!(decode(&b"POS039900006"[..11]), Decoded::Incomplete);
    }

    #[test]
    fn short_payload_is_incomplete() {
        let bytes = frame(&Message::new(Command::Position, 3, 99, "001002n"));
        for cut in HEADER_BYTES..bytes.len() {
            assert_eq!(decode(&bytes[..cut]), Decoded::Incomplete, "cut at {}", cut);
        }
    }

    #[test]
    fn split_frame_decodes_once_whole() {
        let bytes = frame(&Message::new(Command::Position, 1, 99, "010020s"));

        // Any split point: first chunk is incomplete, the reassembled
        // buffer decodes to the same single frame.
        for split in 1..bytes.len() {
            assert_eq!(decode(&bytes[..split]), Decoded::Incomplete);

            let mut reassembled = bytes[..split].to_vec();
            reassembled.extend_from_slice(&bytes[split..]);
            match decode(&reassembled) {
                Decoded::Frame { consumed, .. } => assert_eq!(consumed, bytes.len()),
                other => panic!("expected frame after reassembly, got {:?}", other),
            }
        }
    }

    #[test]
    fn non_digit_source_is_corrupt() {
        assert_eq!(
            decode(b"POSxy9900000"),
            Decoded::Corrupt("non-digit source field")
        );
    }

    #[test]
    fn non_digit_destination_is_corrupt() {
        assert_eq!(
            decode(b"POS03z!00000"),
            Decoded::Corrupt("non-digit destination field")
        );
    }

    #[test]
    fn non_digit_length_is_corrupt() {
        assert_eq!(
            decode(b"POS0399-0007001002n"),
            Decoded::Corrupt("non-digit length field")
        );
    }

    #[test]
    fn unknown_command_is_corrupt() {
        assert_eq!(
            decode(b"ZZZ039900000"),
            Decoded::Corrupt("unknown command token")
        );
    }

    #[test]
    fn signed_length_field_rejected() {
        // str::parse would accept "+0007"; byte-wise validation must not.
        assert_eq!(
            decode(b"POS0399+0007001002n"),
            Decoded::Corrupt("non-digit length field")
        );
    }

    #[test]
    fn decode_resumes_after_discard() {
        // Corrupt buffer discarded by the caller, next buffer decodes clean.
        assert!(matches!(decode(b"POSxy9900000trailing"), Decoded::Corrupt(_)));

        let bytes = frame(&Message::new(Command::Hit, 2, 4, "02"));
        assert!(matches!(decode(&bytes), Decoded::Frame { .. }));
    }

    #[test]
    fn consumes_exactly_one_frame() {
        let first = frame(&Message::new(Command::Active, 1, 99, "1"));
        let second = frame(&Message::new(Command::Close, 1, 99, "0"));

        let mut buffer = first.clone();
        buffer.extend_from_slice(&second);

        match decode(&buffer) {
            Decoded::Frame { message, consumed } => {
                assert_eq!(message.command, Command::Active);
                assert_eq!(consumed, first.len());

                match decode(&buffer[consumed..]) {
                    Decoded::Frame { message, .. } => {
                        assert_eq!(message.command, Command::Close)
                    }
                    other => panic!("expected second frame, got {:?}", other),
                }
            }
            other => panic!("expected first frame, got {:?}", other),
        }
    }
}
