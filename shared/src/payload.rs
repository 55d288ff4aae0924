//! Command-specific payload layouts.
//!
//! Every field that the layout declares as digits is validated byte-wise;
//! a failed parse yields [`NetError::MalformedPayload`] and the caller
//! ignores the message without touching any state.

use crate::error::NetError;
use crate::player::Facing;

/// Width of one zero-padded position coordinate.
pub const POS_COORD_BYTES: usize = 3;
/// Width of the zero-padded damage field in a hit payload.
pub const HIT_DAMAGE_BYTES: usize = 2;
/// Width of a zero-padded slot id.
pub const SLOT_ID_BYTES: usize = 2;

/// `X(3)Y(3)FACING(1)`, e.g. `012034n`.
pub fn encode_position(x: u16, y: u16, facing: Facing) -> String {
    format!("{:03}{:03}{}", x, y, facing.as_char())
}

/// Parses a position payload. The facing suffix is optional; when present
/// it must be one of `n`/`s`/`e`/`w`.
pub fn parse_position(data: &str) -> Result<(u16, u16, Option<Facing>), NetError> {
    let bytes = data.as_bytes();
    if bytes.len() < 2 * POS_COORD_BYTES {
        return Err(NetError::MalformedPayload(format!(
            "position payload too short: {:?}",
            data
        )));
    }

    let x = parse_decimal(&bytes[..POS_COORD_BYTES], "position x")?;
    let y = parse_decimal(&bytes[POS_COORD_BYTES..2 * POS_COORD_BYTES], "position y")?;

    let facing = match &data[2 * POS_COORD_BYTES..] {
        "" => None,
        rest => {
            let c = rest.chars().next().unwrap_or(' ');
            Some(Facing::from_char(c).ok_or_else(|| {
                NetError::MalformedPayload(format!("unknown facing {:?}", rest))
            })?)
        }
    };

    Ok((x as u16, y as u16, facing))
}

/// `DAMAGE(2)`, e.g. `02`. The target id travels in the message header's
/// destination field, not in the payload.
pub fn encode_hit(damage: u8) -> String {
    format!("{:02}", damage)
}

pub fn parse_hit(data: &str) -> Result<u8, NetError> {
    if data.len() != HIT_DAMAGE_BYTES {
        return Err(NetError::MalformedPayload(format!(
            "hit payload must be {} digits: {:?}",
            HIT_DAMAGE_BYTES, data
        )));
    }
    parse_decimal(data.as_bytes(), "hit damage").map(|damage| damage as u8)
}

/// Comma-separated decimal slot ids, no padding; empty when nobody joined.
pub fn encode_roster(ids: &[u8]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_roster(data: &str) -> Result<Vec<u8>, NetError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    data.split(',')
        .map(|entry| parse_decimal(entry.as_bytes(), "roster id").map(|id| id as u8))
        .collect()
}

/// Zero-padded 2-digit slot id, used by session-id payloads.
pub fn encode_slot_id(id: u8) -> String {
    format!("{:02}", id)
}

pub fn parse_slot_id(data: &str) -> Result<u8, NetError> {
    if data.is_empty() || data.len() > SLOT_ID_BYTES {
        return Err(NetError::MalformedPayload(format!(
            "slot id must be 1-{} digits: {:?}",
            SLOT_ID_BYTES, data
        )));
    }
    parse_decimal(data.as_bytes(), "slot id").map(|id| id as u8)
}

fn parse_decimal(field: &[u8], what: &str) -> Result<usize, NetError> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return Err(NetError::MalformedPayload(format!(
            "{} is not numeric: {:?}",
            what,
            String::from_utf8_lossy(field)
        )));
    }

    Ok(field
        .iter()
        .fold(0usize, |value, byte| value * 10 + (byte - b'0') as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_roundtrip() {
        let data = encode_position(12, 345, Facing::North);
        assert_eq!(data, "012345n");
        assert_eq!(parse_position(&data).unwrap(), (12, 345, Some(Facing::North)));
    }

    #[test]
    fn position_without_facing() {
        assert_eq!(parse_position("001002").unwrap(), (1, 2, None));
    }

    #[test]
    fn position_rejects_letters() {
        assert!(parse_position("0a1002n").is_err());
        assert!(parse_position("001").is_err());
        assert!(parse_position("001002x").is_err());
    }

    #[test]
    fn hit_roundtrip() {
        assert_eq!(encode_hit(2), "02");
        assert_eq!(parse_hit("02").unwrap(), 2);
        assert_eq!(parse_hit("10").unwrap(), 10);
    }

    #[test]
    fn hit_rejects_wrong_width() {
        assert!(parse_hit("2").is_err());
        assert!(parse_hit("002").is_err());
        assert!(parse_hit("ab").is_err());
    }

    #[test]
    fn roster_roundtrip() {
        assert_eq!(encode_roster(&[0, 1, 3]), "0,1,3");
        assert_eq!(parse_roster("0,1,3").unwrap(), vec![0, 1, 3]);
    }

    #[test]
    fn empty_roster_permitted() {
        assert_eq!(encode_roster(&[]), "");
        assert_eq!(parse_roster("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn roster_rejects_junk() {
        assert!(parse_roster("0,,1").is_err());
        assert!(parse_roster("0,x").is_err());
    }

    #[test]
    fn slot_id_roundtrip() {
        assert_eq!(encode_slot_id(0), "00");
        assert_eq!(parse_slot_id("00").unwrap(), 0);
        assert_eq!(parse_slot_id("6").unwrap(), 6);
        assert!(parse_slot_id("").is_err());
        assert!(parse_slot_id("1a").is_err());
    }
}
