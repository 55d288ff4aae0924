//! Level grid, tile symbol table and the level wire payload.
//!
//! Levels come from plain text files on the server (one row per line) and
//! travel to clients as `NUMBER(2)WIDTH(3)TILES`, row-major, one ASCII
//! symbol per tile.

use crate::error::NetError;
use crate::player::PLAYER_COUNT;

pub const LEVEL_NUMBER_BYTES: usize = 2;
pub const LEVEL_WIDTH_BYTES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Ground,
    Stone,
    Wall,
    NinjaStart,
    /// Samurai spawn point, 1-6.
    SamuraiStart(u8),
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub kind: TileKind,
    pub walkable: bool,
}

impl Tile {
    /// Builds a tile from its map symbol. Unknown symbols fall back to
    /// plain walkable ground, matching the level-file format's tolerance.
    pub fn from_symbol(symbol: char) -> Tile {
        match symbol {
            ' ' => Tile { kind: TileKind::Ground, walkable: true },
            'S' => Tile { kind: TileKind::Stone, walkable: false },
            'W' => Tile { kind: TileKind::Wall, walkable: false },
            'N' => Tile { kind: TileKind::NinjaStart, walkable: true },
            'E' => Tile { kind: TileKind::Exit, walkable: true },
            '1'..='6' => Tile {
                kind: TileKind::SamuraiStart(symbol as u8 - b'0'),
                walkable: true,
            },
            _ => Tile { kind: TileKind::Ground, walkable: true },
        }
    }

    pub fn symbol(&self) -> char {
        match self.kind {
            TileKind::Ground => ' ',
            TileKind::Stone => 'S',
            TileKind::Wall => 'W',
            TileKind::NinjaStart => 'N',
            TileKind::SamuraiStart(index) => (b'0' + index) as char,
            TileKind::Exit => 'E',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    number: u8,
    width: usize,
    height: usize,
    rows: Vec<Vec<Tile>>,
}

impl Level {
    /// Parses a level from its text form: one row per line, every row the
    /// same width.
    pub fn from_text(number: u8, text: &str) -> Result<Level, NetError> {
        let mut rows = Vec::new();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            rows.push(line.chars().map(Tile::from_symbol).collect::<Vec<_>>());
        }

        if rows.is_empty() {
            return Err(NetError::MalformedPayload("empty level text".to_string()));
        }

        let width = rows[0].len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(NetError::MalformedPayload(
                "ragged level rows".to_string(),
            ));
        }

        Ok(Level {
            number,
            width,
            height: rows.len(),
            rows,
        })
    }

    /// Serializes to the wire payload: `NUMBER(2)WIDTH(3)TILES`.
    pub fn to_wire(&self) -> String {
        let mut data = format!(
            "{:02}{:03}",
            self.number as usize % 100,
            self.width % 1000
        );
        for row in &self.rows {
            for tile in row {
                data.push(tile.symbol());
            }
        }
        data
    }

    /// Rebuilds a level from its wire payload.
    pub fn from_wire(data: &str) -> Result<Level, NetError> {
        let header = LEVEL_NUMBER_BYTES + LEVEL_WIDTH_BYTES;
        let bytes = data.as_bytes();
        if bytes.len() < header {
            return Err(NetError::MalformedPayload(
                "level payload shorter than its header".to_string(),
            ));
        }

        let number = parse_field(&bytes[..LEVEL_NUMBER_BYTES], "level number")? as u8;
        let width = parse_field(&bytes[LEVEL_NUMBER_BYTES..header], "level width")?;
        if width == 0 {
            return Err(NetError::MalformedPayload("zero level width".to_string()));
        }

        let tiles = &data[header..];
        let count = tiles.chars().count();
        if count == 0 || count % width != 0 {
            return Err(NetError::MalformedPayload(format!(
                "tile string length {} is not a multiple of width {}",
                count, width
            )));
        }

        let mut rows = Vec::with_capacity(count / width);
        let mut symbols = tiles.chars();
        for _ in 0..count / width {
            rows.push(
                symbols
                    .by_ref()
                    .take(width)
                    .map(Tile::from_symbol)
                    .collect::<Vec<_>>(),
            );
        }

        Ok(Level {
            number,
            width,
            height: rows.len(),
            rows,
        })
    }

    /// Spawn coordinates for all player slots, index 0 being the ninja.
    /// Slots without a marked tile spawn at the origin.
    pub fn starting_positions(&self) -> [(u16, u16); PLAYER_COUNT] {
        let mut positions = [(0u16, 0u16); PLAYER_COUNT];
        for (y, row) in self.rows.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                let slot = match tile.kind {
                    TileKind::NinjaStart => Some(0),
                    TileKind::SamuraiStart(index) => Some(index as usize),
                    _ => None,
                };
                if let Some(slot) = slot {
                    if slot < PLAYER_COUNT {
                        positions[slot] = (x as u16, y as u16);
                    }
                }
            }
        }
        positions
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        self.rows.get(y).and_then(|row| row.get(x))
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

fn parse_field(field: &[u8], what: &str) -> Result<usize, NetError> {
    if !field.iter().all(u8::is_ascii_digit) {
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
