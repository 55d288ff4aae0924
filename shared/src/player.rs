//! Player state shared by the server roster logic and the client.
//!
//! Movement and combat arithmetic live in the game layer; this module only
//! carries what the network dispatch needs: position, facing, the active
//! flag and hit points.

/// Slot id reserved for the ninja; all other slots are samurai.
pub const NINJA_SLOT: u8 = 0;
/// Number of player slots: 1 ninja + 6 samurai.
pub const PLAYER_COUNT: usize = 7;

pub const MAX_HP: u8 = 10;
pub const NINJA_DAMAGE: u8 = 1;
pub const SAMURAI_DAMAGE: u8 = 2;

/// Cardinal facing carried as a single character in position payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    North,
    South,
    East,
    West,
}

impl Facing {
    pub const fn as_char(self) -> char {
        match self {
            Facing::North => 'n',
            Facing::South => 's',
            Facing::East => 'e',
            Facing::West => 'w',
        }
    }

    pub fn from_char(c: char) -> Option<Facing> {
        match c {
            'n' => Some(Facing::North),
            's' => Some(Facing::South),
            'e' => Some(Facing::East),
            'w' => Some(Facing::West),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub x: u16,
    pub y: u16,
    pub facing: Facing,
    pub active: bool,
    hp: u8,
    damage: u8,
}

impl Player {
    pub fn ninja(x: u16, y: u16) -> Self {
        Self::new(x, y, NINJA_DAMAGE)
    }

    pub fn samurai(x: u16, y: u16) -> Self {
        Self::new(x, y, SAMURAI_DAMAGE)
    }

    fn new(x: u16, y: u16, damage: u8) -> Self {
        Self {
            x,
            y,
            facing: Facing::South,
            active: false,
            hp: MAX_HP,
            damage,
        }
    }

    /// Applies incoming damage and returns the remaining hit points,
    /// saturating at zero.
    pub fn hit(&mut self, damage: u8) -> u8 {
        self.hp = self.hp.saturating_sub(damage);
        self.hp
    }

    pub fn hp(&self) -> u8 {
        self.hp
    }

    /// Damage this player deals per attack.
    pub fn damage(&self) -> u8 {
        self.damage
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}
