use crate::error::{ConfigError, ConfigResult};
use crate::types::{KeyId, KeySet, Rc};

/// HID keyboard page usage ids used by layouts and output.
pub mod usage {
    use crate::types::KeyId;

    pub const A: KeyId = KeyId(0x04);
    pub const B: KeyId = KeyId(0x05);
    pub const C: KeyId = KeyId(0x06);
    pub const D: KeyId = KeyId(0x07);
    pub const E: KeyId = KeyId(0x08);
    pub const F: KeyId = KeyId(0x09);
    pub const G: KeyId = KeyId(0x0A);
    pub const H: KeyId = KeyId(0x0B);
    pub const I: KeyId = KeyId(0x0C);
    pub const J: KeyId = KeyId(0x0D);
    pub const K: KeyId = KeyId(0x0E);
    pub const L: KeyId = KeyId(0x0F);
    pub const M: KeyId = KeyId(0x10);
    pub const N: KeyId = KeyId(0x11);
    pub const O: KeyId = KeyId(0x12);
    pub const P: KeyId = KeyId(0x13);
    pub const Q: KeyId = KeyId(0x14);
    pub const R: KeyId = KeyId(0x15);
    pub const S: KeyId = KeyId(0x16);
    pub const T: KeyId = KeyId(0x17);
    pub const U: KeyId = KeyId(0x18);
    pub const V: KeyId = KeyId(0x19);
    pub const W: KeyId = KeyId(0x1A);
    pub const X: KeyId = KeyId(0x1B);
    pub const Y: KeyId = KeyId(0x1C);
    pub const Z: KeyId = KeyId(0x1D);
    pub const ENTER: KeyId = KeyId(0x28);
    pub const SPACE: KeyId = KeyId(0x2C);
    pub const MINUS: KeyId = KeyId(0x2D);
    pub const SEMICOLON: KeyId = KeyId(0x33);
    pub const COMMA: KeyId = KeyId(0x36);
    pub const DOT: KeyId = KeyId(0x37);
    pub const SLASH: KeyId = KeyId(0x38);
}

pub const GRID_ROWS: usize = 3;
pub const GRID_COLS: usize = 10;

/// Alpha block of the thumb-shift layout, row-major. Grid position also
/// fixes the default bit: `row * 10 + col`.
pub const GRID_KEYS: [[KeyId; GRID_COLS]; GRID_ROWS] = [
    [
        usage::Q,
        usage::W,
        usage::E,
        usage::R,
        usage::T,
        usage::Y,
        usage::U,
        usage::I,
        usage::O,
        usage::P,
    ],
    [
        usage::A,
        usage::S,
        usage::D,
        usage::F,
        usage::G,
        usage::H,
        usage::J,
        usage::K,
        usage::L,
        usage::SEMICOLON,
    ],
    [
        usage::Z,
        usage::X,
        usage::C,
        usage::V,
        usage::B,
        usage::N,
        usage::M,
        usage::COMMA,
        usage::DOT,
        usage::SLASH,
    ],
];

pub fn key_at(rc: Rc) -> Option<KeyId> {
    GRID_KEYS
        .get(rc.row as usize)
        .and_then(|row| row.get(rc.col as usize))
        .copied()
}

/// Static key identifier -> key bit table.
///
/// Lookups are bounds-checked by construction (the key id is a `u8`), and
/// a key with no bit yields `None` rather than an empty mask.
#[derive(Clone)]
pub struct KeyBitMap {
    bits: [Option<KeySet>; 256],
    owners: [Option<KeyId>; KeySet::CAPACITY as usize],
}

impl Default for KeyBitMap {
    fn default() -> Self {
        Self::nicola()
    }
}

impl std::fmt::Debug for KeyBitMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.owners
                    .iter()
                    .enumerate()
                    .filter_map(|(i, k)| k.map(|k| (i, k))),
            )
            .finish()
    }
}

impl KeyBitMap {
    pub fn empty() -> Self {
        Self {
            bits: [None; 256],
            owners: [None; KeySet::CAPACITY as usize],
        }
    }

    /// The 30-key NICOLA alpha block, bits 0..=29 in `GRID_KEYS` order.
    pub fn nicola() -> Self {
        let mut map = Self::empty();
        for (r, row) in GRID_KEYS.iter().enumerate() {
            for (c, key) in row.iter().enumerate() {
                let index = (r * GRID_COLS + c) as u8;
                map.bits[key.code() as usize] = KeySet::single(index);
                map.owners[index as usize] = Some(*key);
            }
        }
        map
    }

    pub fn assign(&mut self, key: KeyId, index: u8) -> ConfigResult<()> {
        let bit = KeySet::single(index).ok_or(ConfigError::BitOutOfRange { index })?;
        if self.bits[key.code() as usize].is_some() {
            return Err(ConfigError::KeyAlreadyMapped { key });
        }
        if let Some(owner) = self.owners[index as usize] {
            return Err(ConfigError::BitCollision { index, owner });
        }
        self.bits[key.code() as usize] = Some(bit);
        self.owners[index as usize] = Some(key);
        Ok(())
    }

    pub fn bit(&self, key: KeyId) -> Option<KeySet> {
        self.bits[key.code() as usize]
    }

    /// Union of every assigned bit.
    pub fn assigned(&self) -> KeySet {
        self.bits.iter().flatten().fold(KeySet::EMPTY, |acc, b| acc | *b)
    }

    /// Keys whose bits are set in `set`, in bit order.
    pub fn keys_in(&self, set: KeySet) -> Vec<KeyId> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(i, _)| set.bits() & (1 << i) != 0)
            .filter_map(|(_, k)| *k)
            .collect()
    }
}

pub fn usage_to_key_name(key: KeyId) -> Option<&'static str> {
    match key.code() {
        0x04 => Some("a"),
        0x05 => Some("b"),
        0x06 => Some("c"),
        0x07 => Some("d"),
        0x08 => Some("e"),
        0x09 => Some("f"),
        0x0A => Some("g"),
        0x0B => Some("h"),
        0x0C => Some("i"),
        0x0D => Some("j"),
        0x0E => Some("k"),
        0x0F => Some("l"),
        0x10 => Some("m"),
        0x11 => Some("n"),
        0x12 => Some("o"),
        0x13 => Some("p"),
        0x14 => Some("q"),
        0x15 => Some("r"),
        0x16 => Some("s"),
        0x17 => Some("t"),
        0x18 => Some("u"),
        0x19 => Some("v"),
        0x1A => Some("w"),
        0x1B => Some("x"),
        0x1C => Some("y"),
        0x1D => Some("z"),

        0x1E => Some("1"),
        0x1F => Some("2"),
        0x20 => Some("3"),
        0x21 => Some("4"),
        0x22 => Some("5"),
        0x23 => Some("6"),
        0x24 => Some("7"),
        0x25 => Some("8"),
        0x26 => Some("9"),
        0x27 => Some("0"),

        0x28 => Some("enter"),
        0x29 => Some("esc"),
        0x2A => Some("backspace"),
        0x2B => Some("tab"),
        0x2C => Some("space"),
        0x2D => Some("-"),
        0x2E => Some("="),
        0x2F => Some("["),
        0x30 => Some("]"),
        0x31 => Some("\\"),
        0x33 => Some(";"),
        0x34 => Some("'"),
        0x36 => Some(","),
        0x37 => Some("."),
        0x38 => Some("/"),

        0x8A => Some("henkan"),
        0x8B => Some("muhenkan"),
        _ => None,
    }
}

pub fn key_name_to_usage(name: &str) -> Option<KeyId> {
    // Reverse search; the table is small.
    (0..=u8::MAX)
        .map(KeyId)
        .find(|k| usage_to_key_name(*k) == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nicola_bits_follow_grid_order() {
        let map = KeyBitMap::nicola();
        assert_eq!(map.bit(usage::Q), KeySet::single(0));
        assert_eq!(map.bit(usage::P), KeySet::single(9));
        assert_eq!(map.bit(usage::A), KeySet::single(10));
        assert_eq!(map.bit(usage::SEMICOLON), KeySet::single(19));
        assert_eq!(map.bit(usage::Z), KeySet::single(20));
        assert_eq!(map.bit(usage::SLASH), KeySet::single(29));
        assert_eq!(map.assigned().len(), 30);
    }

    #[test]
    fn test_unmapped_key_has_no_bit() {
        let map = KeyBitMap::nicola();
        assert_eq!(map.bit(usage::SPACE), None);
        assert_eq!(map.bit(usage::ENTER), None);
        assert_eq!(map.bit(KeyId(0)), None);
        assert_eq!(map.bit(KeyId(255)), None);
    }

    #[test]
    fn test_assign_rejects_overlap() {
        let mut map = KeyBitMap::empty();
        map.assign(usage::Q, 0).unwrap();

        assert_eq!(
            map.assign(usage::Q, 1),
            Err(ConfigError::KeyAlreadyMapped { key: usage::Q })
        );
        assert_eq!(
            map.assign(usage::W, 0),
            Err(ConfigError::BitCollision {
                index: 0,
                owner: usage::Q
            })
        );
        assert_eq!(
            map.assign(usage::W, 32),
            Err(ConfigError::BitOutOfRange { index: 32 })
        );
        assert_eq!(map.bit(usage::W), None);
    }

    #[test]
    fn test_keys_in() {
        let map = KeyBitMap::nicola();
        let set = map.bit(usage::T).unwrap() | map.bit(usage::R).unwrap();
        assert_eq!(map.keys_in(set), vec![usage::R, usage::T]);
    }

    #[test]
    fn test_key_names_round_trip() {
        assert_eq!(key_name_to_usage("q"), Some(usage::Q));
        assert_eq!(key_name_to_usage(";"), Some(usage::SEMICOLON));
        assert_eq!(key_name_to_usage("-"), Some(usage::MINUS));
        assert_eq!(key_name_to_usage("nope"), None);
        assert_eq!(key_at(Rc::new(2, 9)), Some(usage::SLASH));
        assert_eq!(key_at(Rc::new(3, 0)), None);
    }
}
