use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// HID keyboard usage id naming a physical or synthetic key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId(pub u8);

impl KeyId {
    /// Narrows a raw host keycode. Codes outside the 0..=255 usage page
    /// have no identifier and are passed through by the engine.
    pub fn from_raw(code: u32) -> Option<Self> {
        u8::try_from(code).ok().map(Self)
    }

    pub const fn code(self) -> u8 {
        self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::key_map::usage_to_key_name(*self) {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// Bitmask of chord-participating keys. One bit per key, 32 keys max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeySet(u32);

impl KeySet {
    pub const EMPTY: KeySet = KeySet(0);
    pub const CAPACITY: u8 = 32;

    /// Set holding only bit `index`, or `None` past the mask width.
    pub const fn single(index: u8) -> Option<Self> {
        if index < Self::CAPACITY {
            Some(Self(1 << index))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// True when every bit of `other` is also set in `self`.
    pub const fn contains(self, other: KeySet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn remove(&mut self, other: KeySet) {
        self.0 &= !other.0;
    }
}

impl BitOr for KeySet {
    type Output = KeySet;

    fn bitor(self, rhs: KeySet) -> KeySet {
        KeySet(self.0 | rhs.0)
    }
}

impl BitOrAssign for KeySet {
    fn bitor_assign(&mut self, rhs: KeySet) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Thumb-shift layer a chord table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    LeftThumb,
    RightThumb,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::LeftThumb, Layer::RightThumb];
}

/// Row and column in the 3x10 alpha block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rc {
    pub row: u8, // 0 = QWERTY row, 1 = home row, 2 = bottom row
    pub col: u8,
}

impl Rc {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Down,
    Up,
}

/// Raw event delivered by the host key-event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Host keycode; only 0..=255 can name a key.
    pub code: u32,
    pub edge: KeyEdge,
    /// Active layer number as the host reports it.
    pub layer: u8,
    /// Milliseconds, host clock.
    pub timestamp: i64,
}

impl KeyEvent {
    pub const fn down(code: u32, layer: u8, timestamp: i64) -> Self {
        Self {
            code,
            edge: KeyEdge::Down,
            layer,
            timestamp,
        }
    }

    pub const fn up(code: u32, layer: u8, timestamp: i64) -> Self {
        Self {
            code,
            edge: KeyEdge::Up,
            layer,
            timestamp,
        }
    }
}

/// Synthetic keystroke half handed to the output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub key: KeyId,
    pub pressed: bool,
    pub timestamp: i64,
}

/// Action to be taken by the host hook for the original event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Pass,
    Block,
    /// Swallow the original event and inject these instead.
    Inject(Vec<OutputEvent>),
}
