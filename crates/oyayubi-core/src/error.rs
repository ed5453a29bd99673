use crate::types::{KeyId, KeySet, Layer};
use thiserror::Error;

/// Layout and table construction failures. All of them are raised while a
/// layout is being built; the resolver itself never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chord has an empty key set")]
    EmptyKeySet,

    #[error("chord {keys} has no output keys")]
    EmptyOutput { keys: KeySet },

    #[error("chord {keys} emits {len} keys, limit is {max}")]
    OutputTooLong {
        keys: KeySet,
        len: usize,
        max: usize,
    },

    #[error("{layer:?} table defines key set {keys} more than once")]
    DuplicateKeySet { layer: Layer, keys: KeySet },

    #[error("{found:?} table given where {expected:?} table was expected")]
    LayerMismatch { expected: Layer, found: Layer },

    #[error("{layer:?} chord {keys} uses bits with no key assigned")]
    UnmappedChordBits { layer: Layer, keys: KeySet },

    #[error("bit index {index} does not fit a key set")]
    BitOutOfRange { index: u8 },

    #[error("key {key} already has a bit")]
    KeyAlreadyMapped { key: KeyId },

    #[error("bit index {index} is already assigned to key {owner}")]
    BitCollision { index: u8, owner: KeyId },

    #[error("unknown key name: {0}")]
    UnknownKeyName(String),

    #[error("no output key for character {0:?}")]
    UnknownOutputChar(char),

    #[error("sub-plane cell on its own chord key {key}")]
    CellOnChordKey { key: KeyId },

    #[error("cell at row {row}, column {col} lies outside the key grid")]
    CellOutOfGrid { row: usize, col: usize },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
