pub mod chord_engine;
pub mod chord_table;
pub mod engine;
pub mod error;
pub mod key_map;
pub mod nicola;
pub mod parser;
pub mod romaji_map;
pub mod sink;
pub mod types;

pub use chord_engine::{ChordEngine, Decision, OutputSink, Profile};
pub use chord_table::{ChordDef, LayerTable, LayerTables, Layout};
pub use error::ConfigError;
pub use types::{KeyAction, KeyEdge, KeyEvent, KeyId, KeySet, Layer, OutputEvent};
