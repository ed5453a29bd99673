use crate::error::{ConfigError, ConfigResult};
use crate::key_map::KeyBitMap;
use crate::types::{KeyId, KeySet, Layer};
use std::collections::HashSet;

/// Longest keystroke run one chord may emit.
pub const MAX_OUTPUT_LEN: usize = 6;

/// A required key set and the keystrokes it expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordDef {
    keys: KeySet,
    output: Vec<KeyId>,
}

impl ChordDef {
    pub fn new(keys: KeySet, output: Vec<KeyId>) -> ConfigResult<Self> {
        if keys.is_empty() {
            return Err(ConfigError::EmptyKeySet);
        }
        if output.is_empty() {
            return Err(ConfigError::EmptyOutput { keys });
        }
        if output.len() > MAX_OUTPUT_LEN {
            return Err(ConfigError::OutputTooLong {
                keys,
                len: output.len(),
                max: MAX_OUTPUT_LEN,
            });
        }
        Ok(Self { keys, output })
    }

    pub fn keys(&self) -> KeySet {
        self.keys
    }

    pub fn output(&self) -> &[KeyId] {
        &self.output
    }
}

/// Chord definitions of one layer. Key sets are unique within the table,
/// so an exact lookup has at most one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTable {
    layer: Layer,
    chords: Vec<ChordDef>,
}

impl LayerTable {
    pub fn new(layer: Layer, chords: Vec<ChordDef>) -> ConfigResult<Self> {
        let mut seen = HashSet::with_capacity(chords.len());
        for chord in &chords {
            if !seen.insert(chord.keys) {
                return Err(ConfigError::DuplicateKeySet {
                    layer,
                    keys: chord.keys,
                });
            }
        }
        Ok(Self { layer, chords })
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChordDef> {
        self.chords.iter()
    }

    /// Number of chords still reachable with `pressed` held, i.e. whose key
    /// set is a subset of it.
    pub fn count_matches(&self, pressed: KeySet) -> usize {
        self.chords
            .iter()
            .filter(|c| pressed.contains(c.keys))
            .count()
    }

    pub fn find_exact(&self, pressed: KeySet) -> Option<&ChordDef> {
        self.chords.iter().find(|c| c.keys == pressed)
    }

    /// Union of every key set in the table.
    pub fn keys(&self) -> KeySet {
        self.chords
            .iter()
            .fold(KeySet::EMPTY, |acc, c| acc | c.keys)
    }
}

/// The left/right thumb-shift table pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTables {
    left: LayerTable,
    right: LayerTable,
}

impl LayerTables {
    pub fn new(left: LayerTable, right: LayerTable) -> ConfigResult<Self> {
        for (expected, table) in [(Layer::LeftThumb, &left), (Layer::RightThumb, &right)] {
            if table.layer != expected {
                return Err(ConfigError::LayerMismatch {
                    expected,
                    found: table.layer,
                });
            }
        }
        Ok(Self { left, right })
    }

    pub fn table(&self, layer: Layer) -> &LayerTable {
        match layer {
            Layer::LeftThumb => &self.left,
            Layer::RightThumb => &self.right,
        }
    }

    pub fn count_matches(&self, pressed: KeySet, layer: Layer) -> usize {
        self.table(layer).count_matches(pressed)
    }

    pub fn find_exact(&self, pressed: KeySet, layer: Layer) -> Option<&ChordDef> {
        self.table(layer).find_exact(pressed)
    }
}

/// Everything a resolver reads: key bits plus both tables. Built once,
/// then shared read-only.
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: Option<String>,
    key_map: KeyBitMap,
    tables: LayerTables,
}

impl Layout {
    /// Fails when a chord needs a bit that no key produces, since such a
    /// chord could never be typed.
    pub fn new(
        name: Option<String>,
        key_map: KeyBitMap,
        tables: LayerTables,
    ) -> ConfigResult<Self> {
        let assigned = key_map.assigned();
        for layer in Layer::ALL {
            for chord in tables.table(layer).iter() {
                if !assigned.contains(chord.keys) {
                    return Err(ConfigError::UnmappedChordBits {
                        layer,
                        keys: chord.keys,
                    });
                }
            }
        }
        Ok(Self {
            name,
            key_map,
            tables,
        })
    }

    pub fn key_map(&self) -> &KeyBitMap {
        &self.key_map
    }

    pub fn tables(&self) -> &LayerTables {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_map::usage;

    fn bits(indices: &[u8]) -> KeySet {
        indices
            .iter()
            .fold(KeySet::EMPTY, |acc, i| acc | KeySet::single(*i).unwrap())
    }

    fn chord(indices: &[u8], out: &[KeyId]) -> ChordDef {
        ChordDef::new(bits(indices), out.to_vec()).unwrap()
    }

    fn sample_table() -> LayerTable {
        LayerTable::new(
            Layer::LeftThumb,
            vec![
                chord(&[0], &[usage::A]),
                chord(&[3, 4], &[usage::K, usage::A]),
                chord(&[3, 4, 5], &[usage::S, usage::A]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_chord_def_validation() {
        assert_eq!(
            ChordDef::new(KeySet::EMPTY, vec![usage::A]),
            Err(ConfigError::EmptyKeySet)
        );
        assert_eq!(
            ChordDef::new(bits(&[1]), vec![]),
            Err(ConfigError::EmptyOutput { keys: bits(&[1]) })
        );
        assert_eq!(
            ChordDef::new(bits(&[1]), vec![usage::A; 7]),
            Err(ConfigError::OutputTooLong {
                keys: bits(&[1]),
                len: 7,
                max: MAX_OUTPUT_LEN
            })
        );
        assert!(ChordDef::new(bits(&[1]), vec![usage::A; MAX_OUTPUT_LEN]).is_ok());
    }

    #[test]
    fn test_duplicate_key_set_rejected() {
        let res = LayerTable::new(
            Layer::RightThumb,
            vec![chord(&[2, 7], &[usage::A]), chord(&[7, 2], &[usage::I])],
        );
        assert_eq!(
            res,
            Err(ConfigError::DuplicateKeySet {
                layer: Layer::RightThumb,
                keys: bits(&[2, 7])
            })
        );
    }

    #[test]
    fn test_count_matches_is_subset_based() {
        let table = sample_table();
        assert_eq!(table.count_matches(KeySet::EMPTY), 0);
        assert_eq!(table.count_matches(bits(&[0])), 1);
        assert_eq!(table.count_matches(bits(&[3])), 0);
        assert_eq!(table.count_matches(bits(&[3, 4])), 1);
        assert_eq!(table.count_matches(bits(&[3, 4, 5])), 2);
        assert_eq!(table.count_matches(bits(&[0, 3, 4, 5])), 3);
    }

    #[test]
    fn test_find_exact_ignores_subsets() {
        let table = sample_table();
        assert_eq!(
            table.find_exact(bits(&[3, 4])).map(|c| c.output()),
            Some(&[usage::K, usage::A][..])
        );
        assert!(table.find_exact(bits(&[0, 3, 4])).is_none());
        assert!(table.find_exact(bits(&[4])).is_none());
        assert_eq!(table.keys(), bits(&[0, 3, 4, 5]));
    }

    #[test]
    fn test_tables_require_matching_layers() {
        let res = LayerTables::new(sample_table(), sample_table());
        assert_eq!(
            res,
            Err(ConfigError::LayerMismatch {
                expected: Layer::RightThumb,
                found: Layer::LeftThumb
            })
        );
    }

    #[test]
    fn test_layout_rejects_unreachable_chord() {
        let left = LayerTable::new(Layer::LeftThumb, vec![chord(&[31], &[usage::A])]).unwrap();
        let right = LayerTable::new(Layer::RightThumb, vec![]).unwrap();
        let tables = LayerTables::new(left, right).unwrap();
        let res = Layout::new(None, KeyBitMap::nicola(), tables);
        assert!(matches!(
            res,
            Err(ConfigError::UnmappedChordBits {
                layer: Layer::LeftThumb,
                ..
            })
        ));
    }
}
