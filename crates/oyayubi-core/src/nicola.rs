//! Built-in NICOLA thumb-shift layout.

use crate::chord_table::Layout;
use std::sync::Arc;

pub const NICOLA_LAYOUT: &str = include_str!("../layout/nicola.yab");

lazy_static::lazy_static! {
    static ref BUILTIN: Arc<Layout> = Arc::new(
        crate::parser::parse_layout_content(NICOLA_LAYOUT)
            .expect("built-in NICOLA layout must parse"),
    );
}

/// Shared, read-only NICOLA layout. Every engine built from it shares the
/// same tables.
pub fn builtin() -> Arc<Layout> {
    Arc::clone(&BUILTIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_map::{usage, KeyBitMap};
    use crate::romaji_map::expand_to_usages;
    use crate::types::{KeyId, Layer};

    fn output(layer: Layer, key: KeyId) -> Option<Vec<KeyId>> {
        let bit = KeyBitMap::nicola().bit(key)?;
        builtin()
            .tables()
            .find_exact(bit, layer)
            .map(|c| c.output().to_vec())
    }

    fn romaji(s: &str) -> Option<Vec<KeyId>> {
        expand_to_usages(s).ok()
    }

    #[test]
    fn test_builtin_table_sizes() {
        let layout = builtin();
        assert_eq!(layout.name.as_deref(), Some("NICOLA 親指シフト"));
        assert_eq!(layout.tables().table(Layer::LeftThumb).len(), 29);
        assert_eq!(layout.tables().table(Layer::RightThumb).len(), 27);
    }

    #[test]
    fn test_builtin_left_outputs() {
        let l = Layer::LeftThumb;
        assert_eq!(output(l, usage::Q), romaji("xa"));
        assert_eq!(output(l, usage::W), romaji("e"));
        assert_eq!(output(l, usage::R), romaji("xya"));
        assert_eq!(output(l, usage::U), romaji("di"));
        assert_eq!(output(l, usage::O), romaji("du"));
        assert_eq!(output(l, usage::A), romaji("wo"));
        assert_eq!(output(l, usage::SEMICOLON), romaji("xtu"));
        assert_eq!(output(l, usage::X), Some(vec![usage::MINUS]));
        assert_eq!(output(l, usage::DOT), romaji("bo"));
        assert_eq!(output(l, usage::SLASH), None);
    }

    #[test]
    fn test_builtin_right_outputs() {
        let r = Layer::RightThumb;
        assert_eq!(output(r, usage::Q), None);
        assert_eq!(output(r, usage::W), romaji("ga"));
        assert_eq!(output(r, usage::P), romaji("xe"));
        assert_eq!(output(r, usage::A), romaji("vu"));
        assert_eq!(output(r, usage::S), romaji("zi"));
        assert_eq!(output(r, usage::J), romaji("o"));
        assert_eq!(output(r, usage::L), romaji("xyo"));
        assert_eq!(output(r, usage::SEMICOLON), None);
        assert_eq!(output(r, usage::B), None);
        assert_eq!(output(r, usage::SLASH), romaji("xo"));
    }

    #[test]
    fn test_builtin_is_shared() {
        assert!(Arc::ptr_eq(&builtin(), &builtin()));
    }
}
