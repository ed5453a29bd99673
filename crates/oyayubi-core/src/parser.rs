use crate::chord_table::{ChordDef, LayerTable, LayerTables, Layout};
use crate::error::{ConfigError, ConfigResult};
use crate::key_map::{self, KeyBitMap, GRID_COLS, GRID_ROWS};
use crate::romaji_map;
use crate::types::{KeyId, KeySet, Layer, Rc};
use anyhow::{bail, Context, Result};
use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

pub fn load_layout<P: AsRef<Path>>(path: P) -> Result<Layout> {
    let path = path.as_ref();
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = decode_layout_bytes(&raw).with_context(|| format!("decoding {}", path.display()))?;
    parse_layout_content(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Picks the layout encoding (byte-order mark, else UTF-8 when the bytes
/// are valid UTF-8, else Shift_JIS) and decodes with it. Bytes the chosen
/// encoding cannot map are an error rather than replacement characters.
pub fn decode_layout_bytes(raw: &[u8]) -> Result<Cow<'_, str>> {
    let (encoding, body) = match Encoding::for_bom(raw) {
        Some((enc, bom_len)) => (enc, &raw[bom_len..]),
        None if std::str::from_utf8(raw).is_ok() => (UTF_8, raw),
        None => (SHIFT_JIS, raw),
    };
    debug!("Layout encoding: {}", encoding.name());

    let (text, had_errors) = encoding.decode_without_bom_handling(body);
    if had_errors {
        bail!("layout is not valid {}", encoding.name());
    }
    Ok(text)
}

/// Rows of one plane: the base plane of a section (no chord keys) or a
/// `<k>` / `<k><d>` sub-plane whose cells chord with the named keys.
struct PlaneDraft {
    layer: Layer,
    chord_keys: Vec<KeyId>,
    rows: Vec<Vec<String>>,
}

pub fn parse_layout_content(content: &str) -> Result<Layout> {
    let mut name: Option<String> = None;
    let mut planes: Vec<PlaneDraft> = Vec::new();
    // None while inside a section we do not understand.
    let mut current_layer: Option<Layer> = None;
    let mut in_section = false;

    for line in content.lines() {
        let line = line.trim();
        if name.is_none() && line.starts_with(';') {
            let n = line.trim_start_matches(';').trim().to_string();
            if !n.is_empty() {
                name = Some(n);
            }
            continue;
        }

        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            let section = &line[1..line.len() - 1];
            in_section = true;
            current_layer = section_layer(section);
            match current_layer {
                Some(layer) => planes.push(PlaneDraft {
                    layer,
                    chord_keys: Vec::new(),
                    rows: Vec::new(),
                }),
                None => warn!("Skipping unknown section [{}]", section),
            }
            continue;
        }

        let Some(layer) = current_layer else {
            if !in_section {
                warn!("Ignoring line outside any section: {}", line);
            }
            continue;
        };

        if line.starts_with('<') && line.ends_with('>') {
            let inner = &line[1..line.len() - 1];
            let chord_keys = inner
                .split("><")
                .map(|name| {
                    key_map::key_name_to_usage(name)
                        .ok_or_else(|| ConfigError::UnknownKeyName(name.to_string()))
                })
                .collect::<ConfigResult<Vec<_>>>()?;
            planes.push(PlaneDraft {
                layer,
                chord_keys,
                rows: Vec::new(),
            });
            continue;
        }

        let tokens: Vec<String> = line.split(',').map(|s| s.trim().to_string()).collect();
        if let Some(plane) = planes.last_mut() {
            plane.rows.push(tokens);
        }
    }

    let key_map = KeyBitMap::nicola();
    let mut left = Vec::new();
    let mut right = Vec::new();
    for plane in &planes {
        let chords = plane_chords(plane, &key_map)?;
        match plane.layer {
            Layer::LeftThumb => left.extend(chords),
            Layer::RightThumb => right.extend(chords),
        }
    }

    let tables = LayerTables::new(
        LayerTable::new(Layer::LeftThumb, left)?,
        LayerTable::new(Layer::RightThumb, right)?,
    )?;
    Ok(Layout::new(name, key_map, tables)?)
}

fn section_layer(name: &str) -> Option<Layer> {
    let name = name.trim();
    if name.ends_with("左親指シフト") || name.eq_ignore_ascii_case("left") {
        Some(Layer::LeftThumb)
    } else if name.ends_with("右親指シフト") || name.eq_ignore_ascii_case("right") {
        Some(Layer::RightThumb)
    } else {
        None
    }
}

fn plane_chords(plane: &PlaneDraft, key_map: &KeyBitMap) -> ConfigResult<Vec<ChordDef>> {
    let mut base = KeySet::EMPTY;
    for &key in &plane.chord_keys {
        base |= key_map
            .bit(key)
            .ok_or_else(|| ConfigError::UnknownKeyName(key.to_string()))?;
    }

    let mut chords = Vec::new();
    for (r, row) in plane.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let Some(output) = parse_token(cell)? else {
                continue;
            };
            if r >= GRID_ROWS || c >= GRID_COLS {
                return Err(ConfigError::CellOutOfGrid { row: r, col: c });
            }
            let key = key_map::key_at(Rc::new(r as u8, c as u8))
                .ok_or(ConfigError::CellOutOfGrid { row: r, col: c })?;
            let bit = key_map
                .bit(key)
                .ok_or(ConfigError::CellOutOfGrid { row: r, col: c })?;
            if base.contains(bit) {
                return Err(ConfigError::CellOnChordKey { key });
            }
            chords.push(ChordDef::new(base | bit, output)?);
        }
    }
    Ok(chords)
}

fn parse_token(raw: &str) -> ConfigResult<Option<Vec<KeyId>>> {
    if raw.is_empty() || raw == "無" {
        return Ok(None);
    }
    let text = strip_quotes(raw).unwrap_or(raw);
    romaji_map::expand_to_usages(text)
        .map(Some)
        .map_err(ConfigError::UnknownOutputChar)
}

fn strip_quotes(raw: &str) -> Option<&str> {
    let mut chars = raw.chars();
    let first = chars.next()?;
    let last = raw.chars().last()?;
    if (first == '\'' || first == '"') && first == last && raw.len() >= 2 {
        Some(&raw[first.len_utf8()..raw.len() - last.len_utf8()])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_map::usage;

    fn bit(key: KeyId) -> KeySet {
        KeyBitMap::nicola().bit(key).unwrap()
    }

    #[test]
    fn test_parse_token() {
        assert_eq!(parse_token("無"), Ok(None));
        assert_eq!(parse_token(""), Ok(None));
        assert_eq!(parse_token("ni"), Ok(Some(vec![usage::N, usage::I])));
        assert_eq!(parse_token("'あ'"), Ok(Some(vec![usage::A])));
        assert_eq!(parse_token("\"ー\""), Ok(Some(vec![usage::MINUS])));
        assert_eq!(
            parse_token("ゃ"),
            Ok(Some(vec![usage::X, usage::Y, usage::A]))
        );
        assert_eq!(parse_token("漢"), Err(ConfigError::UnknownOutputChar('漢')));
    }

    #[test]
    fn test_parse_layout_name() {
        let layout = parse_layout_content("; 親指シフト\n[left]\nあ\n").expect("Failed to parse");
        assert_eq!(layout.name, Some("親指シフト".to_string()));

        let layout = parse_layout_content("\n;\n;   Real Name\n[left]\nあ\n").expect("Failed");
        assert_eq!(layout.name, Some("Real Name".to_string()));

        let layout = parse_layout_content("[left]\nあ\n").expect("Failed");
        assert_eq!(layout.name, None);
    }

    #[test]
    fn test_parse_grid_and_sub_plane() {
        let content = "
; test
[左親指シフト]
ぁ,え
無,あ

<k>
無
無,無,ど
";
        let layout = parse_layout_content(content).expect("Failed to parse");
        let left = layout.tables().table(Layer::LeftThumb);
        assert_eq!(left.len(), 4);
        assert!(layout.tables().table(Layer::RightThumb).is_empty());

        assert_eq!(
            left.find_exact(bit(usage::Q)).map(|c| c.output().to_vec()),
            Some(vec![usage::X, usage::A])
        );
        assert_eq!(
            left.find_exact(bit(usage::S)).map(|c| c.output().to_vec()),
            Some(vec![usage::A])
        );
        assert_eq!(
            left.find_exact(bit(usage::K) | bit(usage::D))
                .map(|c| c.output().to_vec()),
            Some(vec![usage::D, usage::O])
        );
    }

    #[test]
    fn test_multi_key_sub_plane() {
        let content = "[left]\n<k><d>\n無\n無,無,無,無,無,無,無,無,無,ゔ\n";
        let layout = parse_layout_content(content).expect("Failed to parse");
        let left = layout.tables().table(Layer::LeftThumb);
        assert_eq!(left.len(), 1);
        assert_eq!(
            left.find_exact(bit(usage::K) | bit(usage::D) | bit(usage::SEMICOLON))
                .map(|c| c.output().to_vec()),
            Some(vec![usage::V, usage::U])
        );
    }

    #[test]
    fn test_english_section_aliases() {
        let layout = parse_layout_content("[LEFT]\nか\n[right]\nが\n").expect("Failed");
        assert_eq!(
            layout
                .tables()
                .find_exact(bit(usage::Q), Layer::RightThumb)
                .map(|c| c.output().to_vec()),
            Some(vec![usage::G, usage::A])
        );
    }

    #[test]
    fn test_unknown_section_is_skipped() {
        let layout = parse_layout_content("[機能キー]\nfoo,bar\n[left]\nあ\n").expect("Failed");
        assert_eq!(layout.tables().table(Layer::LeftThumb).len(), 1);
    }

    #[test]
    fn test_duplicate_chord_is_error() {
        // K+D defined from both sub-planes.
        let content = "[left]\n<k>\n無\n無,無,だ\n<d>\n無\n無,無,無,無,無,無,無,で\n";
        let err = parse_layout_content(content).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::DuplicateKeySet {
                layer: Layer::LeftThumb,
                keys: bit(usage::K) | bit(usage::D)
            })
        );
    }

    #[test]
    fn test_sub_plane_cell_on_its_chord_key_is_error() {
        // The K cell inside <k> would silently become a single-key K chord.
        let content = "[left]\n<k>\n無\n無,無,無,無,無,無,無,き\n";
        let err = parse_layout_content(content).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::CellOnChordKey { key: usage::K })
        );
    }

    #[test]
    fn test_cell_outside_grid_is_error() {
        let err = parse_layout_content("[left]\n無\n無\n無\nあ\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::CellOutOfGrid { row: 3, col: 0 })
        );

        let err = parse_layout_content("[left]\n無,無,無,無,無,無,無,無,無,無,あ\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::CellOutOfGrid { row: 0, col: 10 })
        );
    }

    #[test]
    fn test_unknown_chord_key_is_error() {
        let err = parse_layout_content("[left]\n<nope>\nあ\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnknownKeyName("nope".into()))
        );
    }

    #[test]
    fn test_decode_sjis() {
        // "テスト" in Shift_JIS
        let sjis_bytes = vec![0x83, 0x65, 0x83, 0x58, 0x83, 0x67];
        let decoded = decode_layout_bytes(&sjis_bytes).unwrap();
        assert_eq!(decoded, "テスト");
    }

    #[test]
    fn test_decode_utf8_with_and_without_bom() {
        let decoded = decode_layout_bytes("テスト".as_bytes()).unwrap();
        assert_eq!(decoded, "テスト");

        let mut with_bom = vec![0xEF, 0xBB, 0xBF];
        with_bom.extend_from_slice("[left]".as_bytes());
        assert_eq!(decode_layout_bytes(&with_bom).unwrap(), "[left]");
    }

    #[test]
    fn test_decode_rejects_unmappable_bytes() {
        // Shift_JIS lead byte with no trail byte.
        let err = decode_layout_bytes(&[0x41, 0x83]).unwrap_err();
        assert!(err.to_string().contains("Shift_JIS"));
    }
}
