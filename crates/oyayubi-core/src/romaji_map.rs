use crate::key_map::usage;
use crate::types::KeyId;
use std::collections::HashMap;

lazy_static::lazy_static! {
    // Spellings typed into the host IME. Small kana use the x- prefix and
    // voiced dental rows use di/du/zi so each kana stays one unambiguous
    // keystroke run.
    static ref KANA_ROMAJI_MAP: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        // Hiragana
        m.insert('あ', "a"); m.insert('い', "i"); m.insert('う', "u"); m.insert('え', "e"); m.insert('お', "o");
        m.insert('か', "ka"); m.insert('き', "ki"); m.insert('く', "ku"); m.insert('け', "ke"); m.insert('こ', "ko");
        m.insert('さ', "sa"); m.insert('し', "si"); m.insert('す', "su"); m.insert('せ', "se"); m.insert('そ', "so");
        m.insert('た', "ta"); m.insert('ち', "ti"); m.insert('つ', "tu"); m.insert('て', "te"); m.insert('と', "to");
        m.insert('な', "na"); m.insert('に', "ni"); m.insert('ぬ', "nu"); m.insert('ね', "ne"); m.insert('の', "no");
        m.insert('は', "ha"); m.insert('ひ', "hi"); m.insert('ふ', "hu"); m.insert('へ', "he"); m.insert('ほ', "ho");
        m.insert('ま', "ma"); m.insert('み', "mi"); m.insert('む', "mu"); m.insert('め', "me"); m.insert('も', "mo");
        m.insert('や', "ya"); m.insert('ゆ', "yu"); m.insert('よ', "yo");
        m.insert('ら', "ra"); m.insert('り', "ri"); m.insert('る', "ru"); m.insert('れ', "re"); m.insert('ろ', "ro");
        m.insert('わ', "wa"); m.insert('を', "wo"); m.insert('ん', "nn");

        // Voiced (Dakuten)
        m.insert('が', "ga"); m.insert('ぎ', "gi"); m.insert('ぐ', "gu"); m.insert('げ', "ge"); m.insert('ご', "go");
        m.insert('ざ', "za"); m.insert('じ', "zi"); m.insert('ず', "zu"); m.insert('ぜ', "ze"); m.insert('ぞ', "zo");
        m.insert('だ', "da"); m.insert('ぢ', "di"); m.insert('づ', "du"); m.insert('で', "de"); m.insert('ど', "do");
        m.insert('ば', "ba"); m.insert('び', "bi"); m.insert('ぶ', "bu"); m.insert('べ', "be"); m.insert('ぼ', "bo");
        m.insert('ゔ', "vu");

        // Semi-voiced (Handakuten)
        m.insert('ぱ', "pa"); m.insert('ぴ', "pi"); m.insert('ぷ', "pu"); m.insert('ぺ', "pe"); m.insert('ぽ', "po");

        // Small Kana
        m.insert('ぁ', "xa"); m.insert('ぃ', "xi"); m.insert('ぅ', "xu"); m.insert('ぇ', "xe"); m.insert('ぉ', "xo");
        m.insert('っ', "xtu");
        m.insert('ゃ', "xya"); m.insert('ゅ', "xyu"); m.insert('ょ', "xyo");
        m.insert('ゎ', "xwa");

        m
    };
}

pub fn kana_to_romaji(c: char) -> Option<&'static str> {
    KANA_ROMAJI_MAP.get(&c).copied()
}

pub fn normalize_symbol(c: char) -> Option<char> {
    match c {
        'ー' | '－' => Some('-'),
        '，' | '、' => Some(','),
        '．' | '。' => Some('.'),
        '／' | '・' => Some('/'),
        '；' => Some(';'),
        '\u{FF41}'..='\u{FF5A}' | '\u{FF21}'..='\u{FF3A}' => {
            std::char::from_u32(c as u32 - 0xFEE0).map(|half| half.to_ascii_lowercase())
        }
        _ => None,
    }
}

/// Output key that types `c` on a US/JIS host in romaji input mode.
pub fn char_to_usage(c: char) -> Option<KeyId> {
    match c {
        'a'..='z' | 'A'..='Z' => {
            let offset = c.to_ascii_lowercase() as u8 - b'a';
            Some(KeyId(usage::A.code() + offset))
        }
        '-' => Some(usage::MINUS),
        ',' => Some(usage::COMMA),
        '.' => Some(usage::DOT),
        '/' => Some(usage::SLASH),
        ';' => Some(usage::SEMICOLON),
        _ => None,
    }
}

/// Expands kana, full-width symbols and ASCII into output keystrokes.
/// Returns the first character that has no keystroke on failure.
pub fn expand_to_usages(text: &str) -> Result<Vec<KeyId>, char> {
    let mut out = Vec::new();
    for c in text.chars() {
        if let Some(romaji) = kana_to_romaji(c) {
            for r in romaji.chars() {
                out.push(char_to_usage(r).ok_or(r)?);
            }
            continue;
        }
        let c = normalize_symbol(c).unwrap_or(c);
        out.push(char_to_usage(c).ok_or(c)?);
    }
    Ok(out)
}
