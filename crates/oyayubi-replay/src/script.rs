//! Key-event script: one event per line.
//!
//! ```text
//! # edge key layer [timestamp]
//! down s 7 0
//! up   s 7 40
//! down 0x0e 8
//! ```
//!
//! Keys are names (`q`, `;`, `space`) or hex usage codes. A missing
//! timestamp continues from the previous line.

use anyhow::{anyhow, bail, Context, Result};
use oyayubi_core::key_map::key_name_to_usage;
use oyayubi_core::{KeyEdge, KeyEvent};

const DEFAULT_STEP_MS: i64 = 10;

pub fn parse_script(content: &str) -> Result<Vec<KeyEvent>> {
    let mut events = Vec::new();
    let mut last_ts: Option<i64> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        let event =
            parse_line(line, last_ts).with_context(|| format!("line {}: {}", line_no, raw))?;
        last_ts = Some(event.timestamp);
        events.push(event);
    }
    Ok(events)
}

fn parse_line(line: &str, last_ts: Option<i64>) -> Result<KeyEvent> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 || fields.len() > 4 {
        bail!("expected `down|up <key> <layer> [timestamp]`");
    }

    let edge = match fields[0].to_ascii_lowercase().as_str() {
        "down" | "d" => KeyEdge::Down,
        "up" | "u" => KeyEdge::Up,
        other => bail!("unknown edge `{}`", other),
    };
    let code = parse_key(fields[1])?;
    let layer: u8 = fields[2]
        .parse()
        .with_context(|| format!("bad layer `{}`", fields[2]))?;
    let timestamp = match fields.get(3) {
        Some(t) => t.parse().with_context(|| format!("bad timestamp `{}`", t))?,
        None => last_ts.map_or(0, |t| t.saturating_add(DEFAULT_STEP_MS)),
    };

    Ok(KeyEvent {
        code,
        edge,
        layer,
        timestamp,
    })
}

fn parse_key(token: &str) -> Result<u32> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).with_context(|| format!("bad key code `{}`", token));
    }
    key_name_to_usage(&token.to_ascii_lowercase())
        .map(|k| k.code() as u32)
        .ok_or_else(|| anyhow!("unknown key `{}`", token))
}
