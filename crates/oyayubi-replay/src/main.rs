use anyhow::{Context, Result};
use clap::Parser;
use oyayubi_core::engine::Engine;
use oyayubi_core::{
    nicola, parser, KeyEdge, KeyEvent, KeyId, Layer, Layout, OutputEvent, Profile,
};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod script;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Event script; `-` or omitted reads stdin.
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// `.yab` layout file. Defaults to the built-in NICOLA layout.
    #[arg(short, long, value_name = "FILE")]
    layout: Option<PathBuf>,

    /// Profile JSON (layer numbers, fallback, hold timeout).
    #[arg(short, long, value_name = "FILE")]
    profile: Option<PathBuf>,

    /// Print each emitted keystroke half as a JSON line.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Print the chord tables before replaying.
    #[arg(long, default_value_t = false)]
    summary: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();

    let layout = match &cli.layout {
        Some(path) => Arc::new(parser::load_layout(path)?),
        None => nicola::builtin(),
    };
    let profile = match &cli.profile {
        Some(path) => load_profile(path)?,
        None => Profile::default(),
    };
    info!("Profile: {:?}", profile);

    if cli.summary {
        print_summary(&layout);
    }

    let content = read_script(cli.script.as_deref())?;
    let events = script::parse_script(&content)?;

    let mut engine = Engine::new(Arc::clone(&layout), profile);
    let mut typed: Vec<KeyId> = Vec::new();

    for event in events {
        let mut out: Vec<OutputEvent> = Vec::new();
        let consumed = engine.dispatch(event, &mut out);

        if cli.json {
            for ev in &out {
                println!("{}", serde_json::to_string(ev)?);
            }
        } else {
            println!("{}", describe(&event, consumed, &out));
        }
        typed.extend(out.iter().filter(|e| e.pressed).map(|e| e.key));
    }

    if !cli.json {
        let text = typed
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        println!("typed: {}", text);
    }
    Ok(())
}

fn load_profile(path: &Path) -> Result<Profile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading profile {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing profile {}", path.display()))
}

fn read_script(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            fs::read_to_string(p).with_context(|| format!("reading script {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading script from stdin")?;
            Ok(buf)
        }
    }
}

fn describe(event: &KeyEvent, consumed: bool, out: &[OutputEvent]) -> String {
    let edge = match event.edge {
        KeyEdge::Down => "down",
        KeyEdge::Up => "up  ",
    };
    let key = match KeyId::from_raw(event.code) {
        Some(k) => k.to_string(),
        None => format!("{:#x}", event.code),
    };
    let result = if !consumed {
        "pass".to_string()
    } else if out.is_empty() {
        "-".to_string()
    } else {
        out.iter()
            .filter(|e| e.pressed)
            .map(|e| e.key.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };
    format!(
        "{:>6} {} {:<6} L{:<3} -> {}",
        event.timestamp, edge, key, event.layer, result
    )
}

fn print_summary(layout: &Layout) {
    println!("layout: {}", layout.name.as_deref().unwrap_or("<unnamed>"));
    for layer in Layer::ALL {
        let table = layout.tables().table(layer);
        let keys = layout
            .key_map()
            .keys_in(table.keys())
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        println!("{:?}: {} chords over [{}]", table.layer(), table.len(), keys);
        for chord in table.iter() {
            let trigger = layout
                .key_map()
                .keys_in(chord.keys())
                .iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join("+");
            let output = chord
                .output()
                .iter()
                .map(|k| k.to_string())
                .collect::<String>();
            println!("  {:<8} {}", trigger, output);
        }
    }
}
