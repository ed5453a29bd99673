use crate::chord_engine::{ChordEngine, Decision, OutputSink, Profile};
use crate::chord_table::Layout;
use crate::types::{KeyAction, KeyEdge, KeyEvent, KeyId, KeySet, Layer, OutputEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Engine handle for hosts that deliver events from a hook thread.
pub type SharedEngine = Arc<Mutex<Engine>>;

pub struct Engine {
    chord_engine: ChordEngine,
    enabled: bool,
    on_enabled_change: Option<Box<dyn Fn(bool) + Send + Sync>>,
    /// Keys whose press was swallowed and whose release is still due.
    swallowed: KeySet,
    /// Layer of the most recent swallowed press.
    press_layer: Option<Layer>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(crate::nicola::builtin(), Profile::default())
    }
}

impl Engine {
    pub fn new(layout: Arc<Layout>, profile: Profile) -> Self {
        Self {
            chord_engine: ChordEngine::new(layout, profile),
            enabled: true,
            on_enabled_change: None,
            swallowed: KeySet::EMPTY,
            press_layer: None,
        }
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            if !enabled {
                self.reset();
            }
            if let Some(ref cb) = self.on_enabled_change {
                cb(enabled);
            }
        }
    }

    pub fn set_on_enabled_change(&mut self, cb: impl Fn(bool) + Send + Sync + 'static) {
        self.on_enabled_change = Some(Box::new(cb));
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get_layout_name(&self) -> Option<String> {
        self.chord_engine.layout().name.clone()
    }

    pub fn get_profile(&self) -> Profile {
        self.chord_engine.profile().clone()
    }

    pub fn set_profile(&mut self, profile: Profile) {
        self.chord_engine.set_profile(profile);
        self.reset();
    }

    pub fn load_layout(&mut self, layout: Arc<Layout>) {
        info!(
            "Engine: Layout {:?} loaded ({} left / {} right chords).",
            layout.name.as_deref().unwrap_or("<unnamed>"),
            layout.tables().table(Layer::LeftThumb).len(),
            layout.tables().table(Layer::RightThumb).len(),
        );
        self.chord_engine.set_layout(layout);
        self.reset();
    }

    fn reset(&mut self) {
        self.chord_engine.reset();
        self.swallowed = KeySet::EMPTY;
        self.press_layer = None;
    }

    pub fn chord_engine(&self) -> &ChordEngine {
        &self.chord_engine
    }

    /// Routes one host event into the resolver.
    ///
    /// Returns `false` when the event is not ours (engine disabled, code
    /// outside the usage page, layer passed through, or key without a bit)
    /// and the host should deliver it unchanged.
    ///
    /// A release always reaches the resolver, even on a passed-through
    /// layer, so a key that goes up after its thumb key cannot stay in the
    /// pressed set. It is swallowed only if its press was.
    pub fn dispatch(&mut self, event: KeyEvent, sink: &mut impl OutputSink) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(key) = KeyId::from_raw(event.code) else {
            return false;
        };
        let resolved = self.chord_engine.profile().resolve_layer(event.layer);
        let bit = self
            .chord_engine
            .layout()
            .key_map()
            .bit(key)
            .unwrap_or(KeySet::EMPTY);

        match event.edge {
            KeyEdge::Down => {
                let Some(layer) = resolved else {
                    return false;
                };
                let decision = self.chord_engine.on_press(key, layer, event.timestamp, sink);
                debug!("Down {} on {:?}: {:?}", key, layer, decision);
                if decision == Decision::Ignored {
                    return false;
                }
                self.swallowed |= bit;
                self.press_layer = Some(layer);
                true
            }
            KeyEdge::Up => {
                let was_swallowed = !bit.is_empty() && self.swallowed.contains(bit);
                self.swallowed.remove(bit);
                let layer = match resolved {
                    Some(layer) => layer,
                    None if was_swallowed => self.press_layer.unwrap_or(Layer::RightThumb),
                    None => return false,
                };
                let decision = self
                    .chord_engine
                    .on_release(key, layer, event.timestamp, sink);
                debug!("Up {} on {:?}: {:?}", key, layer, decision);
                if self.swallowed.is_empty() {
                    self.press_layer = None;
                }
                decision != Decision::Ignored
            }
        }
    }

    pub fn process_key(&mut self, code: u32, up: bool, layer: u8, timestamp: i64) -> KeyAction {
        let event = if up {
            KeyEvent::up(code, layer, timestamp)
        } else {
            KeyEvent::down(code, layer, timestamp)
        };

        let mut out: Vec<OutputEvent> = Vec::new();
        if !self.dispatch(event, &mut out) {
            return KeyAction::Pass;
        }
        if out.is_empty() {
            KeyAction::Block
        } else {
            KeyAction::Inject(out)
        }
    }
}
