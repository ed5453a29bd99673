use crate::chord_table::Layout;
use crate::types::{KeyId, KeySet, Layer, OutputEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Receives synthetic keystrokes. Delivery is fire-and-forget.
pub trait OutputSink {
    fn emit(&mut self, key: KeyId, pressed: bool, timestamp: i64);
}

impl<F> OutputSink for F
where
    F: FnMut(KeyId, bool, i64),
{
    fn emit(&mut self, key: KeyId, pressed: bool, timestamp: i64) {
        self(key, pressed, timestamp)
    }
}

impl OutputSink for Vec<OutputEvent> {
    fn emit(&mut self, key: KeyId, pressed: bool, timestamp: i64) {
        self.push(OutputEvent {
            key,
            pressed,
            timestamp,
        });
    }
}

/// What a raw layer number outside the configured pair resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerFallback {
    /// Treat it as the right thumb layer.
    Right,
    /// Leave the event to the host untouched.
    PassThrough,
}

impl Default for LayerFallback {
    fn default() -> Self {
        Self::Right
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(default = "default_left_layer")]
    pub left_layer: u8,
    #[serde(default = "default_right_layer")]
    pub right_layer: u8,
    #[serde(default)]
    pub layer_fallback: LayerFallback,
    /// Discard an accumulation whose first key went down longer ago than
    /// this when the next key arrives. `None` keeps it forever.
    #[serde(default)]
    pub hold_timeout_ms: Option<u64>,
}

fn default_left_layer() -> u8 {
    7
}

fn default_right_layer() -> u8 {
    8
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            left_layer: default_left_layer(),
            right_layer: default_right_layer(),
            layer_fallback: LayerFallback::default(),
            hold_timeout_ms: None,
        }
    }
}

impl Profile {
    pub fn resolve_layer(&self, raw: u8) -> Option<Layer> {
        if raw == self.left_layer {
            Some(Layer::LeftThumb)
        } else if raw == self.right_layer {
            Some(Layer::RightThumb)
        } else {
            match self.layer_fallback {
                LayerFallback::Right => Some(Layer::RightThumb),
                LayerFallback::PassThrough => None,
            }
        }
    }
}

/// Outcome of one press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Key has no bit; nothing changed.
    Ignored,
    /// State updated, nothing emitted yet.
    Pending,
    /// A chord resolved and this many keystrokes were emitted.
    Emitted(usize),
    /// Resolution ran but no chord matched exactly; state was cleared.
    Dropped,
}

/// Live resolver state. `pressed == EMPTY` is the idle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChordState {
    pub pressed: KeySet,
    pub held: u8,
    /// Timestamp of the press that started the current accumulation.
    pub started_at: Option<i64>,
}

pub struct ChordEngine {
    layout: Arc<Layout>,
    profile: Profile,
    state: ChordState,
}

impl ChordEngine {
    pub fn new(layout: Arc<Layout>, profile: Profile) -> Self {
        Self {
            layout,
            profile,
            state: ChordState::default(),
        }
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = profile;
        self.reset();
    }

    pub fn set_layout(&mut self, layout: Arc<Layout>) {
        self.layout = layout;
        self.reset();
    }

    pub fn state(&self) -> ChordState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.pressed.is_empty()
    }

    pub fn reset(&mut self) {
        self.state = ChordState::default();
    }

    pub fn on_press(
        &mut self,
        key: KeyId,
        layer: Layer,
        timestamp: i64,
        sink: &mut impl OutputSink,
    ) -> Decision {
        let Some(bit) = self.layout.key_map().bit(key) else {
            return Decision::Ignored;
        };

        self.expire_stale(timestamp);

        if self.state.pressed.is_empty() {
            self.state.started_at = Some(timestamp);
        }
        self.state.pressed |= bit;
        self.state.held = self.state.held.saturating_add(1);

        let count = self
            .layout
            .tables()
            .count_matches(self.state.pressed, layer);
        if count != 1 {
            debug!(
                "Press {}: pressed={} held={} candidates={}",
                key, self.state.pressed, self.state.held, count
            );
            return Decision::Pending;
        }

        // Exactly one candidate left: commit now.
        let decision = self.type_exact(layer, timestamp, sink);
        self.state = ChordState::default();
        decision
    }

    pub fn on_release(
        &mut self,
        key: KeyId,
        layer: Layer,
        timestamp: i64,
        sink: &mut impl OutputSink,
    ) -> Decision {
        let Some(bit) = self.layout.key_map().bit(key) else {
            return Decision::Ignored;
        };

        self.state.pressed.remove(bit);
        match self.state.held.checked_sub(1) {
            Some(held) => self.state.held = held,
            None => debug!("Release {}: nothing held, ignoring", key),
        }

        if self.state.held > 0 {
            if self.state.pressed.is_empty() {
                self.state.started_at = None;
            }
            return Decision::Pending;
        }

        if self.state.pressed.is_empty() {
            self.state.started_at = None;
            return Decision::Pending;
        }

        // Every tracked key is up but bits remain: flush by exact match.
        let decision = self.type_exact(layer, timestamp, sink);
        self.state = ChordState::default();
        decision
    }

    fn type_exact(&self, layer: Layer, timestamp: i64, sink: &mut impl OutputSink) -> Decision {
        let pressed = self.state.pressed;
        match self.layout.tables().find_exact(pressed, layer) {
            Some(chord) => {
                for &out in chord.output() {
                    sink.emit(out, true, timestamp);
                    sink.emit(out, false, timestamp);
                }
                debug!(
                    "Chord {} on {:?} -> {} keystrokes",
                    pressed,
                    layer,
                    chord.output().len()
                );
                Decision::Emitted(chord.output().len())
            }
            None => {
                debug!("No chord equals {} on {:?}, dropped", pressed, layer);
                Decision::Dropped
            }
        }
    }

    fn expire_stale(&mut self, now: i64) {
        let (Some(limit), Some(start)) = (self.profile.hold_timeout_ms, self.state.started_at)
        else {
            return;
        };
        if self.state.pressed.is_empty() {
            return;
        }
        let elapsed = now.saturating_sub(start);
        if elapsed > 0 && elapsed as u64 > limit {
            warn!(
                "Discarding stale chord {} held {}ms (limit {}ms)",
                self.state.pressed, elapsed, limit
            );
            self.state = ChordState::default();
        }
    }
}
