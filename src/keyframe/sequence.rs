//! Keyframe sequences: whole-board position snapshots played back index by index.

use std::collections::BTreeMap;

use crate::diagram::state::DiagramView;
use crate::foundation::core::{EntityId, Point};
use crate::foundation::error::{ChalkboardError, ChalkboardResult};
use crate::foundation::math::lerp_point;
use crate::keyframe::ease::Ease;

fn default_transition_ms() -> f64 {
    1000.0
}

fn default_speed() -> f64 {
    1.0
}

/// Snapshot of every entity position plus the transition that leads into it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    pub positions: BTreeMap<EntityId, Point>,
    /// Duration of the transition from the previous keyframe. Ignored on the first keyframe.
    #[serde(default = "default_transition_ms")]
    pub transition_ms: f64,
    #[serde(default)]
    pub ease: Ease,
}

impl Keyframe {
    pub fn new(positions: BTreeMap<EntityId, Point>, transition_ms: f64) -> Self {
        Self {
            positions,
            transition_ms,
            ease: Ease::Linear,
        }
    }

    /// Capture the current position of every entity on the board.
    pub fn capture(view: &dyn DiagramView, transition_ms: f64) -> Self {
        let positions = view
            .entities()
            .iter()
            .map(|e| (e.id.clone(), e.position))
            .collect();
        Self::new(positions, transition_ms)
    }
}

/// Named, ordered keyframe list with a global playback speed.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sequence {
    pub name: String,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
    /// Playback multiplier; 2.0 plays twice as fast.
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl Sequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyframes: Vec::new(),
            speed: 1.0,
        }
    }

    pub fn validate(&self) -> ChalkboardResult<()> {
        if self.name.trim().is_empty() {
            return Err(ChalkboardError::validation("sequence name must be non-empty"));
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ChalkboardError::validation(
                "sequence speed must be finite and > 0",
            ));
        }
        for (i, kf) in self.keyframes.iter().enumerate() {
            if !(kf.transition_ms.is_finite() && kf.transition_ms >= 0.0) {
                return Err(ChalkboardError::validation(format!(
                    "keyframe {i} transition_ms must be finite and >= 0"
                )));
            }
            if kf.positions.values().any(|p| !p.is_finite()) {
                return Err(ChalkboardError::validation(format!(
                    "keyframe {i} has a non-finite position"
                )));
            }
        }
        Ok(())
    }

    fn scaled_ms(&self, kf: &Keyframe) -> f64 {
        kf.transition_ms / self.speed
    }

    /// Playback length at the current speed.
    pub fn total_ms(&self) -> f64 {
        self.keyframes
            .iter()
            .skip(1)
            .map(|kf| self.scaled_ms(kf))
            .sum()
    }

    /// Board positions at `ms` into playback, clamped to the sequence's extent.
    ///
    /// Entities absent from a keyframe hold their previous position; entities first appearing in
    /// a keyframe appear there without a transition.
    pub fn sample_at(&self, ms: f64) -> BTreeMap<EntityId, Point> {
        let Some(first) = self.keyframes.first() else {
            return BTreeMap::new();
        };

        let mut state = first.positions.clone();
        let mut remaining = ms.max(0.0);

        for kf in self.keyframes.iter().skip(1) {
            let dur = self.scaled_ms(kf);
            if remaining >= dur {
                remaining -= dur;
                state.extend(kf.positions.iter().map(|(id, p)| (id.clone(), *p)));
                continue;
            }

            let t = kf.ease.apply(remaining / dur);
            for (id, to) in &kf.positions {
                let from = state.get(id).copied().unwrap_or(*to);
                state.insert(id.clone(), lerp_point(from, *to, t));
            }
            return state;
        }

        state
    }

    pub fn to_json(&self) -> ChalkboardResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> ChalkboardResult<Self> {
        let seq: Self = serde_json::from_str(s)?;
        seq.validate()?;
        Ok(seq)
    }
}

/// Authoring wrapper around one [`Sequence`].
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceEditor {
    sequence: Sequence,
}

impl SequenceEditor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            sequence: Sequence::new(name),
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn into_sequence(self) -> Sequence {
        self.sequence
    }

    /// Append the board as it stands now.
    pub fn capture(&mut self, view: &dyn DiagramView, transition_ms: f64) -> ChalkboardResult<usize> {
        check_transition(transition_ms)?;
        self.sequence
            .keyframes
            .push(Keyframe::capture(view, transition_ms));
        Ok(self.sequence.keyframes.len() - 1)
    }

    pub fn insert(&mut self, index: usize, keyframe: Keyframe) -> ChalkboardResult<()> {
        if index > self.sequence.keyframes.len() {
            return Err(out_of_range(index));
        }
        check_transition(keyframe.transition_ms)?;
        self.sequence.keyframes.insert(index, keyframe);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> ChalkboardResult<Keyframe> {
        if index >= self.sequence.keyframes.len() {
            return Err(out_of_range(index));
        }
        Ok(self.sequence.keyframes.remove(index))
    }

    pub fn move_keyframe(&mut self, from: usize, to: usize) -> ChalkboardResult<()> {
        let len = self.sequence.keyframes.len();
        if from >= len {
            return Err(out_of_range(from));
        }
        if to >= len {
            return Err(out_of_range(to));
        }
        let kf = self.sequence.keyframes.remove(from);
        self.sequence.keyframes.insert(to, kf);
        Ok(())
    }

    pub fn set_transition(&mut self, index: usize, transition_ms: f64) -> ChalkboardResult<()> {
        check_transition(transition_ms)?;
        let kf = self
            .sequence
            .keyframes
            .get_mut(index)
            .ok_or_else(|| out_of_range(index))?;
        kf.transition_ms = transition_ms;
        Ok(())
    }

    pub fn set_speed(&mut self, speed: f64) -> ChalkboardResult<()> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ChalkboardError::validation(
                "sequence speed must be finite and > 0",
            ));
        }
        self.sequence.speed = speed;
        Ok(())
    }

    pub fn save_json(&self) -> ChalkboardResult<String> {
        self.sequence.to_json()
    }

    /// Replace the sequence with a persisted one. A malformed document is logged and ignored;
    /// the current sequence stays as it was.
    pub fn try_load(&mut self, json: &str) -> bool {
        match Sequence::from_json(json) {
            Ok(seq) => {
                tracing::debug!(name = %seq.name, keyframes = seq.keyframes.len(), "sequence loaded");
                self.sequence = seq;
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "rejected sequence document");
                false
            }
        }
    }
}

fn check_transition(ms: f64) -> ChalkboardResult<()> {
    if ms.is_finite() && ms >= 0.0 {
        Ok(())
    } else {
        Err(ChalkboardError::validation(
            "transition_ms must be finite and >= 0",
        ))
    }
}

fn out_of_range(index: usize) -> ChalkboardError {
    ChalkboardError::validation(format!("keyframe index {index} out of range"))
}

#[cfg(test)]
#[path = "../../tests/unit/keyframe/sequence.rs"]
mod tests;
