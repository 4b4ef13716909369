//! Engine tuning knobs.
//!
//! Every field has a default so a diagram document or config file only needs to name what it
//! changes. The chain-inference and one-touch heuristics are configured here too.

use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{ChalkboardError, ChalkboardResult};

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timing: TimingConfig,
    pub steps: StepConfig,
    pub one_touch: OneTouchRule,
    pub curve: CurveConfig,
    pub ghosts: GhostConfig,
    pub render: RenderConfig,
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> ChalkboardResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_path(path: &Path) -> ChalkboardResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read engine config '{}'", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> ChalkboardResult<()> {
        if !(self.timing.default_ms.is_finite() && self.timing.default_ms > 0.0) {
            return Err(ChalkboardError::validation(
                "timing.default_ms must be finite and > 0",
            ));
        }
        if !(self.timing.one_touch_ms.is_finite() && self.timing.one_touch_ms > 0.0) {
            return Err(ChalkboardError::validation(
                "timing.one_touch_ms must be finite and > 0",
            ));
        }
        if !self.curve.bulge.is_finite() {
            return Err(ChalkboardError::validation("curve.bulge must be finite"));
        }
        if !(self.ghosts.fade_ms.is_finite() && self.ghosts.fade_ms >= 0.0) {
            return Err(ChalkboardError::validation(
                "ghosts.fade_ms must be finite and >= 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.ghosts.min_alpha) {
            return Err(ChalkboardError::validation(
                "ghosts.min_alpha must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Standard movement duration.
    pub default_ms: f64,
    /// Compressed duration for one-touch passes.
    pub one_touch_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_ms: 1000.0,
            one_touch_ms: 500.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Order annotations along pass/run chains (mover of one is the target of another).
    pub infer_chains: bool,
    /// Successive annotations of the same mover play one after another.
    pub sequence_same_mover: bool,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            infer_chains: true,
            sequence_same_mover: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OneTouchRule {
    pub enabled: bool,
    /// Largest step distance between the feeding pass and the follow-up pass.
    pub max_step_gap: u32,
    /// A run/dribble by the receiver between the two passes disqualifies the follow-up.
    pub require_no_intervening_run: bool,
}

impl Default for OneTouchRule {
    fn default() -> Self {
        Self {
            enabled: true,
            max_step_gap: 1,
            require_no_intervening_run: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Control-point offset from the chord midpoint, as a fraction of chord length.
    pub bulge: f64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self { bulge: 0.25 }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GhostConfig {
    pub fade_ms: f64,
    /// Alpha a ghost settles at once fully faded.
    pub min_alpha: f64,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            fade_ms: 1200.0,
            min_alpha: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub background_rgba: Rgba8,
    pub line_rgba: Rgba8,
    pub home_rgba: Rgba8,
    pub away_rgba: Rgba8,
    pub ball_rgba: Rgba8,
    /// Radius in board units.
    pub entity_radius: f64,
    pub ball_radius: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background_rgba: Rgba8::new(38, 112, 58, 255),
            line_rgba: Rgba8::new(240, 240, 240, 255),
            home_rgba: Rgba8::new(214, 48, 49, 255),
            away_rgba: Rgba8::new(9, 132, 227, 255),
            ball_rgba: Rgba8::new(250, 250, 250, 255),
            entity_radius: 14.0,
            ball_radius: 6.0,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
