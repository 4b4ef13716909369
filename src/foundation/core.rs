use crate::foundation::error::{ChalkboardError, ChalkboardResult};

pub use kurbo::{Point, Vec2};

/// Identity of a diagram entity (player, ball, cone).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a movement annotation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub String);

impl AnnotationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn validate(self) -> ChalkboardResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ChalkboardError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1050,
            height: 680,
        }
    }
}

/// Integer frame rate used by the deterministic exporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps(pub u32);

impl Fps {
    pub fn new(fps: u32) -> ChalkboardResult<Self> {
        if fps == 0 {
            return Err(ChalkboardError::validation("fps must be > 0"));
        }
        Ok(Self(fps))
    }

    /// Length of one virtual tick in milliseconds.
    pub fn tick_ms(self) -> f64 {
        1000.0 / f64::from(self.0)
    }

    pub fn ticks_to_ms(self, ticks: u64) -> f64 {
        (ticks as f64) * 1000.0 / f64::from(self.0)
    }

    pub fn ms_to_ticks_ceil(self, ms: f64) -> u64 {
        // Guard against 999.9999 style float noise rounding up a whole extra frame.
        let raw = ms.max(0.0) * f64::from(self.0) / 1000.0;
        let rounded = raw.round();
        if (raw - rounded).abs() < 1e-9 {
            rounded as u64
        } else {
            raw.ceil() as u64
        }
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

pub fn distance_sq(a: Point, b: Point) -> f64 {
    (a - b).hypot2()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
