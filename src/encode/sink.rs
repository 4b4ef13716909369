use crate::foundation::core::Fps;
use crate::foundation::error::{ChalkboardError, ChalkboardResult};
use crate::render::scene::FrameRGBA;

/// Fixed output format announced to an encoder before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
}

impl EncoderConfig {
    pub fn validate(&self) -> ChalkboardResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ChalkboardError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps.0 == 0 {
            return Err(ChalkboardError::validation("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // yuv420p chroma subsampling needs even dimensions.
            return Err(ChalkboardError::validation(
                "encode width/height must be even (required for yuv420p output)",
            ));
        }
        Ok(())
    }
}

/// Video encoder contract: frames in, container bytes out.
///
/// `push_frame` is called with strictly increasing indices between `begin` and `finish`.
/// `abort` discards everything and must be safe to call at any point, including twice.
pub trait VideoEncoder {
    fn begin(&mut self, cfg: EncoderConfig) -> ChalkboardResult<()>;
    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> ChalkboardResult<()>;
    fn finish(&mut self) -> ChalkboardResult<Vec<u8>>;
    fn abort(&mut self);
}

/// Keeps frames in memory; `finish` returns the raw frame bytes back to back.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<EncoderConfig>,
    /// Frames in push order.
    pub frames: Vec<(u64, FrameRGBA)>,
    pub aborted: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<EncoderConfig> {
        self.cfg
    }
}

impl VideoEncoder for InMemorySink {
    fn begin(&mut self, cfg: EncoderConfig) -> ChalkboardResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.frames.clear();
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> ChalkboardResult<()> {
        let Some(cfg) = self.cfg else {
            return Err(ChalkboardError::export("push_frame before begin"));
        };
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ChalkboardError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if let Some((last, _)) = self.frames.last()
            && idx <= *last
        {
            return Err(ChalkboardError::export(format!(
                "frame {idx} pushed after frame {last}"
            )));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn finish(&mut self) -> ChalkboardResult<Vec<u8>> {
        if self.cfg.take().is_none() {
            return Err(ChalkboardError::export("finish without begin"));
        }
        Ok(self
            .frames
            .iter()
            .flat_map(|(_, f)| f.data.iter().copied())
            .collect())
    }

    fn abort(&mut self) {
        self.cfg = None;
        self.frames.clear();
        self.aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
