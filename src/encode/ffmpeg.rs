use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use anyhow::Context as _;

use crate::encode::sink::{EncoderConfig, VideoEncoder};
use crate::foundation::core::Rgba8;
use crate::foundation::error::{ChalkboardError, ChalkboardResult};
use crate::foundation::math::mul_div255;
use crate::render::scene::FrameRGBA;

/// Environment variable naming the ffmpeg binary; defaults to `ffmpeg` on `PATH`.
pub const FFMPEG_ENV: &str = "CHALKBOARD_FFMPEG";

pub fn ffmpeg_program() -> PathBuf {
    std::env::var_os(FFMPEG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ffmpeg"))
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new(ffmpeg_program())
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// True when the configured ffmpeg can encode VP9 (built with libvpx).
pub fn ffmpeg_supports_vp9() -> bool {
    Command::new(ffmpeg_program())
        .args(["-hide_banner", "-encoders"])
        .stderr(Stdio::null())
        .output()
        .map(|o| o.status.success() && String::from_utf8_lossy(&o.stdout).contains("libvpx-vp9"))
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> ChalkboardResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

struct EncodeSession {
    cfg: EncoderConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
    out: TempFileGuard,
}

/// VP9-in-WebM encoder backed by the system ffmpeg binary.
///
/// Frames are flattened over an opaque background and piped as raw RGBA; ffmpeg writes into a
/// temporary file that `finish` reads back and removes.
pub struct FfmpegWebmEncoder {
    program: PathBuf,
    background: Rgba8,
    session: Option<EncodeSession>,
}

impl FfmpegWebmEncoder {
    /// `background` shows through transparent pixels; its alpha is ignored.
    pub fn new(background: Rgba8) -> Self {
        Self::with_program(ffmpeg_program(), background)
    }

    pub fn with_program(program: impl Into<PathBuf>, background: Rgba8) -> Self {
        Self {
            program: program.into(),
            background,
            session: None,
        }
    }

    fn temp_output_path() -> PathBuf {
        std::env::temp_dir().join(format!(
            "chalkboard_export_{}_{}.webm",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ))
    }
}

impl VideoEncoder for FfmpegWebmEncoder {
    fn begin(&mut self, cfg: EncoderConfig) -> ChalkboardResult<()> {
        cfg.validate()?;
        self.abort();

        let out = TempFileGuard(Some(Self::temp_output_path()));
        let out_path = out.0.clone().unwrap_or_default();

        let mut cmd = Command::new(&self.program);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.0.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libvpx-vp9",
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            "0",
            "-crf",
            "32",
            "-f",
            "webm",
        ])
        .arg(&out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ChalkboardError::export(format!(
                "failed to spawn '{}' (is ffmpeg installed? set {FFMPEG_ENV} to override): {e}",
                self.program.display()
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ChalkboardError::export("failed to open ffmpeg stdin (unexpected)"))?;

        tracing::debug!(
            width = cfg.width,
            height = cfg.height,
            fps = cfg.fps.0,
            out = %out_path.display(),
            "ffmpeg encoder started"
        );
        self.session = Some(EncodeSession {
            scratch: vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4],
            cfg,
            child,
            stdin: Some(stdin),
            out,
        });
        Ok(())
    }

    fn push_frame(&mut self, _idx: u64, frame: &FrameRGBA) -> ChalkboardResult<()> {
        let Some(s) = self.session.as_mut() else {
            return Err(ChalkboardError::export("ffmpeg encoder is not running"));
        };

        if frame.width != s.cfg.width || frame.height != s.cfg.height {
            return Err(ChalkboardError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, s.cfg.width, s.cfg.height
            )));
        }
        if frame.data.len() != s.scratch.len() {
            return Err(ChalkboardError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_frame(&mut s.scratch, frame, self.background)?;

        let Some(stdin) = s.stdin.as_mut() else {
            return Err(ChalkboardError::export("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&s.scratch).map_err(|e| {
            ChalkboardError::export(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn finish(&mut self) -> ChalkboardResult<Vec<u8>> {
        let Some(mut s) = self.session.take() else {
            return Err(ChalkboardError::export("ffmpeg encoder is not running"));
        };
        drop(s.stdin.take());

        let output = s.child.wait_with_output().map_err(|e| {
            ChalkboardError::export(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChalkboardError::export(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let path = s.out.0.as_deref().unwrap_or(Path::new(""));
        let bytes = std::fs::read(path)
            .with_context(|| format!("read encoded output '{}'", path.display()))?;
        Ok(bytes)
    }

    fn abort(&mut self) {
        if let Some(mut s) = self.session.take() {
            drop(s.stdin.take());
            let _ = s.child.kill();
            let _ = s.child.wait();
            tracing::debug!("ffmpeg encoder aborted");
        }
    }
}

impl Drop for FfmpegWebmEncoder {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Composite `frame` over an opaque background into `dst`.
fn flatten_frame(dst: &mut [u8], frame: &FrameRGBA, background: Rgba8) -> ChalkboardResult<()> {
    if dst.len() != frame.data.len() || !dst.len().is_multiple_of(4) {
        return Err(ChalkboardError::validation(format!(
            "cannot flatten a {}-byte frame into a {}-byte buffer",
            frame.data.len(),
            dst.len()
        )));
    }

    let bg = [background.r, background.g, background.b].map(u16::from);
    for (out, px) in dst.chunks_exact_mut(4).zip(frame.data.chunks_exact(4)) {
        let alpha = u16::from(px[3]);
        let cover = 255 - alpha;
        for ((o, &c), &b) in out.iter_mut().zip(&px[..3]).zip(&bg) {
            let fg = if frame.premultiplied {
                u16::from(c)
            } else {
                mul_div255(u16::from(c), alpha)
            };
            *o = (fg + mul_div255(b, cover)).min(255) as u8;
        }
        out[3] = 255;
    }

    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
