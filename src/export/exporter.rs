use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver};

use crate::encode::sink::{EncoderConfig, VideoEncoder};
use crate::export::source::{FrameSource, frame_count};
use crate::foundation::core::Fps;
use crate::foundation::error::{ChalkboardError, ChalkboardResult};
use crate::playback::clock::{Clock, VirtualClock};
use crate::render::scene::SceneRenderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExportOptions {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 1280,
            height: 720,
        }
    }
}

impl ExportOptions {
    pub fn fps(&self) -> ChalkboardResult<Fps> {
        Fps::new(self.fps)
    }

    pub fn encoder_config(&self) -> ChalkboardResult<EncoderConfig> {
        let cfg = EncoderConfig {
            width: self.width,
            height: self.height,
            fps: self.fps()?,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Shared cancellation flag, checked once per virtual tick.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> ChalkboardResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChalkboardError::ExportBusy)?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Deterministic offline exporter.
///
/// Frame `i` is rendered at exactly `i * 1000 / fps` ms of virtual time, whatever the wall
/// clock does. At most one export runs at a time per exporter; clones share that limit and the
/// cancel flag.
#[derive(Clone, Debug, Default)]
pub struct Exporter {
    busy: Arc<AtomicBool>,
    cancel: CancelToken,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Request cancellation of the running export. Takes effect at the next tick.
    pub fn cancel(&self) {
        if self.is_busy() {
            tracing::info!("export cancel requested");
        }
        self.cancel.cancel();
    }

    /// Run an export on the calling thread. `on_progress` receives the completed fraction after
    /// every frame.
    pub fn export(
        &self,
        source: &mut dyn FrameSource,
        renderer: &mut dyn SceneRenderer,
        encoder: &mut dyn VideoEncoder,
        options: ExportOptions,
        on_progress: &mut dyn FnMut(f64),
    ) -> ChalkboardResult<Vec<u8>> {
        let cfg = options.encoder_config()?;
        let _guard = BusyGuard::acquire(&self.busy)?;
        self.cancel.reset();
        run_export(source, renderer, encoder, cfg, &self.cancel, on_progress)
    }

    /// Run an export on a worker thread. Busy is checked before the thread starts.
    pub fn spawn(
        &self,
        mut source: Box<dyn FrameSource + Send>,
        mut renderer: Box<dyn SceneRenderer + Send>,
        mut encoder: Box<dyn VideoEncoder + Send>,
        options: ExportOptions,
    ) -> ChalkboardResult<ExportHandle> {
        let cfg = options.encoder_config()?;
        let guard = BusyGuard::acquire(&self.busy)?;
        self.cancel.reset();

        let (tx, rx) = channel::unbounded();
        let cancel = self.cancel.clone();
        let worker_cancel = cancel.clone();
        let join = std::thread::Builder::new()
            .name("chalkboard-export".to_owned())
            .spawn(move || {
                let _guard = guard;
                let mut report = |p: f64| {
                    let _ = tx.send(p);
                };
                run_export(
                    source.as_mut(),
                    renderer.as_mut(),
                    encoder.as_mut(),
                    cfg,
                    &worker_cancel,
                    &mut report,
                )
            })
            .map_err(|e| ChalkboardError::export(format!("failed to start export thread: {e}")))?;

        Ok(ExportHandle {
            progress: rx,
            last_progress: 0.0,
            cancel,
            join: Some(join),
        })
    }
}

/// A running background export.
pub struct ExportHandle {
    progress: Receiver<f64>,
    last_progress: f64,
    cancel: CancelToken,
    join: Option<JoinHandle<ChalkboardResult<Vec<u8>>>>,
}

impl ExportHandle {
    /// Latest reported progress in `[0, 1]`.
    pub fn poll_progress(&mut self) -> f64 {
        while let Ok(p) = self.progress.try_recv() {
            self.last_progress = p;
        }
        self.last_progress
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Block until the export ends and return the encoded bytes.
    pub fn wait(mut self) -> ChalkboardResult<Vec<u8>> {
        let join = self
            .join
            .take()
            .ok_or_else(|| ChalkboardError::export("export already joined"))?;
        join.join()
            .map_err(|_| ChalkboardError::export("export thread panicked"))?
    }
}

#[tracing::instrument(skip_all, fields(width = cfg.width, height = cfg.height, fps = cfg.fps.0))]
fn run_export(
    source: &mut dyn FrameSource,
    renderer: &mut dyn SceneRenderer,
    encoder: &mut dyn VideoEncoder,
    cfg: EncoderConfig,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(f64),
) -> ChalkboardResult<Vec<u8>> {
    let total = frame_count(source.total_ms(), cfg.fps);
    tracing::info!(frames = total, total_ms = source.total_ms(), "export started");

    encoder.begin(cfg)?;
    let mut clock = VirtualClock::new(cfg.fps);

    for idx in 0..total {
        if cancel.is_cancelled() {
            encoder.abort();
            tracing::info!(frame = idx, "export cancelled");
            return Err(ChalkboardError::ExportCancelled);
        }

        let frame = source
            .scene_at(clock.now_ms())
            .and_then(|scene| renderer.render(&scene))
            .and_then(|frame| encoder.push_frame(idx, &frame));
        if let Err(err) = frame {
            encoder.abort();
            tracing::warn!(frame = idx, error = %err, "export failed");
            return Err(err);
        }

        clock.advance();
        on_progress((idx + 1) as f64 / total as f64);
    }

    let bytes = encoder.finish().inspect_err(|err| {
        tracing::warn!(error = %err, "encoder failed to finalize");
    })?;
    tracing::info!(frames = total, bytes = bytes.len(), "export finished");
    Ok(bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/export/exporter.rs"]
mod tests;
