//! Interactive session: the single entry point a host drives.
//!
//! Requests mutate playback state synchronously; [`Engine::tick`] is called once per display
//! frame and returns the scene to draw.

use crate::choreography::queue::Selection;
use crate::config::EngineConfig;
use crate::diagram::state::DiagramState;
use crate::encode::sink::VideoEncoder;
use crate::export::exporter::{ExportHandle, ExportOptions, Exporter};
use crate::export::source::{ChoreographySource, FrameSource, SequenceSource};
use crate::foundation::error::{ChalkboardError, ChalkboardResult};
use crate::keyframe::sequence::Sequence;
use crate::playback::clock::{Clock, SystemClock};
use crate::playback::scheduler::Scheduler;
use crate::render::cpu::CpuRenderer;
use crate::render::scene::SceneSnapshot;

#[derive(Clone, Debug, PartialEq)]
pub enum UserRequest {
    PlayAll,
    PlayEntity(Selection),
    /// Scoped to the selection when one is given and the session is idle.
    StepForward(Option<Selection>),
    StepBack,
    CancelSession,
    CancelExport,
}

/// What an export plays back.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportContent {
    Choreography,
    Scoped(Selection),
    Sequence(Sequence),
}

pub struct Engine<S: DiagramState, C: Clock = SystemClock> {
    state: S,
    config: EngineConfig,
    scheduler: Scheduler,
    exporter: Exporter,
    clock: C,
}

impl<S: DiagramState> Engine<S, SystemClock> {
    pub fn new(state: S, config: EngineConfig) -> Self {
        Self::with_clock(state, config, SystemClock::new())
    }
}

impl<S: DiagramState, C: Clock> Engine<S, C> {
    pub fn with_clock(state: S, config: EngineConfig, clock: C) -> Self {
        Self {
            state,
            scheduler: Scheduler::new(config.clone()),
            config,
            exporter: Exporter::new(),
            clock,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Direct access for authoring edits. Editing while a session runs is the caller's
    /// responsibility; cancel first.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Apply one user request at the current clock time. `Ok(false)` when the request had
    /// nothing to act on.
    #[tracing::instrument(skip(self))]
    pub fn handle(&mut self, request: UserRequest) -> ChalkboardResult<bool> {
        let now = self.clock.now_ms();
        match request {
            UserRequest::PlayAll => self.scheduler.play_all(&mut self.state, now),
            UserRequest::PlayEntity(sel) => self.scheduler.play_entity(&mut self.state, &sel, now),
            UserRequest::StepForward(sel) => {
                self.scheduler
                    .step_forward(&mut self.state, sel.as_ref(), now)
            }
            UserRequest::StepBack => self.scheduler.step_back(&mut self.state),
            UserRequest::CancelSession => {
                let active = !self.scheduler.is_idle();
                self.scheduler.cancel(&mut self.state, now)?;
                Ok(active)
            }
            UserRequest::CancelExport => {
                let busy = self.exporter.is_busy();
                self.exporter.cancel();
                Ok(busy)
            }
        }
    }

    /// Advance playback to the clock's current time and capture the scene to draw.
    pub fn tick(&mut self) -> ChalkboardResult<SceneSnapshot> {
        let now = self.clock.now_ms();
        self.scheduler.tick(&mut self.state, now)?;
        let animated = self.scheduler.sample(now);
        Ok(SceneSnapshot::capture(
            &self.state,
            &animated,
            now,
            &self.config,
        ))
    }

    /// Cancel any interactive session and start a background export of a snapshot of the
    /// current diagram.
    pub fn start_export(
        &mut self,
        content: ExportContent,
        options: ExportOptions,
        encoder: Box<dyn VideoEncoder + Send>,
    ) -> ChalkboardResult<ExportHandle> {
        if self.exporter.is_busy() {
            return Err(ChalkboardError::ExportBusy);
        }
        options.encoder_config()?;

        let now = self.clock.now_ms();
        self.scheduler.cancel(&mut self.state, now)?;

        let source: Box<dyn FrameSource + Send> = match content {
            ExportContent::Choreography => {
                Box::new(ChoreographySource::new(&self.state, self.config.clone())?)
            }
            ExportContent::Scoped(sel) => Box::new(ChoreographySource::scoped(
                &self.state,
                &sel,
                self.config.clone(),
            )?),
            ExportContent::Sequence(seq) => Box::new(SequenceSource::new(seq, &self.state)?),
        };
        let renderer = CpuRenderer::new(options.width, options.height, self.config.render.clone())?;

        tracing::info!(
            fps = options.fps,
            width = options.width,
            height = options.height,
            total_ms = source.total_ms(),
            "starting export"
        );
        self.exporter
            .spawn(source, Box::new(renderer), encoder, options)
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
