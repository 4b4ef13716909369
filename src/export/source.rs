//! Frame sources for deterministic export.
//!
//! A source owns a private copy of the diagram and produces one scene per virtual tick. Nothing
//! here touches interactive state.

use std::collections::BTreeSet;

use crate::choreography::queue::{ChoreographyQueue, Selection, build_scoped, build_unscoped};
use crate::config::EngineConfig;
use crate::diagram::model::Diagram;
use crate::diagram::state::{DiagramState, DiagramView, Transition};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ChalkboardError, ChalkboardResult};
use crate::keyframe::sequence::Sequence;
use crate::playback::clock::{Clock, VirtualClock};
use crate::playback::scheduler::Scheduler;
use crate::render::scene::SceneSnapshot;

pub trait FrameSource {
    /// Virtual playback length.
    fn total_ms(&self) -> f64;

    fn board(&self) -> Canvas;

    /// Scene at `now_ms`. Calls must use non-decreasing times.
    fn scene_at(&mut self, now_ms: f64) -> ChalkboardResult<SceneSnapshot>;
}

/// Ticks needed to cover `total_ms`, with frame 0 at the start state and the last frame at or
/// past the end state.
pub fn frame_count(total_ms: f64, fps: Fps) -> u64 {
    fps.ms_to_ticks_ceil(total_ms) + 1
}

/// Keyframe playback over a diagram's entities.
#[derive(Clone, Debug)]
pub struct SequenceSource {
    sequence: Sequence,
    base: Diagram,
}

impl SequenceSource {
    pub fn new(sequence: Sequence, view: &dyn DiagramView) -> ChalkboardResult<Self> {
        sequence.validate()?;
        if sequence.keyframes.is_empty() {
            return Err(ChalkboardError::validation(format!(
                "sequence '{}' has no keyframes to export",
                sequence.name
            )));
        }
        Ok(Self {
            sequence,
            base: view.snapshot(),
        })
    }
}

impl FrameSource for SequenceSource {
    fn total_ms(&self) -> f64 {
        self.sequence.total_ms()
    }

    fn board(&self) -> Canvas {
        self.base.board
    }

    fn scene_at(&mut self, now_ms: f64) -> ChalkboardResult<SceneSnapshot> {
        let positions = self.sequence.sample_at(now_ms);
        Ok(SceneSnapshot::with_positions(&self.base, &positions, now_ms))
    }
}

/// Line-annotation choreography driven by its own scheduler.
///
/// The private diagram is rewound to where each entity stood before its first ghosted movement
/// and every ghost is dropped, so the export always shows the full choreography from the top.
/// The ball starts with whoever plays it first.
#[derive(Debug)]
pub struct ChoreographySource {
    diagram: Diagram,
    scheduler: Scheduler,
    config: EngineConfig,
    total_ms: f64,
}

impl ChoreographySource {
    /// Every movement annotation in the diagram.
    pub fn new(view: &dyn DiagramView, config: EngineConfig) -> ChalkboardResult<Self> {
        let diagram = rewound_snapshot(view)?;
        let queue = build_unscoped(&diagram, &config);
        Self::with_queue(diagram, queue, config)
    }

    /// One entity's causal chain.
    pub fn scoped(
        view: &dyn DiagramView,
        selection: &Selection,
        config: EngineConfig,
    ) -> ChalkboardResult<Self> {
        let diagram = rewound_snapshot(view)?;
        let queue = build_scoped(&diagram, selection, &config);
        Self::with_queue(diagram, queue, config)
    }

    fn with_queue(
        mut diagram: Diagram,
        queue: Option<ChoreographyQueue>,
        config: EngineConfig,
    ) -> ChalkboardResult<Self> {
        let queue = queue
            .ok_or_else(|| ChalkboardError::validation("no movement annotations to export"))?;
        let total_ms = queue.total_duration_ms();

        if let Some(first) = queue.items.iter().find(|q| q.kind.moves_ball()) {
            let to = diagram
                .entity_position(&first.entity)
                .unwrap_or(first.authored_start);
            diagram.dispatch(Transition::MoveBall { to })?;
        }

        let mut scheduler = Scheduler::new(config.clone());
        scheduler.play_queue(&mut diagram, queue, 0.0)?;
        Ok(Self {
            diagram,
            scheduler,
            config,
            total_ms,
        })
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

impl FrameSource for ChoreographySource {
    fn total_ms(&self) -> f64 {
        self.total_ms
    }

    fn board(&self) -> Canvas {
        self.diagram.board
    }

    fn scene_at(&mut self, now_ms: f64) -> ChalkboardResult<SceneSnapshot> {
        self.scheduler.tick(&mut self.diagram, now_ms)?;
        let animated = self.scheduler.sample(now_ms);
        Ok(SceneSnapshot::capture(
            &self.diagram,
            &animated,
            now_ms,
            &self.config,
        ))
    }
}

fn rewound_snapshot(view: &dyn DiagramView) -> ChalkboardResult<Diagram> {
    let mut diagram = view.snapshot();
    let mut rewound = BTreeSet::new();
    let origins: Vec<_> = diagram
        .ghosts
        .iter()
        .filter(|g| rewound.insert(g.entity.clone()))
        .map(|g| (g.entity.clone(), g.origin))
        .collect();
    for (id, origin) in origins {
        if let Some(e) = diagram.entities.iter_mut().find(|e| e.id == id) {
            e.position = origin;
        }
    }
    diagram.dispatch(Transition::ClearAllGhosts)?;
    Ok(diagram)
}

/// Every scene a source produces at `fps`, in tick order.
pub fn collect_scenes(source: &mut dyn FrameSource, fps: Fps) -> ChalkboardResult<Vec<SceneSnapshot>> {
    let total = frame_count(source.total_ms(), fps);
    let mut clock = VirtualClock::new(fps);
    let mut out = Vec::with_capacity(total as usize);
    for _ in 0..total {
        out.push(source.scene_at(clock.now_ms())?);
        clock.advance();
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/export/source.rs"]
mod tests;
