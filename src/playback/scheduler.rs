//! Batch scheduler.
//!
//! Owns every piece of ephemeral playback state: pending queue, batch history, live instances,
//! the previous batch's finished instances and replay overrides. The render loop drives it with
//! [`Scheduler::tick`]; user requests map onto the public methods. Diagram changes only ever go
//! through [`DiagramState::dispatch`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::choreography::queue::{
    ChoreographyQueue, QueuedAnimation, Selection, build_scoped, build_unscoped, next_batch_len,
};
use crate::choreography::resolve::{LiveInstance, ResolvedBatch, resolve_batch};
use crate::config::EngineConfig;
use crate::diagram::state::{DiagramState, MovementCommit, Transition};
use crate::foundation::core::{EntityId, Point};
use crate::foundation::error::ChalkboardResult;
use crate::playback::animator::{AnimatedPositions, Animator};

/// Session mode. Whether a batch is in flight is orthogonal, see [`Scheduler::is_animating`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    Idle,
    /// Batches advance on their own as each one completes.
    AutoPlaying { replay: bool },
    /// Batches advance or rewind only on explicit requests.
    Stepping,
}

#[derive(Clone, Debug)]
struct HistoryEntry {
    group: Vec<QueuedAnimation>,
    /// Committed instances; empty while the batch is still in flight.
    finished: Vec<LiveInstance>,
    consumed_overrides: BTreeMap<EntityId, Point>,
}

#[derive(Debug)]
pub struct Scheduler {
    config: EngineConfig,
    mode: PlaybackMode,
    pending: VecDeque<QueuedAnimation>,
    history: Vec<HistoryEntry>,
    animator: Animator,
    just_finished: Vec<LiveInstance>,
    overrides: BTreeMap<EntityId, Point>,
    involved: BTreeSet<EntityId>,
}

impl Scheduler {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            mode: PlaybackMode::Idle,
            pending: VecDeque::new(),
            history: Vec::new(),
            animator: Animator::new(),
            just_finished: Vec::new(),
            overrides: BTreeMap::new(),
            involved: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == PlaybackMode::Idle
    }

    pub fn is_animating(&self) -> bool {
        !self.animator.is_empty()
    }

    pub fn pending(&self) -> &VecDeque<QueuedAnimation> {
        &self.pending
    }

    /// Started batches, oldest first. Together with [`Scheduler::pending`] this is always the
    /// full queue the session was built from.
    pub fn history(&self) -> impl Iterator<Item = &[QueuedAnimation]> {
        self.history.iter().map(|e| e.group.as_slice())
    }

    pub fn live_instances(&self) -> &[LiveInstance] {
        self.animator.instances()
    }

    pub fn just_finished(&self) -> &[LiveInstance] {
        &self.just_finished
    }

    pub fn sample(&self, now_ms: f64) -> AnimatedPositions {
        self.animator.sample(now_ms)
    }

    /// Auto-play every non-ghosted movement in the diagram. `Ok(false)` when there is nothing to
    /// animate.
    pub fn play_all<S: DiagramState>(&mut self, state: &mut S, now_ms: f64) -> ChalkboardResult<bool> {
        self.cancel(state, now_ms)?;
        let Some(queue) = build_unscoped(&*state, &self.config) else {
            return Ok(false);
        };
        self.play_queue(state, queue, now_ms)
    }

    /// Auto-play the selected entity's causal chain, replaying it from its ghosts if it already
    /// ran.
    pub fn play_entity<S: DiagramState>(
        &mut self,
        state: &mut S,
        selection: &Selection,
        now_ms: f64,
    ) -> ChalkboardResult<bool> {
        self.cancel(state, now_ms)?;
        let Some(queue) = build_scoped(&*state, selection, &self.config) else {
            return Ok(false);
        };
        self.play_queue(state, queue, now_ms)
    }

    /// Auto-play a prebuilt queue.
    pub fn play_queue<S: DiagramState>(
        &mut self,
        state: &mut S,
        queue: ChoreographyQueue,
        now_ms: f64,
    ) -> ChalkboardResult<bool> {
        let mode = PlaybackMode::AutoPlaying {
            replay: queue.replay,
        };
        self.begin(state, queue, mode, now_ms)
    }

    /// Start the next batch manually. From Idle this builds a queue first (scoped when a
    /// selection is given). A batch still in flight is completed before the next one starts.
    pub fn step_forward<S: DiagramState>(
        &mut self,
        state: &mut S,
        selection: Option<&Selection>,
        now_ms: f64,
    ) -> ChalkboardResult<bool> {
        if self.is_idle() {
            let queue = match selection {
                Some(sel) => build_scoped(&*state, sel, &self.config),
                None => build_unscoped(&*state, &self.config),
            };
            let Some(queue) = queue else {
                return Ok(false);
            };
            return self.begin(state, queue, PlaybackMode::Stepping, now_ms);
        }

        self.finish_in_flight(state)?;
        self.mode = PlaybackMode::Stepping;
        self.start_next_batch(state, now_ms)
    }

    /// Undo the most recent batch and put it back at the front of the queue.
    pub fn step_back<S: DiagramState>(&mut self, state: &mut S) -> ChalkboardResult<bool> {
        if self.is_idle() {
            return Ok(false);
        }

        self.finish_in_flight(state)?;
        self.mode = PlaybackMode::Stepping;
        let Some(entry) = self.history.pop() else {
            return Ok(false);
        };

        for _ in &entry.finished {
            if let Err(err) = state.dispatch(Transition::Undo) {
                self.reset();
                return Err(err);
            }
        }
        for item in entry.group.into_iter().rev() {
            self.pending.push_front(item);
        }
        self.overrides.extend(entry.consumed_overrides);
        self.just_finished = self
            .history
            .last()
            .map(|e| e.finished.clone())
            .unwrap_or_default();

        tracing::debug!(
            pending = self.pending.len(),
            history = self.history.len(),
            "stepped back"
        );
        Ok(true)
    }

    /// End the session. In-flight movements are dropped uncommitted. A cancelled stepping
    /// session also clears its ghosts; every remaining ghost starts fading at `now_ms`.
    pub fn cancel<S: DiagramState>(&mut self, state: &mut S, now_ms: f64) -> ChalkboardResult<()> {
        if self.is_idle() {
            return Ok(());
        }
        let stepping = self.mode == PlaybackMode::Stepping;
        let involved = std::mem::take(&mut self.involved);
        self.reset();
        tracing::debug!(stepping, "session cancelled");

        if stepping {
            for entity in involved {
                state.dispatch(Transition::ClearGhosts { entity })?;
            }
        }
        state.dispatch(Transition::MarkGhostFade { at_ms: now_ms })
    }

    /// Advance to `now_ms`: commit the current batch once every instance has finished and, when
    /// auto-playing, start the next one at the finished batch's scheduled end.
    pub fn tick<S: DiagramState>(&mut self, state: &mut S, now_ms: f64) -> ChalkboardResult<()> {
        loop {
            if self.is_idle() || self.animator.is_empty() || !self.animator.all_finished(now_ms) {
                return Ok(());
            }

            let end_ms = self.complete_batch(state)?;
            match self.mode {
                PlaybackMode::AutoPlaying { .. } => {
                    if !self.start_next_batch(state, end_ms)? {
                        return self.end_session(state, end_ms);
                    }
                }
                PlaybackMode::Stepping | PlaybackMode::Idle => return Ok(()),
            }
        }
    }

    fn begin<S: DiagramState>(
        &mut self,
        state: &mut S,
        queue: ChoreographyQueue,
        mode: PlaybackMode,
        now_ms: f64,
    ) -> ChalkboardResult<bool> {
        self.reset();

        let involved = queue.involved_entities();
        for entity in &involved {
            state.dispatch(Transition::ClearGhosts {
                entity: entity.clone(),
            })?;
        }

        tracing::debug!(
            items = queue.items.len(),
            replay = queue.replay,
            ?mode,
            "session started"
        );
        self.involved = involved;
        self.overrides = queue.overrides;
        self.pending = queue.items.into();
        self.mode = mode;
        self.start_next_batch(state, now_ms)
    }

    /// Pop, resolve and start the next batch. `Ok(false)` when the queue is empty.
    fn start_next_batch<S: DiagramState>(
        &mut self,
        state: &mut S,
        started_at_ms: f64,
    ) -> ChalkboardResult<bool> {
        let n = next_batch_len(&self.pending);
        if n == 0 {
            return Ok(false);
        }
        let group: Vec<QueuedAnimation> = self.pending.drain(..n).collect();

        let resolved = resolve_batch(
            &group,
            &*state,
            &self.overrides,
            &self.just_finished,
            started_at_ms,
            &self.config.curve,
        );
        if let Err(err) = self.apply_batch_start(state, resolved) {
            tracing::warn!(error = %err, "batch failed to start; scheduler reset");
            self.reset();
            return Err(err);
        }

        let consumed_overrides = group
            .iter()
            .filter_map(|q| self.overrides.remove_entry(&q.entity))
            .collect();
        tracing::debug!(step = group[0].step, items = group.len(), started_at_ms, "batch started");
        self.history.push(HistoryEntry {
            group,
            finished: Vec::new(),
            consumed_overrides,
        });
        Ok(true)
    }

    fn apply_batch_start<S: DiagramState>(
        &mut self,
        state: &mut S,
        resolved: ResolvedBatch,
    ) -> ChalkboardResult<()> {
        self.animator.start(resolved.instances)?;
        if let Some(to) = resolved.effects.ball_snap {
            state.dispatch(Transition::MoveBall { to })?;
        }
        if resolved.effects.pass_cue {
            state.dispatch(Transition::PassCue)?;
        }
        Ok(())
    }

    /// Commit every live instance, one undoable transition each. Returns the batch's
    /// scheduled end.
    fn complete_batch<S: DiagramState>(&mut self, state: &mut S) -> ChalkboardResult<f64> {
        let end_ms = self.animator.batch_end_ms().unwrap_or(0.0);
        let finished = self.animator.drain();

        for i in &finished {
            let commit = MovementCommit {
                entity: i.entity.clone(),
                annotation: i.annotation.clone(),
                kind: i.kind,
                from: i.start,
                to: i.end,
            };
            if let Err(err) = state.dispatch(Transition::CommitMovement(commit)) {
                self.reset();
                return Err(err);
            }
        }

        tracing::debug!(items = finished.len(), end_ms, "batch complete");
        if let Some(entry) = self.history.last_mut() {
            entry.finished = finished.clone();
        }
        self.just_finished = finished;
        Ok(end_ms)
    }

    fn finish_in_flight<S: DiagramState>(&mut self, state: &mut S) -> ChalkboardResult<()> {
        if !self.animator.is_empty() {
            self.complete_batch(state)?;
        }
        Ok(())
    }

    fn end_session<S: DiagramState>(&mut self, state: &mut S, at_ms: f64) -> ChalkboardResult<()> {
        tracing::debug!(at_ms, "session finished");
        self.reset();
        state.dispatch(Transition::MarkGhostFade { at_ms })
    }

    fn reset(&mut self) {
        self.mode = PlaybackMode::Idle;
        self.pending.clear();
        self.history.clear();
        self.animator.clear();
        self.just_finished.clear();
        self.overrides.clear();
        self.involved.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/scheduler.rs"]
mod tests;
