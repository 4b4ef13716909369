use std::collections::{BTreeMap, BTreeSet};

use crate::choreography::resolve::LiveInstance;
use crate::foundation::core::{EntityId, Point};
use crate::foundation::error::{ChalkboardError, ChalkboardResult};

/// Interpolated positions at one instant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimatedPositions {
    /// Entities displaced by an in-flight run or dribble.
    pub movers: BTreeMap<EntityId, Point>,
    /// Ball position while a pass or dribble is in flight.
    pub ball: Option<Point>,
}

/// The active set of live instances for the current batch.
#[derive(Clone, Debug, Default)]
pub struct Animator {
    active: Vec<LiveInstance>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly resolved batch.
    ///
    /// Fails, leaving the active set untouched, if any instance would give an entity a second
    /// live movement.
    pub fn start(&mut self, instances: Vec<LiveInstance>) -> ChalkboardResult<()> {
        let mut seen: BTreeSet<&EntityId> = self.active.iter().map(|i| &i.entity).collect();
        for i in &instances {
            if !seen.insert(&i.entity) {
                return Err(ChalkboardError::choreography(format!(
                    "entity '{}' already has a live movement",
                    i.entity
                )));
            }
        }
        self.active.extend(instances);
        Ok(())
    }

    pub fn instances(&self) -> &[LiveInstance] {
        &self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// True once every instance has reached full progress. An empty set counts as finished.
    pub fn all_finished(&self, now_ms: f64) -> bool {
        self.active.iter().all(|i| i.is_finished(now_ms))
    }

    /// Scheduled end of the batch: the latest instance end.
    pub fn batch_end_ms(&self) -> Option<f64> {
        self.active
            .iter()
            .map(LiveInstance::ends_at_ms)
            .max_by(f64::total_cmp)
    }

    pub fn sample(&self, now_ms: f64) -> AnimatedPositions {
        let mut out = AnimatedPositions::default();
        for i in &self.active {
            let p = i.position_at(now_ms);
            if i.kind.moves_mover() {
                out.movers.insert(i.entity.clone(), p);
            }
            if i.kind.moves_ball() && out.ball.is_none() {
                out.ball = Some(p);
            }
        }
        out
    }

    pub fn drain(&mut self) -> Vec<LiveInstance> {
        std::mem::take(&mut self.active)
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/animator.rs"]
mod tests;
