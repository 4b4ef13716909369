use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::choreography::cadence::classify_one_touch;
use crate::choreography::step::effective_steps;
use crate::config::EngineConfig;
use crate::diagram::model::{Annotation, CurveDirection, EndPoint, MovementKind};
use crate::diagram::state::DiagramView;
use crate::foundation::core::{AnnotationId, EntityId, Point};

/// One movement instruction, derived from an annotation for a single choreography build.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct QueuedAnimation {
    pub annotation: AnnotationId,
    pub entity: EntityId,
    pub authored_start: Point,
    pub end: EndPoint,
    pub curve: Option<CurveDirection>,
    pub duration_ms: f64,
    pub kind: MovementKind,
    pub target: Option<EntityId>,
    pub one_touch: bool,
    pub step: u32,
}

/// What the user asked to animate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Entity(EntityId),
    /// The annotation's mover is used as the selected entity.
    Annotation(AnnotationId),
}

/// Step-sorted movement queue plus the replay context it was built with.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct ChoreographyQueue {
    pub items: Vec<QueuedAnimation>,
    /// Built from an already-ghosted chain; starts come from `overrides`.
    pub replay: bool,
    /// Start positions that win over live state, keyed by moving entity.
    pub overrides: BTreeMap<EntityId, Point>,
}

impl ChoreographyQueue {
    pub fn involved_entities(&self) -> BTreeSet<EntityId> {
        self.items.iter().map(|q| q.entity.clone()).collect()
    }

    /// Split into the batches the scheduler will run, in order.
    pub fn batches(&self) -> Vec<Vec<QueuedAnimation>> {
        let mut pending: VecDeque<QueuedAnimation> = self.items.iter().cloned().collect();
        let mut out = Vec::new();
        while !pending.is_empty() {
            let n = next_batch_len(&pending);
            out.push(pending.drain(..n).collect());
        }
        out
    }

    /// Sum of batch durations; batches run back to back.
    pub fn total_duration_ms(&self) -> f64 {
        self.batches().iter().map(|b| batch_duration_ms(b)).sum()
    }
}

/// Length of the next batch at the head of `pending`.
///
/// A batch is the longest prefix sharing the head's step in which no entity moves twice. A second
/// movement of the same entity at the same step waits for the following batch, so at most one
/// live instance per entity ever exists.
pub fn next_batch_len(pending: &VecDeque<QueuedAnimation>) -> usize {
    let Some(head) = pending.front() else {
        return 0;
    };
    let mut movers = BTreeSet::new();
    pending
        .iter()
        .take_while(|q| q.step == head.step && movers.insert(&q.entity))
        .count()
}

pub fn batch_duration_ms(batch: &[QueuedAnimation]) -> f64 {
    batch.iter().map(|q| q.duration_ms).fold(0.0, f64::max)
}

/// Queue for the selected entity and every entity causally reachable from it.
///
/// Reachability follows annotation targets (a pass to B pulls in B's annotations, and so on).
/// Already-ghosted annotations are skipped, unless every animatable annotation of the selected
/// entity is ghosted: that is a replay, and the full original chain is rebuilt with start
/// overrides taken from the ghosts' origins.
#[tracing::instrument(skip(view, config))]
pub fn build_scoped(
    view: &dyn DiagramView,
    selection: &Selection,
    config: &EngineConfig,
) -> Option<ChoreographyQueue> {
    let root = match selection {
        Selection::Entity(id) => id.clone(),
        Selection::Annotation(id) => view.annotation(id)?.mover.clone(),
    };

    let animatable: Vec<&Annotation> = view
        .annotations()
        .iter()
        .filter(|a| a.kind.is_animatable())
        .collect();

    let own: Vec<&Annotation> = animatable
        .iter()
        .copied()
        .filter(|a| a.mover == root)
        .collect();
    if own.is_empty() {
        return None;
    }
    let replay = own.iter().all(|a| view.is_ghosted(&a.id));

    let eligible: Vec<&Annotation> = animatable
        .into_iter()
        .filter(|a| replay || !view.is_ghosted(&a.id))
        .collect();

    let mut reachable = BTreeSet::from([root]);
    loop {
        let before = reachable.len();
        for a in &eligible {
            if reachable.contains(&a.mover)
                && let Some(t) = a.target()
            {
                reachable.insert(t.clone());
            }
        }
        if reachable.len() == before {
            break;
        }
    }

    let candidates: Vec<&Annotation> = eligible
        .into_iter()
        .filter(|a| reachable.contains(&a.mover))
        .collect();

    let items = assemble(&candidates, config)?;
    let overrides = if replay {
        replay_overrides(view, &items)
    } else {
        BTreeMap::new()
    };

    tracing::debug!(items = items.len(), replay, "built scoped queue");
    Some(ChoreographyQueue {
        items,
        replay,
        overrides,
    })
}

/// Queue for every non-ghosted movement annotation in the diagram.
#[tracing::instrument(skip(view, config))]
pub fn build_unscoped(view: &dyn DiagramView, config: &EngineConfig) -> Option<ChoreographyQueue> {
    let candidates: Vec<&Annotation> = view
        .annotations()
        .iter()
        .filter(|a| a.kind.is_animatable() && !view.is_ghosted(&a.id))
        .collect();

    let items = assemble(&candidates, config)?;
    tracing::debug!(items = items.len(), "built unscoped queue");
    Some(ChoreographyQueue {
        items,
        replay: false,
        overrides: BTreeMap::new(),
    })
}

fn assemble(candidates: &[&Annotation], config: &EngineConfig) -> Option<Vec<QueuedAnimation>> {
    if candidates.is_empty() {
        return None;
    }

    let steps = effective_steps(candidates, &config.steps);
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    // Stable: ties keep input order.
    order.sort_by_key(|&i| steps[i]);

    let sorted: Vec<&Annotation> = order.iter().map(|&i| candidates[i]).collect();
    let sorted_steps: Vec<u32> = order.iter().map(|&i| steps[i]).collect();
    let one_touch = classify_one_touch(&sorted, &sorted_steps, &config.one_touch);

    let mut items = Vec::with_capacity(sorted.len());
    for ((ann, step), quick) in sorted.iter().zip(sorted_steps).zip(one_touch) {
        let kind = ann.movement_kind()?;
        items.push(QueuedAnimation {
            annotation: ann.id.clone(),
            entity: ann.mover.clone(),
            authored_start: ann.start,
            end: ann.end.clone(),
            curve: ann.curve,
            duration_ms: if quick {
                config.timing.one_touch_ms
            } else {
                config.timing.default_ms
            },
            kind,
            target: ann.target().cloned(),
            one_touch: quick,
            step,
        });
    }
    Some(items)
}

/// Earliest ghost origin for each mover in the chain.
fn replay_overrides(view: &dyn DiagramView, items: &[QueuedAnimation]) -> BTreeMap<EntityId, Point> {
    let mut out = BTreeMap::new();
    for item in items {
        if out.contains_key(&item.entity) {
            continue;
        }
        if let Some(g) = view
            .ghosts()
            .iter()
            .find(|g| g.annotation == item.annotation)
        {
            out.insert(item.entity.clone(), g.origin);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/queue.rs"]
mod tests;
