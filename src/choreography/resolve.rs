//! Batch position resolution shared by interactive playback and export.
//!
//! [`resolve_batch`] is pure: it reads diagram state and the previous batch's finished instances,
//! and returns resolved instances plus the side effects the caller should dispatch. The
//! interactive scheduler calls it with a wall-clock start stamp, the exporter with a virtual one.

use std::collections::BTreeMap;

use kurbo::Vec2;

use crate::choreography::queue::QueuedAnimation;
use crate::config::CurveConfig;
use crate::diagram::model::{CurveDirection, EndPoint, MovementKind};
use crate::diagram::state::DiagramView;
use crate::foundation::core::{AnnotationId, EntityId, Point, distance_sq};
use crate::foundation::math::{lerp_point, quad_point};

/// One in-flight movement with fully resolved geometry.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LiveInstance {
    pub entity: EntityId,
    pub annotation: AnnotationId,
    pub kind: MovementKind,
    pub start: Point,
    pub end: Point,
    /// Quadratic control point, curved runs only.
    pub control: Option<Point>,
    pub started_at_ms: f64,
    pub duration_ms: f64,
    pub target: Option<EntityId>,
    pub one_touch: bool,
}

impl LiveInstance {
    /// Elapsed fraction, clamped to `[0, 1]`.
    pub fn progress(&self, now_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.started_at_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    pub fn position_at(&self, now_ms: f64) -> Point {
        let t = self.progress(now_ms);
        match self.control {
            Some(c) => quad_point(self.start, c, self.end, t),
            None => lerp_point(self.start, self.end, t),
        }
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }

    pub fn ends_at_ms(&self) -> f64 {
        self.started_at_ms + self.duration_ms
    }
}

/// Side effects requested when a batch begins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchEffects {
    /// Where the shared ball snaps to: the start of the first pass or dribble.
    pub ball_snap: Option<Point>,
    /// Play the pass cue once for this batch.
    pub pass_cue: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedBatch {
    pub instances: Vec<LiveInstance>,
    pub effects: BatchEffects,
}

/// Resolve start, end and control points for every item of one batch.
///
/// Start, first match wins: explicit override; the just-finished instance of the same entity
/// (its start for passes, its end otherwise); the nearer of the entity's closest ghost and its
/// live position relative to the authored start; the live position; the origin.
///
/// End for entity targets: a same-batch run/dribble by the target; else the target's
/// just-finished non-pass end; else the target's override, if any; else its live position.
///
/// Runs and dribbles are resolved before passes so a pass can lead a receiver who is running in
/// the same batch. Among runs, fixed ends are known up front and entity-targeted runs are
/// resolved after the runs they chase, so the result does not depend on batch order.
#[tracing::instrument(skip_all, fields(items = batch.len(), started_at_ms))]
pub fn resolve_batch(
    batch: &[QueuedAnimation],
    live: &dyn DiagramView,
    overrides: &BTreeMap<EntityId, Point>,
    just_finished: &[LiveInstance],
    started_at_ms: f64,
    curve: &CurveConfig,
) -> ResolvedBatch {
    let finished: BTreeMap<&EntityId, &LiveInstance> =
        just_finished.iter().map(|i| (&i.entity, i)).collect();

    // Fixed run and dribble ends are known up front.
    let mut same_batch_ends: BTreeMap<EntityId, Point> = batch
        .iter()
        .filter(|q| q.kind.moves_mover())
        .filter_map(|q| match &q.end {
            EndPoint::At(p) => Some((q.entity.clone(), *p)),
            EndPoint::Entity(_) => None,
        })
        .collect();

    let mut chasing: Vec<usize> = batch
        .iter()
        .enumerate()
        .filter(|(_, q)| q.kind.moves_mover() && matches!(q.end, EndPoint::Entity(_)))
        .map(|(idx, _)| idx)
        .collect();
    let mut order: Vec<usize> = batch
        .iter()
        .enumerate()
        .filter(|(_, q)| q.kind.moves_mover() && matches!(q.end, EndPoint::At(_)))
        .map(|(idx, _)| idx)
        .collect();
    // Chasers whose target is itself an unresolved chaser wait; a cycle falls back to input order.
    while !chasing.is_empty() {
        let ready = chasing
            .iter()
            .position(|&i| {
                !chasing
                    .iter()
                    .any(|&j| batch[i].target.as_ref() == Some(&batch[j].entity))
            })
            .unwrap_or(0);
        order.push(chasing.remove(ready));
    }
    order.extend(
        batch
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.kind.moves_mover())
            .map(|(idx, _)| idx),
    );

    let mut slots: Vec<Option<LiveInstance>> = vec![None; batch.len()];
    for idx in order {
        let item = &batch[idx];
        let start = resolve_start(item, live, overrides, &finished);
        let end = resolve_end(item, live, overrides, &finished, &same_batch_ends);
        let control = item
            .curve
            .map(|dir| control_point(start, end, dir, curve.bulge));

        if item.kind.moves_mover() {
            same_batch_ends.insert(item.entity.clone(), end);
        }

        slots[idx] = Some(LiveInstance {
            entity: item.entity.clone(),
            annotation: item.annotation.clone(),
            kind: item.kind,
            start,
            end,
            control,
            started_at_ms,
            duration_ms: item.duration_ms,
            target: item.target.clone(),
            one_touch: item.one_touch,
        });
    }

    let instances: Vec<LiveInstance> = slots.into_iter().flatten().collect();
    let effects = BatchEffects {
        ball_snap: instances
            .iter()
            .find(|i| i.kind.moves_ball())
            .map(|i| i.start),
        pass_cue: instances.iter().any(|i| i.kind == MovementKind::Pass),
    };

    ResolvedBatch { instances, effects }
}

fn resolve_start(
    item: &QueuedAnimation,
    live: &dyn DiagramView,
    overrides: &BTreeMap<EntityId, Point>,
    finished: &BTreeMap<&EntityId, &LiveInstance>,
) -> Point {
    if let Some(p) = overrides.get(&item.entity) {
        return *p;
    }

    if let Some(prev) = finished.get(&item.entity) {
        return if prev.kind == MovementKind::Pass {
            prev.start
        } else {
            prev.end
        };
    }

    let real = live.entity_position(&item.entity);
    let nearest_ghost = live
        .ghosts_for(&item.entity)
        .into_iter()
        .map(|g| g.position)
        .min_by(|a, b| {
            distance_sq(*a, item.authored_start).total_cmp(&distance_sq(*b, item.authored_start))
        });

    match (nearest_ghost, real) {
        (Some(g), Some(r)) => {
            if distance_sq(g, item.authored_start) < distance_sq(r, item.authored_start) {
                g
            } else {
                r
            }
        }
        (Some(g), None) => g,
        (None, Some(r)) => r,
        (None, None) => Point::ORIGIN,
    }
}

fn resolve_end(
    item: &QueuedAnimation,
    live: &dyn DiagramView,
    overrides: &BTreeMap<EntityId, Point>,
    finished: &BTreeMap<&EntityId, &LiveInstance>,
    same_batch_ends: &BTreeMap<EntityId, Point>,
) -> Point {
    let target = match &item.end {
        EndPoint::At(p) => return *p,
        EndPoint::Entity(id) => id,
    };

    if let Some(p) = same_batch_ends.get(target) {
        return *p;
    }
    if let Some(prev) = finished.get(target)
        && prev.kind != MovementKind::Pass
    {
        return prev.end;
    }
    // During a replay the live position of a target that has not moved yet is stale.
    overrides
        .get(target)
        .copied()
        .or_else(|| live.entity_position(target))
        .unwrap_or(Point::ORIGIN)
}

/// Offset the chord midpoint perpendicular to the chord, to the mover's left or right
/// (screen coordinates, y down).
pub fn control_point(start: Point, end: Point, dir: CurveDirection, bulge: f64) -> Point {
    let chord = end - start;
    let normal = match dir {
        CurveDirection::Left => Vec2::new(chord.y, -chord.x),
        CurveDirection::Right => Vec2::new(-chord.y, chord.x),
    };
    start.midpoint(end) + normal * bulge
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/resolve.rs"]
mod tests;
