//! Diagram/state collaborator contract.
//!
//! The engine only reads positions, annotations and ghosts through [`DiagramView`] and requests
//! changes by dispatching [`Transition`]s; it never mutates diagram data directly.

use crate::diagram::model::{Annotation, Diagram, Entity, Ghost, MovementKind};
use crate::foundation::core::{AnnotationId, Canvas, EntityId, Point};
use crate::foundation::error::{ChalkboardError, ChalkboardResult};

pub trait DiagramView {
    fn board(&self) -> Canvas;
    fn entities(&self) -> &[Entity];
    fn annotations(&self) -> &[Annotation];
    fn ghosts(&self) -> &[Ghost];

    /// Owned copy used by exports, which must never touch live interactive state.
    fn snapshot(&self) -> Diagram;

    fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities().iter().find(|e| &e.id == id)
    }

    fn entity_position(&self, id: &EntityId) -> Option<Point> {
        self.entity(id).map(|e| e.position)
    }

    fn annotation(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations().iter().find(|a| &a.id == id)
    }

    /// The shared ball: the first ball entity in the diagram.
    fn ball(&self) -> Option<&Entity> {
        self.entities().iter().find(|e| e.is_ball())
    }

    fn ghosts_for(&self, entity: &EntityId) -> Vec<&Ghost> {
        self.ghosts().iter().filter(|g| &g.entity == entity).collect()
    }

    fn is_ghosted(&self, annotation: &AnnotationId) -> bool {
        self.ghosts().iter().any(|g| &g.annotation == annotation)
    }
}

pub trait DiagramState: DiagramView {
    fn dispatch(&mut self, transition: Transition) -> ChalkboardResult<()>;
}

/// A completed movement, committed to the diagram as one undoable step.
#[derive(Clone, Debug, PartialEq)]
pub struct MovementCommit {
    pub entity: EntityId,
    pub annotation: AnnotationId,
    pub kind: MovementKind,
    pub from: Point,
    pub to: Point,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// Snap the shared ball to a point. Not undoable.
    MoveBall { to: Point },
    /// Apply a completed movement and record its ghost. Undoable.
    CommitMovement(MovementCommit),
    ClearGhosts { entity: EntityId },
    ClearAllGhosts,
    /// Start fading every ghost that is not already fading.
    MarkGhostFade { at_ms: f64 },
    /// Audio cue for the first pass of a batch.
    PassCue,
    /// Revert the most recent [`Transition::CommitMovement`].
    Undo,
}

#[derive(Clone, Debug)]
pub(crate) struct CommitRecord {
    annotation: AnnotationId,
    mover: Option<(EntityId, Point)>,
    ball: Option<(EntityId, Point)>,
}

impl DiagramView for Diagram {
    fn board(&self) -> Canvas {
        self.board
    }

    fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    fn snapshot(&self) -> Diagram {
        let mut out = self.clone();
        out.history.clear();
        out.pass_cues = 0;
        out
    }
}

impl DiagramState for Diagram {
    fn dispatch(&mut self, transition: Transition) -> ChalkboardResult<()> {
        match transition {
            Transition::MoveBall { to } => {
                if let Some(ball) = self.entities.iter_mut().find(|e| e.is_ball()) {
                    ball.position = to;
                }
            }
            Transition::CommitMovement(commit) => self.apply_commit(commit)?,
            Transition::ClearGhosts { entity } => self.ghosts.retain(|g| g.entity != entity),
            Transition::ClearAllGhosts => self.ghosts.clear(),
            Transition::MarkGhostFade { at_ms } => {
                for g in self.ghosts.iter_mut().filter(|g| g.fade_start_ms.is_none()) {
                    g.fade_start_ms = Some(at_ms);
                }
            }
            Transition::PassCue => self.pass_cues += 1,
            Transition::Undo => self.undo_commit()?,
        }
        Ok(())
    }
}

impl Diagram {
    fn entity_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| &e.id == id)
    }

    fn apply_commit(&mut self, commit: MovementCommit) -> ChalkboardResult<()> {
        let mover_before = self.entity_position(&commit.entity).ok_or_else(|| {
            ChalkboardError::choreography(format!(
                "commit for unknown entity '{}'",
                commit.entity
            ))
        })?;

        let mut record = CommitRecord {
            annotation: commit.annotation.clone(),
            mover: None,
            ball: None,
        };

        if commit.kind.moves_ball()
            && let Some(ball) = self.entities.iter_mut().find(|e| e.is_ball())
        {
            record.ball = Some((ball.id.clone(), ball.position));
            ball.position = commit.to;
        }

        let mover_after = if commit.kind.moves_mover() {
            record.mover = Some((commit.entity.clone(), mover_before));
            if let Some(mover) = self.entity_mut(&commit.entity) {
                mover.position = commit.to;
            }
            commit.to
        } else {
            mover_before
        };

        self.ghosts.push(Ghost {
            entity: commit.entity,
            annotation: commit.annotation,
            origin: commit.from,
            position: mover_after,
            fade_start_ms: None,
        });
        self.history.push(record);
        Ok(())
    }

    fn undo_commit(&mut self) -> ChalkboardResult<()> {
        let record = self
            .history
            .pop()
            .ok_or_else(|| ChalkboardError::choreography("undo with empty history"))?;

        if let Some((id, pos)) = record.mover
            && let Some(e) = self.entity_mut(&id)
        {
            e.position = pos;
        }
        if let Some((id, pos)) = record.ball
            && let Some(e) = self.entity_mut(&id)
        {
            e.position = pos;
        }
        if let Some(idx) = self
            .ghosts
            .iter()
            .rposition(|g| g.annotation == record.annotation)
        {
            self.ghosts.remove(idx);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/diagram/state.rs"]
mod tests;
