use crate::config::EngineConfig;
use crate::foundation::core::{AnnotationId, Canvas, EntityId, Point};
use crate::foundation::error::{ChalkboardError, ChalkboardResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Home,
    Away,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    Player { team: Team },
    Ball,
    Cone,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Entity {
    pub fn player(id: impl Into<String>, team: Team, position: Point) -> Self {
        Self {
            id: EntityId::new(id),
            kind: EntityKind::Player { team },
            position,
            label: None,
        }
    }

    pub fn ball(id: impl Into<String>, position: Point) -> Self {
        Self {
            id: EntityId::new(id),
            kind: EntityKind::Ball,
            position,
            label: None,
        }
    }

    pub fn is_ball(&self) -> bool {
        matches!(self.kind, EntityKind::Ball)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    RunningLine,
    CurvedRun,
    PassingLine,
    DribbleLine,
    /// Static shaded area; drawn but never animated.
    Zone,
}

impl AnnotationKind {
    pub fn movement_kind(self) -> Option<MovementKind> {
        match self {
            Self::RunningLine | Self::CurvedRun => Some(MovementKind::Run),
            Self::PassingLine => Some(MovementKind::Pass),
            Self::DribbleLine => Some(MovementKind::Dribble),
            Self::Zone => None,
        }
    }

    pub fn is_animatable(self) -> bool {
        self.movement_kind().is_some()
    }
}

/// What a live movement actually displaces: runs move the mover, passes move the ball,
/// dribbles move both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Run,
    Pass,
    Dribble,
}

impl MovementKind {
    pub fn moves_mover(self) -> bool {
        matches!(self, Self::Run | Self::Dribble)
    }

    pub fn moves_ball(self) -> bool {
        matches!(self, Self::Pass | Self::Dribble)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveDirection {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndPoint {
    At(Point),
    Entity(EntityId),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub kind: AnnotationKind,
    pub mover: EntityId,
    pub start: Point,
    pub end: EndPoint,
    /// Author-assigned ordering key; `None` lets the step resolver decide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<CurveDirection>,
}

impl Annotation {
    pub fn target(&self) -> Option<&EntityId> {
        match &self.end {
            EndPoint::Entity(id) => Some(id),
            EndPoint::At(_) => None,
        }
    }

    pub fn movement_kind(&self) -> Option<MovementKind> {
        self.kind.movement_kind()
    }
}

/// Preview of an entity after a completed movement.
///
/// `position` is where the entity ends up once the movement is done; `origin` is where it was
/// before, which is what undo and replay rewind to.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ghost {
    pub entity: EntityId,
    pub annotation: AnnotationId,
    pub origin: Point,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_start_ms: Option<f64>,
}

impl Ghost {
    /// Display alpha at `now_ms`; unfaded ghosts are fully opaque.
    pub fn alpha_at(&self, now_ms: f64, fade_ms: f64, min_alpha: f64) -> f64 {
        let Some(start) = self.fade_start_ms else {
            return 1.0;
        };
        if fade_ms <= 0.0 {
            return min_alpha;
        }
        let t = ((now_ms - start) / fade_ms).clamp(0.0, 1.0);
        1.0 - (1.0 - min_alpha) * t
    }
}

/// The full diagram: entity layout, authored annotations and ghost previews.
///
/// This is also the in-memory implementation of the diagram/state collaborator (see
/// [`crate::DiagramState`]); the undo history and cue counter never leave the process.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Diagram {
    #[serde(default)]
    pub board: Canvas,
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub ghosts: Vec<Ghost>,
    #[serde(skip)]
    pub(crate) history: Vec<super::state::CommitRecord>,
    #[serde(skip)]
    pub(crate) pass_cues: u64,
}

impl Diagram {
    pub fn new(board: Canvas, entities: Vec<Entity>, annotations: Vec<Annotation>) -> Self {
        Self {
            board,
            entities,
            annotations,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ChalkboardResult<()> {
        self.board.validate()?;

        let mut seen = std::collections::BTreeSet::new();
        for e in &self.entities {
            if !seen.insert(&e.id) {
                return Err(ChalkboardError::validation(format!(
                    "duplicate entity id '{}'",
                    e.id
                )));
            }
        }

        let mut seen_ann = std::collections::BTreeSet::new();
        for a in &self.annotations {
            if !seen_ann.insert(&a.id) {
                return Err(ChalkboardError::validation(format!(
                    "duplicate annotation id '{}'",
                    a.id
                )));
            }
            if !seen.contains(&a.mover) {
                return Err(ChalkboardError::validation(format!(
                    "annotation '{}' moves unknown entity '{}'",
                    a.id, a.mover
                )));
            }
            if let Some(target) = a.target() {
                if !seen.contains(target) {
                    return Err(ChalkboardError::validation(format!(
                        "annotation '{}' targets unknown entity '{}'",
                        a.id, target
                    )));
                }
                if target == &a.mover {
                    return Err(ChalkboardError::validation(format!(
                        "annotation '{}' targets its own mover",
                        a.id
                    )));
                }
            }
            if a.step == Some(0) {
                return Err(ChalkboardError::validation(format!(
                    "annotation '{}' step must be >= 1",
                    a.id
                )));
            }
            if a.kind == AnnotationKind::CurvedRun && a.curve.is_none() {
                return Err(ChalkboardError::validation(format!(
                    "curved run '{}' needs a curve direction",
                    a.id
                )));
            }
        }
        Ok(())
    }

    /// Number of pass audio cues dispatched so far.
    pub fn pass_cue_count(&self) -> u64 {
        self.pass_cues
    }

    /// Number of undoable movement commits currently on the history stack.
    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }
}

/// On-disk diagram document: the diagram plus optional engine tuning.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct DiagramDocument {
    #[serde(flatten)]
    pub diagram: Diagram,
    #[serde(default)]
    pub config: EngineConfig,
}

impl DiagramDocument {
    pub fn from_json_str(s: &str) -> ChalkboardResult<Self> {
        let doc: Self = serde_json::from_str(s)?;
        doc.diagram.validate()?;
        doc.config.validate()?;
        Ok(doc)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/diagram/model.rs"]
mod tests;
