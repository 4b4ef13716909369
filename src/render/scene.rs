use std::collections::BTreeMap;

use crate::choreography::resolve::control_point;
use crate::config::EngineConfig;
use crate::diagram::model::{AnnotationKind, EndPoint, EntityKind};
use crate::diagram::state::DiagramView;
use crate::foundation::core::{AnnotationId, Canvas, EntityId, Point};
use crate::foundation::error::ChalkboardResult;
use crate::foundation::math::Fnv1a64;
use crate::playback::animator::AnimatedPositions;

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneAnnotation {
    pub id: AnnotationId,
    pub kind: AnnotationKind,
    pub start: Point,
    pub end: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<Point>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneGhost {
    pub entity: EntityId,
    pub kind: EntityKind,
    pub position: Point,
    pub alpha: f64,
}

/// Everything a renderer needs for one frame, in painter's order.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneSnapshot {
    pub time_ms: f64,
    pub board: Canvas,
    /// Annotations not yet played out, plus static zones.
    pub annotations: Vec<SceneAnnotation>,
    pub ghosts: Vec<SceneGhost>,
    /// Every entity, ball included, at its displayed position.
    pub entities: Vec<SceneEntity>,
}

impl SceneSnapshot {
    /// Live view: committed diagram state overlaid with in-flight movement.
    pub fn capture(
        view: &dyn DiagramView,
        animated: &AnimatedPositions,
        now_ms: f64,
        config: &EngineConfig,
    ) -> Self {
        let entities: Vec<SceneEntity> = view
            .entities()
            .iter()
            .map(|e| {
                let position = if e.is_ball() {
                    animated.ball.unwrap_or(e.position)
                } else {
                    animated.movers.get(&e.id).copied().unwrap_or(e.position)
                };
                SceneEntity {
                    id: e.id.clone(),
                    kind: e.kind,
                    position,
                    label: e.label.clone(),
                }
            })
            .collect();

        let shown = |id: &EntityId| {
            entities
                .iter()
                .find(|e| &e.id == id)
                .map(|e| e.position)
                .unwrap_or(Point::ORIGIN)
        };

        let annotations = view
            .annotations()
            .iter()
            .filter(|a| a.kind == AnnotationKind::Zone || !view.is_ghosted(&a.id))
            .map(|a| {
                let end = match &a.end {
                    EndPoint::At(p) => *p,
                    EndPoint::Entity(id) => shown(id),
                };
                SceneAnnotation {
                    id: a.id.clone(),
                    kind: a.kind,
                    start: a.start,
                    end,
                    control: a
                        .curve
                        .map(|dir| control_point(a.start, end, dir, config.curve.bulge)),
                }
            })
            .collect();

        let ghosts = view
            .ghosts()
            .iter()
            .filter_map(|g| {
                let kind = view.entity(&g.entity)?.kind;
                Some(SceneGhost {
                    entity: g.entity.clone(),
                    kind,
                    position: g.position,
                    alpha: g.alpha_at(now_ms, config.ghosts.fade_ms, config.ghosts.min_alpha),
                })
            })
            .collect();

        Self {
            time_ms: now_ms,
            board: view.board(),
            annotations,
            ghosts,
            entities,
        }
    }

    /// Keyframe view: entities placed from a sampled position map, no annotations or ghosts.
    pub fn with_positions(
        view: &dyn DiagramView,
        positions: &BTreeMap<EntityId, Point>,
        now_ms: f64,
    ) -> Self {
        let entities = view
            .entities()
            .iter()
            .map(|e| SceneEntity {
                id: e.id.clone(),
                kind: e.kind,
                position: positions.get(&e.id).copied().unwrap_or(e.position),
                label: e.label.clone(),
            })
            .collect();
        Self {
            time_ms: now_ms,
            board: view.board(),
            annotations: Vec::new(),
            ghosts: Vec::new(),
            entities,
        }
    }

    pub fn entity_position(&self, id: &EntityId) -> Option<Point> {
        self.entities
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.position)
    }

    pub fn ball(&self) -> Option<Point> {
        self.entities
            .iter()
            .find(|e| matches!(e.kind, EntityKind::Ball))
            .map(|e| e.position)
    }

    pub fn fingerprint(&self) -> SceneFingerprint {
        fingerprint_scene(self)
    }
}

/// 128-bit content hash of a scene, stable across runs and platforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SceneFingerprint {
    pub hi: u64,
    pub lo: u64,
}

pub fn fingerprint_scene(scene: &SceneSnapshot) -> SceneFingerprint {
    let mut a = Fnv1a64::new_default();
    let mut b = Fnv1a64::new(0x9ae1_6a3b_2f90_404f);

    write_f64_pair(&mut a, &mut b, scene.time_ms);
    write_u64_pair(&mut a, &mut b, u64::from(scene.board.width));
    write_u64_pair(&mut a, &mut b, u64::from(scene.board.height));

    write_u64_pair(&mut a, &mut b, scene.annotations.len() as u64);
    for ann in &scene.annotations {
        write_str_pair(&mut a, &mut b, ann.id.as_str());
        write_point_pair(&mut a, &mut b, ann.start);
        write_point_pair(&mut a, &mut b, ann.end);
        match ann.control {
            Some(c) => {
                write_u8_pair(&mut a, &mut b, 1);
                write_point_pair(&mut a, &mut b, c);
            }
            None => write_u8_pair(&mut a, &mut b, 0),
        }
    }

    write_u64_pair(&mut a, &mut b, scene.ghosts.len() as u64);
    for g in &scene.ghosts {
        write_str_pair(&mut a, &mut b, g.entity.as_str());
        write_point_pair(&mut a, &mut b, g.position);
        write_f64_pair(&mut a, &mut b, g.alpha);
    }

    write_u64_pair(&mut a, &mut b, scene.entities.len() as u64);
    for e in &scene.entities {
        write_str_pair(&mut a, &mut b, e.id.as_str());
        write_point_pair(&mut a, &mut b, e.position);
    }

    SceneFingerprint {
        hi: a.finish(),
        lo: b.finish(),
    }
}

fn write_u8_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, v: u8) {
    a.write_u8(v);
    b.write_u8(v);
}

fn write_u64_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, v: u64) {
    a.write_u64(v);
    b.write_u64(v);
}

fn write_f64_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, v: f64) {
    a.write_f64(v);
    b.write_f64(v);
}

fn write_point_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, p: Point) {
    write_f64_pair(a, b, p.x);
    write_f64_pair(a, b, p.y);
}

fn write_str_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, s: &str) {
    a.write_str(s);
    b.write_str(s);
}

/// One rendered frame.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

/// Rendering collaborator: one scene in, one frame out. Shared by the live canvas and export.
pub trait SceneRenderer {
    fn render(&mut self, scene: &SceneSnapshot) -> ChalkboardResult<FrameRGBA>;
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
