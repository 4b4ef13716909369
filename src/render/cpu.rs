use kurbo::{Affine, BezPath, Circle, PathEl, Rect, Shape, Stroke, StrokeOpts};

use crate::config::RenderConfig;
use crate::diagram::model::{AnnotationKind, EntityKind, Team};
use crate::foundation::core::{Point, Rgba8};
use crate::foundation::error::{ChalkboardError, ChalkboardResult};
use crate::render::scene::{FrameRGBA, SceneAnnotation, SceneRenderer, SceneSnapshot};

const LINE_WIDTH: f64 = 3.0;
const TOLERANCE: f64 = 0.1;

/// CPU rasterizer for scene snapshots.
///
/// The board is scaled uniformly to fit the output size and centered. Output is premultiplied
/// RGBA8.
pub struct CpuRenderer {
    width: u16,
    height: u16,
    style: RenderConfig,
    pixmap: vello_cpu::Pixmap,
}

impl CpuRenderer {
    pub fn new(width: u32, height: u32, style: RenderConfig) -> ChalkboardResult<Self> {
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| ChalkboardError::export("frame width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| ChalkboardError::export("frame height exceeds u16"))?;
        if width_u16 == 0 || height_u16 == 0 {
            return Err(ChalkboardError::validation(
                "frame width/height must be non-zero",
            ));
        }
        Ok(Self {
            width: width_u16,
            height: height_u16,
            style,
            pixmap: vello_cpu::Pixmap::new(width_u16, height_u16),
        })
    }

    fn board_transform(&self, scene: &SceneSnapshot) -> Affine {
        let bw = f64::from(scene.board.width);
        let bh = f64::from(scene.board.height);
        let fw = f64::from(self.width);
        let fh = f64::from(self.height);
        let s = (fw / bw).min(fh / bh);
        Affine::translate(((fw - bw * s) / 2.0, (fh - bh * s) / 2.0)) * Affine::scale(s)
    }

    fn team_color(&self, kind: EntityKind) -> Rgba8 {
        match kind {
            EntityKind::Player { team: Team::Home } => self.style.home_rgba,
            EntityKind::Player { team: Team::Away } => self.style.away_rgba,
            EntityKind::Ball => self.style.ball_rgba,
            EntityKind::Cone => Rgba8::new(255, 140, 0, 255),
        }
    }

    fn radius(&self, kind: EntityKind) -> f64 {
        match kind {
            EntityKind::Ball => self.style.ball_radius,
            EntityKind::Cone => self.style.entity_radius * 0.6,
            EntityKind::Player { .. } => self.style.entity_radius,
        }
    }
}

impl SceneRenderer for CpuRenderer {
    fn render(&mut self, scene: &SceneSnapshot) -> ChalkboardResult<FrameRGBA> {
        scene.board.validate()?;

        let mut ctx = vello_cpu::RenderContext::new(self.width, self.height);

        let bg = self.style.background_rgba;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));

        ctx.set_transform(affine_to_cpu(self.board_transform(scene)));

        for ann in &scene.annotations {
            draw_annotation(&mut ctx, ann, self.style.line_rgba);
        }

        for g in &scene.ghosts {
            let circle = Circle::new(g.position, self.radius(g.kind)).to_path(TOLERANCE);
            fill(&mut ctx, &circle, self.team_color(g.kind), (g.alpha * 0.5) as f32);
        }

        // Ball last so it sits on top of the player carrying it.
        let (balls, others): (Vec<_>, Vec<_>) = scene
            .entities
            .iter()
            .partition(|e| matches!(e.kind, EntityKind::Ball));
        for e in others.into_iter().chain(balls) {
            let circle = Circle::new(e.position, self.radius(e.kind)).to_path(TOLERANCE);
            fill(&mut ctx, &circle, self.team_color(e.kind), 1.0);
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut self.pixmap);

        Ok(FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn draw_annotation(ctx: &mut vello_cpu::RenderContext, ann: &SceneAnnotation, color: Rgba8) {
    if ann.kind == AnnotationKind::Zone {
        let zone = Rect::from_points(ann.start, ann.end).to_path(TOLERANCE);
        fill(ctx, &zone, color, 0.25);
        return;
    }

    let mut path = BezPath::new();
    path.move_to(ann.start);
    match ann.control {
        Some(c) => path.quad_to(c, ann.end),
        None => path.line_to(ann.end),
    }

    let stroke = match ann.kind {
        AnnotationKind::PassingLine => Stroke::new(LINE_WIDTH).with_dashes(0.0, [10.0, 6.0]),
        AnnotationKind::DribbleLine => Stroke::new(LINE_WIDTH).with_dashes(0.0, [3.0, 4.0]),
        _ => Stroke::new(LINE_WIDTH),
    };
    let outline = kurbo::stroke(&path, &stroke, &StrokeOpts::default(), TOLERANCE);
    fill(ctx, &outline, color, 0.9);

    let tip = Circle::new(ann.end, LINE_WIDTH * 1.5).to_path(TOLERANCE);
    fill(ctx, &tip, color, 0.9);
}

fn fill(ctx: &mut vello_cpu::RenderContext, path: &BezPath, color: Rgba8, opacity: f32) {
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
    }
    ctx.fill_path(&bezpath_to_cpu(path));
    if opacity < 1.0 {
        ctx.pop_layer();
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
