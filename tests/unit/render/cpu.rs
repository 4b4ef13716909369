use super::*;
use crate::config::EngineConfig;
use crate::fixtures::two_pass_diagram;
use crate::playback::animator::AnimatedPositions;

fn pixel(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * frame.width + x) * 4) as usize;
    [
        frame.data[i],
        frame.data[i + 1],
        frame.data[i + 2],
        frame.data[i + 3],
    ]
}

fn scene() -> SceneSnapshot {
    let d = two_pass_diagram();
    SceneSnapshot::capture(&d, &AnimatedPositions::default(), 0.0, &EngineConfig::default())
}

#[test]
fn renders_background_and_players_at_scale() {
    let mut r = CpuRenderer::new(210, 136, RenderConfig::default()).unwrap();
    let frame = r.render(&scene()).unwrap();
    assert_eq!((frame.width, frame.height), (210, 136));
    assert_eq!(frame.data.len(), 210 * 136 * 4);
    assert!(frame.premultiplied);

    assert_eq!(pixel(&frame, 0, 0), [38, 112, 58, 255]);
    // Player D sits at (200, 500) on the board.
    assert_eq!(pixel(&frame, 40, 100), [214, 48, 49, 255]);
}

#[test]
fn rendering_is_deterministic() {
    let mut r = CpuRenderer::new(64, 42, RenderConfig::default()).unwrap();
    let a = r.render(&scene()).unwrap();
    let b = r.render(&scene()).unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn rejects_unrepresentable_sizes() {
    assert!(CpuRenderer::new(0, 10, RenderConfig::default()).is_err());
    assert!(CpuRenderer::new(70_000, 10, RenderConfig::default()).is_err());
}
