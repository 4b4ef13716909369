use super::*;
use crate::fixtures::{eid, pt, two_pass_diagram};

fn kf(entries: &[(&str, Point)], transition_ms: f64) -> Keyframe {
    Keyframe::new(
        entries.iter().map(|(id, p)| (eid(id), *p)).collect(),
        transition_ms,
    )
}

fn three_frames() -> Sequence {
    Sequence {
        name: "overlap".to_owned(),
        keyframes: vec![
            kf(&[("A", pt(0.0, 0.0)), ("B", pt(100.0, 0.0))], 999.0),
            kf(&[("A", pt(100.0, 0.0))], 1000.0),
            kf(&[("A", pt(100.0, 100.0)), ("B", pt(0.0, 0.0))], 500.0),
        ],
        speed: 1.0,
    }
}

#[test]
fn total_ignores_the_first_transition_and_divides_by_speed() {
    let mut s = three_frames();
    assert_eq!(s.total_ms(), 1500.0);
    s.speed = 2.0;
    assert_eq!(s.total_ms(), 750.0);
}

#[test]
fn sample_interpolates_and_holds_missing_entities() {
    let s = three_frames();
    let at = s.sample_at(500.0);
    assert_eq!(at[&eid("A")], pt(50.0, 0.0));
    assert_eq!(at[&eid("B")], pt(100.0, 0.0));

    let at = s.sample_at(1250.0);
    assert_eq!(at[&eid("A")], pt(100.0, 50.0));
    assert_eq!(at[&eid("B")], pt(50.0, 0.0));
}

#[test]
fn sample_clamps_to_both_ends() {
    let s = three_frames();
    assert_eq!(s.sample_at(-10.0)[&eid("A")], pt(0.0, 0.0));
    let end = s.sample_at(99_999.0);
    assert_eq!(end[&eid("A")], pt(100.0, 100.0));
    assert_eq!(end[&eid("B")], pt(0.0, 0.0));
    assert!(Sequence::new("empty").sample_at(10.0).is_empty());
}

#[test]
fn speed_compresses_sampling() {
    let mut s = three_frames();
    s.speed = 2.0;
    assert_eq!(s.sample_at(250.0)[&eid("A")], pt(50.0, 0.0));
}

#[test]
fn eased_transition_uses_its_curve() {
    let mut s = three_frames();
    s.keyframes[1].ease = Ease::InQuad;
    assert_eq!(s.sample_at(500.0)[&eid("A")], pt(25.0, 0.0));
}

#[test]
fn json_round_trip_is_exact() {
    let mut s = three_frames();
    s.keyframes[0].positions.insert(eid("C"), pt(0.1 + 0.2, 1.0 / 3.0));
    s.speed = 1.25;
    let json = s.to_json().unwrap();
    let back = Sequence::from_json(&json).unwrap();
    assert_eq!(back, s);
}

#[test]
fn invalid_documents_are_rejected() {
    assert!(matches!(
        Sequence::from_json("{not json").unwrap_err(),
        ChalkboardError::Serde(_)
    ));
    let zero_speed = r#"{"name":"x","keyframes":[],"speed":0}"#;
    assert!(matches!(
        Sequence::from_json(zero_speed).unwrap_err(),
        ChalkboardError::Validation(_)
    ));
    let negative = r#"{"name":"x","keyframes":[{"positions":{},"transition_ms":-1}]}"#;
    assert!(Sequence::from_json(negative).is_err());
}

#[test]
fn defaults_fill_in_missing_fields() {
    let s = Sequence::from_json(r#"{"name":"x","keyframes":[{"positions":{"A":{"x":1,"y":2}}}]}"#)
        .unwrap();
    assert_eq!(s.speed, 1.0);
    assert_eq!(s.keyframes[0].transition_ms, 1000.0);
    assert_eq!(s.keyframes[0].ease, Ease::Linear);
    assert_eq!(s.keyframes[0].positions[&eid("A")], pt(1.0, 2.0));
}

#[test]
fn editor_captures_and_reorders() {
    let d = two_pass_diagram();
    let mut ed = SequenceEditor::new("drill");
    assert_eq!(ed.capture(&d, 0.0).unwrap(), 0);
    assert_eq!(ed.capture(&d, 800.0).unwrap(), 1);
    assert_eq!(ed.sequence().keyframes[0].positions.len(), d.entities.len());
    assert_eq!(ed.sequence().keyframes[0].positions[&eid("D")], pt(200.0, 500.0));

    ed.insert(1, kf(&[("A", pt(1.0, 1.0))], 100.0)).unwrap();
    ed.move_keyframe(1, 2).unwrap();
    assert_eq!(ed.sequence().keyframes[2].transition_ms, 100.0);
    assert_eq!(ed.remove(2).unwrap().transition_ms, 100.0);

    assert!(ed.remove(5).is_err());
    assert!(ed.move_keyframe(0, 9).is_err());
    assert!(ed.set_speed(0.0).is_err());
    assert!(ed.set_transition(0, f64::NAN).is_err());
    ed.set_transition(1, 400.0).unwrap();
    assert_eq!(ed.sequence().total_ms(), 400.0);
}

#[test]
fn failed_load_keeps_prior_sequence() {
    let mut ed = SequenceEditor::new("drill");
    ed.insert(0, kf(&[("A", pt(1.0, 1.0))], 0.0)).unwrap();
    let before = ed.sequence().clone();

    assert!(!ed.try_load("{\"name\": 3}"));
    assert_eq!(ed.sequence(), &before);

    let other = three_frames().to_json().unwrap();
    assert!(ed.try_load(&other));
    assert_eq!(ed.sequence(), &three_frames());
    assert_eq!(ed.save_json().unwrap(), other);
}
