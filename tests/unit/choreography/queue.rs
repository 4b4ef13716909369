use super::*;
use crate::diagram::model::{Ghost, MovementKind};
use crate::fixtures::{aid, diagram_with, eid, pt, run, two_pass_diagram};

fn ids(q: &ChoreographyQueue) -> Vec<&str> {
    q.items.iter().map(|i| i.annotation.as_str()).collect()
}

fn ghost(entity: &str, ann: &str, origin: Point, position: Point) -> Ghost {
    Ghost {
        entity: eid(entity),
        annotation: aid(ann),
        origin,
        position,
        fade_start_ms: None,
    }
}

#[test]
fn unscoped_sorts_by_step_with_stable_ties() {
    let d = two_pass_diagram();
    let q = build_unscoped(&d, &EngineConfig::default()).unwrap();
    assert_eq!(ids(&q), vec!["P1", "R1", "P2"]);
    assert_eq!(
        q.items.iter().map(|i| i.step).collect::<Vec<_>>(),
        vec![1, 1, 2]
    );
    assert_eq!(q.items[0].kind, MovementKind::Pass);
    assert_eq!(q.items[0].target, Some(eid("B")));
    assert!(!q.replay);
}

#[test]
fn one_touch_pass_gets_short_duration() {
    let d = two_pass_diagram();
    let cfg = EngineConfig::default();
    let q = build_unscoped(&d, &cfg).unwrap();
    let p2 = q.items.iter().find(|i| i.annotation == aid("P2")).unwrap();
    assert!(p2.one_touch);
    assert_eq!(p2.duration_ms, cfg.timing.one_touch_ms);
    let p1 = q.items.iter().find(|i| i.annotation == aid("P1")).unwrap();
    assert_eq!(p1.duration_ms, cfg.timing.default_ms);
}

#[test]
fn ghosted_annotations_are_skipped_unscoped() {
    let mut d = two_pass_diagram();
    d.ghosts.push(ghost("D", "R1", pt(200.0, 500.0), pt(400.0, 500.0)));
    let q = build_unscoped(&d, &EngineConfig::default()).unwrap();
    assert_eq!(ids(&q), vec!["P1", "P2"]);
}

#[test]
fn empty_candidate_set_yields_none() {
    let d = diagram_with(vec![]);
    assert!(build_unscoped(&d, &EngineConfig::default()).is_none());
    assert!(
        build_scoped(&d, &Selection::Entity(eid("A")), &EngineConfig::default()).is_none()
    );
}

#[test]
fn scoped_follows_the_causal_chain_only() {
    let d = two_pass_diagram();
    let q = build_scoped(&d, &Selection::Entity(eid("A")), &EngineConfig::default()).unwrap();
    assert_eq!(ids(&q), vec!["P1", "P2"]);

    let q = build_scoped(&d, &Selection::Entity(eid("B")), &EngineConfig::default()).unwrap();
    assert_eq!(ids(&q), vec!["P2"]);
}

#[test]
fn scoped_selection_by_annotation_uses_its_mover() {
    let d = two_pass_diagram();
    let q = build_scoped(
        &d,
        &Selection::Annotation(aid("R1")),
        &EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(ids(&q), vec!["R1"]);
    assert!(build_scoped(&d, &Selection::Annotation(aid("nope")), &EngineConfig::default()).is_none());
}

#[test]
fn fully_ghosted_entity_replays_its_whole_chain() {
    let mut d = two_pass_diagram();
    d.ghosts.push(ghost("A", "P1", pt(90.0, 290.0), pt(90.0, 290.0)));
    d.ghosts.push(ghost("B", "P2", pt(310.0, 210.0), pt(310.0, 210.0)));

    let q = build_scoped(&d, &Selection::Entity(eid("A")), &EngineConfig::default()).unwrap();
    assert!(q.replay);
    assert_eq!(ids(&q), vec!["P1", "P2"]);
    assert_eq!(q.overrides.get(&eid("A")), Some(&pt(90.0, 290.0)));
    assert_eq!(q.overrides.get(&eid("B")), Some(&pt(310.0, 210.0)));
}

#[test]
fn partially_ghosted_entity_is_not_a_replay() {
    let mut d = diagram_with(vec![
        run("D1", "D", pt(200.0, 500.0), pt(300.0, 500.0), None),
        run("D2", "D", pt(300.0, 500.0), pt(400.0, 500.0), None),
    ]);
    d.ghosts.push(ghost("D", "D1", pt(200.0, 500.0), pt(300.0, 500.0)));
    let q = build_scoped(&d, &Selection::Entity(eid("D")), &EngineConfig::default()).unwrap();
    assert!(!q.replay);
    assert_eq!(ids(&q), vec!["D2"]);
    assert!(q.overrides.is_empty());
}

#[test]
fn duplicate_mover_at_same_step_splits_batches() {
    let d = diagram_with(vec![
        run("D1", "D", pt(0.0, 0.0), pt(1.0, 0.0), Some(1)),
        run("D2", "D", pt(1.0, 0.0), pt(2.0, 0.0), Some(1)),
        run("C1", "C", pt(0.0, 0.0), pt(1.0, 0.0), Some(1)),
    ]);
    let q = build_unscoped(&d, &EngineConfig::default()).unwrap();
    let batches = q.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[1].len(), 2);
    assert!(batches.iter().all(|b| b.iter().all(|i| i.step == 1)));
}

#[test]
fn total_duration_sums_batch_maxima() {
    let d = two_pass_diagram();
    let cfg = EngineConfig::default();
    let q = build_unscoped(&d, &cfg).unwrap();
    assert_eq!(q.batches().len(), 2);
    assert_eq!(
        q.total_duration_ms(),
        cfg.timing.default_ms + cfg.timing.one_touch_ms
    );
}
