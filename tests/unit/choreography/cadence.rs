use super::*;
use crate::fixtures::{dribble, pass, pt, run};

#[test]
fn consecutive_chain_passes_are_one_touch() {
    let p1 = pass("P1", "A", "B", pt(0.0, 0.0), None);
    let p2 = pass("P2", "B", "C", pt(0.0, 0.0), None);
    let flags = classify_one_touch(&[&p1, &p2], &[1, 2], &OneTouchRule::default());
    assert_eq!(flags, vec![false, true]);
}

#[test]
fn receiver_run_in_between_disqualifies() {
    let p1 = pass("P1", "A", "B", pt(0.0, 0.0), None);
    let rb = run("RB", "B", pt(0.0, 0.0), pt(5.0, 0.0), None);
    let p2 = pass("P2", "B", "C", pt(0.0, 0.0), None);
    let flags = classify_one_touch(&[&p1, &rb, &p2], &[1, 2, 2], &OneTouchRule::default());
    assert_eq!(flags, vec![false, false, false]);
}

#[test]
fn receiver_dribble_also_disqualifies_but_other_runs_do_not() {
    let p1 = pass("P1", "A", "B", pt(0.0, 0.0), None);
    let rd = run("RD", "D", pt(0.0, 0.0), pt(5.0, 0.0), None);
    let p2 = pass("P2", "B", "C", pt(0.0, 0.0), None);
    let rule = OneTouchRule::default();
    assert_eq!(
        classify_one_touch(&[&p1, &rd, &p2], &[1, 1, 2], &rule),
        vec![false, false, true]
    );

    let db = dribble("DB", "B", pt(0.0, 0.0), pt(5.0, 0.0), None);
    assert_eq!(
        classify_one_touch(&[&p1, &db, &p2], &[1, 2, 2], &rule),
        vec![false, false, false]
    );
}

#[test]
fn step_gap_and_simultaneity_are_respected() {
    let p1 = pass("P1", "A", "B", pt(0.0, 0.0), None);
    let p2 = pass("P2", "B", "C", pt(0.0, 0.0), None);
    let rule = OneTouchRule::default();
    assert_eq!(classify_one_touch(&[&p1, &p2], &[1, 3], &rule), vec![false, false]);
    assert_eq!(classify_one_touch(&[&p1, &p2], &[1, 1], &rule), vec![false, false]);

    let wide = OneTouchRule {
        max_step_gap: 2,
        ..OneTouchRule::default()
    };
    assert_eq!(classify_one_touch(&[&p1, &p2], &[1, 3], &wide), vec![false, true]);
}

#[test]
fn unrelated_passes_are_standard() {
    let p1 = pass("P1", "A", "B", pt(0.0, 0.0), None);
    let p2 = pass("P2", "C", "D", pt(0.0, 0.0), None);
    let flags = classify_one_touch(&[&p1, &p2], &[1, 2], &OneTouchRule::default());
    assert_eq!(flags, vec![false, false]);
}

#[test]
fn disabled_rule_flags_nothing() {
    let p1 = pass("P1", "A", "B", pt(0.0, 0.0), None);
    let p2 = pass("P2", "B", "C", pt(0.0, 0.0), None);
    let rule = OneTouchRule {
        enabled: false,
        ..OneTouchRule::default()
    };
    assert_eq!(classify_one_touch(&[&p1, &p2], &[1, 2], &rule), vec![false, false]);
}
