use super::*;
use crate::diagram::model::{Annotation, Diagram, Entity, Ghost};
use crate::diagram::state::DiagramView;
use crate::foundation::core::Canvas;
use crate::foundation::error::ChalkboardError;
use crate::fixtures::{aid, diagram_with, eid, pt, run, two_pass_diagram};

fn sched() -> Scheduler {
    Scheduler::new(EngineConfig::default())
}

fn pending_ids(s: &Scheduler) -> Vec<String> {
    s.pending()
        .iter()
        .map(|q| q.annotation.as_str().to_owned())
        .collect()
}

fn live_ids(s: &Scheduler) -> Vec<String> {
    s.live_instances()
        .iter()
        .map(|i| i.annotation.as_str().to_owned())
        .collect()
}

#[test]
fn play_all_runs_batches_back_to_back_and_fades_on_finish() {
    let mut d = two_pass_diagram();
    let mut s = sched();

    assert!(s.play_all(&mut d, 0.0).unwrap());
    assert_eq!(s.mode(), PlaybackMode::AutoPlaying { replay: false });
    assert_eq!(live_ids(&s), vec!["P1", "R1"]);
    assert_eq!(pending_ids(&s), vec!["P2"]);
    assert_eq!(d.pass_cue_count(), 1);

    s.tick(&mut d, 999.0).unwrap();
    assert_eq!(live_ids(&s), vec!["P1", "R1"]);

    s.tick(&mut d, 1000.0).unwrap();
    assert_eq!(live_ids(&s), vec!["P2"]);
    assert_eq!(s.live_instances()[0].start, pt(300.0, 200.0));
    assert_eq!(s.live_instances()[0].started_at_ms, 1000.0);
    assert_eq!(d.entity_position(&eid("D")), Some(pt(400.0, 500.0)));
    assert_eq!(d.pass_cue_count(), 2);

    s.tick(&mut d, 1500.0).unwrap();
    assert!(s.is_idle());
    assert!(!s.is_animating());
    assert_eq!(d.ball().map(|b| b.position), Some(pt(500.0, 300.0)));
    assert_eq!(d.ghosts().len(), 3);
    assert!(d.ghosts().iter().all(|g| g.fade_start_ms == Some(1500.0)));
}

#[test]
fn late_tick_catches_up_through_several_batches() {
    let mut d = two_pass_diagram();
    let mut s = sched();
    s.play_all(&mut d, 0.0).unwrap();
    s.tick(&mut d, 10_000.0).unwrap();
    assert!(s.is_idle());
    assert_eq!(d.undo_depth(), 3);
    assert!(d.ghosts().iter().all(|g| g.fade_start_ms == Some(1500.0)));
}

#[test]
fn empty_diagram_is_a_silent_no_op() {
    let mut d = diagram_with(vec![]);
    let mut s = sched();
    assert!(!s.play_all(&mut d, 0.0).unwrap());
    assert!(!s.step_forward(&mut d, None, 0.0).unwrap());
    assert!(!s.step_back(&mut d).unwrap());
    s.tick(&mut d, 100.0).unwrap();
    assert!(s.is_idle());
}

#[test]
fn stepping_waits_for_explicit_requests() {
    let mut d = two_pass_diagram();
    let mut s = sched();
    assert!(s.step_forward(&mut d, None, 0.0).unwrap());
    assert_eq!(s.mode(), PlaybackMode::Stepping);

    s.tick(&mut d, 5000.0).unwrap();
    assert!(!s.is_animating());
    assert_eq!(pending_ids(&s), vec!["P2"]);
    assert_eq!(s.mode(), PlaybackMode::Stepping);

    assert!(s.step_forward(&mut d, None, 5000.0).unwrap());
    assert_eq!(live_ids(&s), vec!["P2"]);
    s.tick(&mut d, 6000.0).unwrap();
    assert_eq!(s.mode(), PlaybackMode::Stepping);
    assert!(!s.step_forward(&mut d, None, 6000.0).unwrap());
}

#[test]
fn step_forward_then_back_restores_queue_and_positions() {
    let mut d = two_pass_diagram();
    let original = d.snapshot();
    let mut s = sched();

    s.step_forward(&mut d, None, 0.0).unwrap();
    let full: Vec<String> = {
        let mut v: Vec<String> = s.history().flatten().map(|q| q.annotation.as_str().to_owned()).collect();
        v.extend(pending_ids(&s));
        v
    };
    assert_eq!(full, vec!["P1", "R1", "P2"]);

    // Second step force-completes batch one mid-flight.
    s.step_forward(&mut d, None, 200.0).unwrap();
    assert_eq!(d.entity_position(&eid("D")), Some(pt(400.0, 500.0)));
    assert!(pending_ids(&s).is_empty());

    assert!(s.step_back(&mut d).unwrap());
    assert_eq!(pending_ids(&s), vec!["P2"]);
    assert_eq!(live_ids(&s), Vec::<String>::new());
    assert_eq!(s.just_finished().len(), 2);

    assert!(s.step_back(&mut d).unwrap());
    assert_eq!(pending_ids(&s), vec!["P1", "R1", "P2"]);
    assert!(s.just_finished().is_empty());
    assert_eq!(d.undo_depth(), 0);
    assert_eq!(d.entity_position(&eid("D")), original.entity_position(&eid("D")));
    assert!(d.ghosts().is_empty());

    assert!(!s.step_back(&mut d).unwrap());
    assert_eq!(s.mode(), PlaybackMode::Stepping);
}

#[test]
fn stepping_from_auto_play_switches_mode() {
    let mut d = two_pass_diagram();
    let mut s = sched();
    s.play_all(&mut d, 0.0).unwrap();
    s.step_forward(&mut d, None, 100.0).unwrap();
    assert_eq!(s.mode(), PlaybackMode::Stepping);
    assert_eq!(live_ids(&s), vec!["P2"]);
}

#[test]
fn cancel_drops_in_flight_batch_uncommitted() {
    let mut d = two_pass_diagram();
    let mut s = sched();
    s.play_all(&mut d, 0.0).unwrap();
    s.cancel(&mut d, 300.0).unwrap();
    assert!(s.is_idle());
    assert!(s.live_instances().is_empty());
    assert!(s.pending().is_empty());
    assert_eq!(d.entity_position(&eid("D")), Some(pt(200.0, 500.0)));
    assert_eq!(d.undo_depth(), 0);

    // Idle cancel is a no-op.
    s.cancel(&mut d, 400.0).unwrap();
}

#[test]
fn cancelled_stepping_clears_its_ghosts() {
    let mut d = two_pass_diagram();
    let mut s = sched();
    s.step_forward(&mut d, None, 0.0).unwrap();
    s.step_forward(&mut d, None, 10.0).unwrap();
    assert!(!d.ghosts().is_empty());
    s.cancel(&mut d, 20.0).unwrap();
    assert!(d.ghosts().is_empty());
}

#[test]
fn same_step_duplicates_for_one_mover_run_in_separate_batches() {
    let mut d = diagram_with(vec![
        run("R1", "D", pt(200.0, 500.0), pt(300.0, 500.0), Some(1)),
        run("R2", "D", pt(300.0, 500.0), pt(300.0, 400.0), Some(1)),
    ]);
    let mut s = sched();
    s.play_all(&mut d, 0.0).unwrap();
    assert_eq!(live_ids(&s), vec!["R1"]);
    s.tick(&mut d, 1000.0).unwrap();
    assert_eq!(live_ids(&s), vec!["R2"]);
    assert_eq!(s.live_instances()[0].start, pt(300.0, 500.0));
}

#[test]
fn replay_restarts_the_chain_from_ghost_origins() {
    let mut d = diagram_with(vec![
        run("R1", "D", pt(200.0, 500.0), pt(400.0, 500.0), None),
        run("R2", "D", pt(400.0, 500.0), pt(400.0, 300.0), None),
    ]);
    let mut s = sched();
    let sel = Selection::Entity(eid("D"));
    s.play_entity(&mut d, &sel, 0.0).unwrap();
    s.tick(&mut d, 5000.0).unwrap();
    assert!(s.is_idle());
    assert_eq!(d.entity_position(&eid("D")), Some(pt(400.0, 300.0)));

    assert!(s.play_entity(&mut d, &sel, 6000.0).unwrap());
    assert_eq!(s.mode(), PlaybackMode::AutoPlaying { replay: true });
    assert_eq!(live_ids(&s), vec!["R1"]);
    assert_eq!(s.live_instances()[0].start, pt(200.0, 500.0));
    assert!(d.ghosts().is_empty());

    s.tick(&mut d, 7000.0).unwrap();
    assert_eq!(live_ids(&s), vec!["R2"]);
    assert_eq!(s.live_instances()[0].start, pt(400.0, 500.0));
}

#[test]
fn sample_reports_interpolated_positions() {
    let mut d = two_pass_diagram();
    let mut s = sched();
    s.play_all(&mut d, 0.0).unwrap();
    let p = s.sample(500.0);
    assert_eq!(p.movers.get(&eid("D")), Some(&pt(300.0, 500.0)));
    assert_eq!(p.ball, Some(pt(200.0, 250.0)));
}

struct FailingCue(Diagram);

impl DiagramView for FailingCue {
    fn board(&self) -> Canvas {
        self.0.board()
    }
    fn entities(&self) -> &[Entity] {
        self.0.entities()
    }
    fn annotations(&self) -> &[Annotation] {
        self.0.annotations()
    }
    fn ghosts(&self) -> &[Ghost] {
        self.0.ghosts()
    }
    fn snapshot(&self) -> Diagram {
        self.0.snapshot()
    }
}

impl DiagramState for FailingCue {
    fn dispatch(&mut self, transition: Transition) -> ChalkboardResult<()> {
        if transition == Transition::PassCue {
            return Err(ChalkboardError::choreography("audio unavailable"));
        }
        self.0.dispatch(transition)
    }
}

#[test]
fn batch_that_fails_to_start_leaves_scheduler_idle() {
    let mut st = FailingCue(two_pass_diagram());
    let mut s = sched();
    assert!(s.play_all(&mut st, 0.0).is_err());
    assert!(s.is_idle());
    assert!(s.live_instances().is_empty());
    assert!(s.pending().is_empty());
    assert_eq!(s.history().count(), 0);
    assert!(!st.0.is_ghosted(&aid("P1")));
}
