use crate::config::OneTouchRule;
use crate::diagram::model::{Annotation, MovementKind};

/// Flag annotations eligible for the compressed one-touch duration.
///
/// Input must already be sorted by step, with `steps` index-aligned. A pass qualifies when the
/// nearest earlier pass feeding its mover (the earlier pass targets this pass's mover) is at a
/// strictly lower step within `max_step_gap`, and, if required, the receiver made no run or
/// dribble in between.
pub fn classify_one_touch(sorted: &[&Annotation], steps: &[u32], rule: &OneTouchRule) -> Vec<bool> {
    let mut out = vec![false; sorted.len()];
    if !rule.enabled {
        return out;
    }

    for (i, ann) in sorted.iter().enumerate() {
        if ann.movement_kind() != Some(MovementKind::Pass) {
            continue;
        }

        let feeder = (0..i).rev().find(|&j| {
            sorted[j].movement_kind() == Some(MovementKind::Pass)
                && sorted[j].target() == Some(&ann.mover)
        });
        let Some(j) = feeder else {
            continue;
        };

        if steps[j] >= steps[i] || steps[i] - steps[j] > rule.max_step_gap {
            continue;
        }

        if rule.require_no_intervening_run {
            let receiver_moved = sorted[j + 1..i].iter().any(|k| {
                k.mover == ann.mover
                    && k.movement_kind().is_some_and(|m| m.moves_mover())
            });
            if receiver_moved {
                continue;
            }
        }

        out[i] = true;
    }

    out
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/cadence.rs"]
mod tests;
