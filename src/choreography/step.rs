use std::collections::BTreeSet;

use crate::config::StepConfig;
use crate::diagram::model::Annotation;

/// Infer one step per annotation, index-aligned with the input.
///
/// Ordering edges `j -> i` come from two rules:
/// - causal chain: `j`'s target entity is `i`'s mover,
/// - same mover: `j` precedes `i` in input order and both move the same entity.
///
/// Steps are longest-path layers over those edges. A cycle (a one-two between two players, for
/// instance) is broken at its earliest input index so the first-drawn movement plays first.
///
/// Returns `None` when no inference is possible: any annotation carries an author-assigned step,
/// both rules are disabled, or no edge exists at all. Callers then fall back to each
/// annotation's own step, defaulting to 1.
pub fn resolve_steps(annotations: &[&Annotation], config: &StepConfig) -> Option<Vec<u32>> {
    if !config.infer_chains && !config.sequence_same_mover {
        return None;
    }
    if annotations.iter().any(|a| a.step.is_some()) {
        return None;
    }

    let n = annotations.len();
    let mut preds = vec![Vec::<usize>::new(); n];
    let mut succs = vec![Vec::<usize>::new(); n];
    let mut edges = 0usize;

    for (i, ai) in annotations.iter().enumerate() {
        for (j, aj) in annotations.iter().enumerate() {
            if i == j {
                continue;
            }
            let chain = config.infer_chains && aj.target() == Some(&ai.mover);
            let same_mover = config.sequence_same_mover && j < i && aj.mover == ai.mover;
            if chain || same_mover {
                preds[i].push(j);
                succs[j].push(i);
                edges += 1;
            }
        }
    }

    if edges == 0 {
        return None;
    }

    let mut indeg: Vec<usize> = preds.iter().map(Vec::len).collect();
    let mut done = vec![false; n];
    let mut steps = vec![1u32; n];
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indeg[i] == 0).collect();

    for _ in 0..n {
        let i = match ready.pop_first() {
            Some(i) => i,
            // Cycle: every remaining node still waits on another one.
            None => match (0..n).find(|&i| !done[i]) {
                Some(i) => i,
                None => break,
            },
        };

        steps[i] = 1 + preds[i]
            .iter()
            .filter(|&&p| done[p])
            .map(|&p| steps[p])
            .max()
            .unwrap_or(0);
        done[i] = true;

        for &s in &succs[i] {
            if done[s] {
                continue;
            }
            indeg[s] = indeg[s].saturating_sub(1);
            if indeg[s] == 0 {
                ready.insert(s);
            }
        }
    }

    Some(steps)
}

/// Inferred steps when available, otherwise author-assigned steps (default 1).
pub fn effective_steps(annotations: &[&Annotation], config: &StepConfig) -> Vec<u32> {
    resolve_steps(annotations, config)
        .unwrap_or_else(|| annotations.iter().map(|a| a.step.unwrap_or(1)).collect())
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/step.rs"]
mod tests;
