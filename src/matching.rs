use std::collections::HashMap;

use crate::error::Result;
use crate::pose::{Pose, PoseDistance};

/// Vote tally entry: number of votes and accumulated distance.
#[derive(Debug, Default, Clone, Copy)]
struct Vote {
    count: usize,
    distance: f64,
}

/// Keep the `k` closest `(index, distance)` pairs, ascending by distance.
///
/// A new pair goes before the first strictly farther entry, so equal
/// distances keep scan order.
fn nearest_k(
    query: &Pose,
    candidates: &[Pose],
    k: usize,
    metric: &PoseDistance,
) -> Result<Vec<(usize, f64)>> {
    let mut nbors: Vec<(usize, f64)> = Vec::with_capacity(k + 1);
    for (i, candidate) in candidates.iter().enumerate() {
        let d = metric.between(query, candidate)?;
        let j = nbors
            .iter()
            .position(|&(_, nd)| nd > d)
            .unwrap_or(nbors.len());
        if j < nbors.len() || nbors.len() < k {
            nbors.insert(j, (i, d));
            if nbors.len() > k {
                nbors.pop();
            }
        }
    }
    Ok(nbors)
}

/// Pick the candidate that best matches `query`, or `None` if there is none.
///
/// The `k` nearest candidates each cast a vote for their own index; the
/// most votes win and ties go to the smaller accumulated distance. Since
/// every index is unique each shortlisted candidate holds exactly one vote,
/// so the result is always the closest candidate regardless of `k`.
pub fn select_best_match(
    query: &Pose,
    candidates: &[Pose],
    k: usize,
    metric: &PoseDistance,
) -> Result<Option<usize>> {
    let nbors = nearest_k(query, candidates, k, metric)?;

    let mut votes: HashMap<usize, Vote> = HashMap::with_capacity(nbors.len());
    let mut winner: Option<usize> = None;
    let mut best = Vote::default();

    for (idx, d) in nbors {
        let vote = votes.entry(idx).or_default();
        vote.count += 1;
        vote.distance += d;

        if vote.count > best.count || (vote.count == best.count && vote.distance < best.distance) {
            winner = Some(idx);
            best = *vote;
        }
    }

    Ok(winner)
}

/// Plain nearest-neighbour search; the first of equally close candidates wins.
pub fn nearest_candidate(
    query: &Pose,
    candidates: &[Pose],
    metric: &PoseDistance,
) -> Result<Option<usize>> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let d = metric.between(query, candidate)?;
        match best {
            Some((_, bd)) if bd <= d => {}
            _ => best = Some((i, d)),
        }
    }
    Ok(best.map(|(i, _)| i))
}
