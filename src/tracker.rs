use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::matching::select_best_match;
use crate::pose::{Pose, PoseDistance};

/// Source of track ids. Starts at 1 and never hands out a value twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCounter {
    next: u32,
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl IdCounter {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// The id the next spawned track will receive.
    pub fn peek(&self) -> u32 {
        self.next
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// What happened to the track set during one update.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameUpdate {
    /// Tracks that matched a detection and carried over.
    pub kept: usize,
    /// Tracks removed, either unmatched or beaten in a claim conflict.
    pub died: usize,
    /// Detections that started a new track.
    pub born: usize,
    /// Claims made on a detection another track had already claimed.
    pub conflicts: usize,
}

/// Frame-to-frame pose association.
///
/// Every live track claims its nearest detection, in track order. A
/// detection claimed twice goes to the strictly closer track and the other
/// one dies; on a tie the earlier claim stands. The pass is greedy and
/// order dependent, and must stay sequential to be reproducible.
#[derive(Debug, Clone)]
pub struct PoseTracker {
    metric: PoseDistance,
    neighbours: usize,
}

impl Default for PoseTracker {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

impl PoseTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            metric: PoseDistance::from_config(config),
            neighbours: config.neighbours,
        }
    }

    pub fn metric(&self) -> &PoseDistance {
        &self.metric
    }

    /// Advance `tracks` by one frame.
    ///
    /// `tracks` must all carry ids and `detections` must all be unassigned.
    /// On return every detection carries an id, and `tracks` holds exactly
    /// the detections of this frame: survivors first in their previous
    /// order, then newborns in detection order.
    pub fn update(
        &self,
        tracks: &mut Vec<Pose>,
        detections: &mut [Pose],
        ids: &mut IdCounter,
    ) -> Result<FrameUpdate> {
        if let Some(i) = tracks.iter().position(|t| t.id.is_none()) {
            return Err(Error::InvalidInput(format!("track at position {} has no id", i)));
        }
        if let Some(i) = detections.iter().position(|d| d.id.is_some()) {
            return Err(Error::InvalidInput(format!("detection {} is already assigned", i)));
        }
        // Check the joint schema up front so a bad frame leaves the tracks untouched.
        if let Some(expected) = tracks.first().or(detections.first()).map(Pose::len) {
            if let Some(odd) = tracks.iter().chain(detections.iter()).find(|p| p.len() != expected) {
                return Err(Error::DimensionMismatch {
                    left: expected,
                    right: odd.len(),
                });
            }
        }

        let conflicts = self.claim(tracks, detections)?;

        let before = tracks.len();
        tracks.retain(Pose::is_alive);
        let died = before - tracks.len();
        let kept = refresh_survivors(tracks, detections)?;

        let mut born = 0;
        for det in detections.iter_mut().filter(|d| d.id.is_none()) {
            let id = ids.next_id();
            det.id = Some(id);
            debug!(id, "new track");
            tracks.push(det.clone());
            born += 1;
        }

        Ok(FrameUpdate { kept, died, born, conflicts })
    }

    /// Let each track claim its best detection, resolving conflicts in place.
    /// Losers are marked dead. Returns the number of contested claims.
    fn claim(&self, tracks: &mut [Pose], detections: &mut [Pose]) -> Result<usize> {
        let mut conflicts = 0;

        for i in 0..tracks.len() {
            let track_id = tracks[i].id;
            let Some(w) = select_best_match(&tracks[i], detections, self.neighbours, &self.metric)?
            else {
                debug!(id = ?track_id, "no detections, track died");
                tracks[i].mark_dead();
                continue;
            };

            let Some(claimant) = detections[w].id else {
                debug!(id = ?track_id, detection = w, "claimed");
                detections[w].id = track_id;
                continue;
            };

            conflicts += 1;
            match tracks.iter().position(|t| t.id == Some(claimant)) {
                None => {
                    warn!(claimant, detection = w, "claimant not in track set, overwriting claim");
                    detections[w].id = track_id;
                }
                Some(j) => {
                    let dist_old = self.metric.between(&detections[w], &tracks[j])?;
                    let dist_new = self.metric.between(&detections[w], &tracks[i])?;
                    if dist_new < dist_old {
                        debug!(id = ?track_id, loser = claimant, dist_new, dist_old, "claim transferred");
                        detections[w].id = track_id;
                        tracks[j].mark_dead();
                    } else {
                        debug!(id = ?track_id, winner = claimant, dist_new, dist_old, "claim lost, track died");
                        tracks[i].mark_dead();
                    }
                }
            }
        }

        Ok(conflicts)
    }
}

/// Replace every surviving track with the detection carrying its id.
fn refresh_survivors(tracks: &mut [Pose], detections: &[Pose]) -> Result<usize> {
    for track in tracks.iter_mut() {
        let id = track.id.ok_or_else(|| Error::InvalidInput("track without id".into()))?;
        let det = detections
            .iter()
            .find(|d| d.id == Some(id))
            .ok_or(Error::MissingMatch { id })?;
        *track = det.clone();
    }
    Ok(tracks.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> Pose {
        Pose::from_flat(&[x, y, 1.0, x, y + 10.0, 1.0]).unwrap()
    }

    fn tracked(x: f64, y: f64, id: u32) -> Pose {
        let mut p = at(x, y);
        p.id = Some(id);
        p
    }

    fn ids_of(tracks: &[Pose]) -> Vec<Option<u32>> {
        tracks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_id_counter() {
        let mut ids = IdCounter::new();
        assert_eq!(ids.peek(), 1);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn test_births_from_empty() {
        let tracker = PoseTracker::default();
        let mut tracks = Vec::new();
        let mut dets = vec![at(0.0, 0.0), at(100.0, 0.0)];
        let mut ids = IdCounter::new();

        let stats = tracker.update(&mut tracks, &mut dets, &mut ids).unwrap();

        assert_eq!(stats, FrameUpdate { kept: 0, died: 0, born: 2, conflicts: 0 });
        assert_eq!(ids_of(&tracks), vec![Some(1), Some(2)]);
        assert_eq!(ids_of(&dets), vec![Some(1), Some(2)]);
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn test_tracks_follow_detections() {
        let tracker = PoseTracker::default();
        let mut tracks = vec![tracked(0.0, 0.0, 1), tracked(100.0, 0.0, 2)];
        let mut dets = vec![at(98.0, 1.0), at(2.0, -1.0)];
        let mut ids = IdCounter { next: 3 };

        let stats = tracker.update(&mut tracks, &mut dets, &mut ids).unwrap();

        assert_eq!(stats.kept, 2);
        assert_eq!(stats.born, 0);
        assert_eq!(ids_of(&dets), vec![Some(2), Some(1)]);
        // Track order is preserved, geometry comes from the detection.
        assert_eq!(ids_of(&tracks), vec![Some(1), Some(2)]);
        assert_eq!(tracks[0].keypoints(), dets[1].keypoints());
        assert_eq!(tracks[1].keypoints(), dets[0].keypoints());
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn test_empty_frame_kills_everything() {
        let tracker = PoseTracker::default();
        let mut tracks = vec![tracked(0.0, 0.0, 1), tracked(5.0, 5.0, 2)];
        let mut ids = IdCounter { next: 3 };

        let stats = tracker.update(&mut tracks, &mut [], &mut ids).unwrap();

        assert!(tracks.is_empty());
        assert_eq!(stats.died, 2);
    }

    #[test]
    fn test_conflict_closer_track_wins() {
        let tracker = PoseTracker::default();
        // Track 1 is processed first but track 2 is closer.
        let mut tracks = vec![tracked(0.0, 0.0, 1), tracked(8.0, 0.0, 2)];
        let mut dets = vec![at(10.0, 0.0)];
        let mut ids = IdCounter { next: 3 };

        let stats = tracker.update(&mut tracks, &mut dets, &mut ids).unwrap();

        assert_eq!(stats.conflicts, 1);
        assert_eq!(stats.died, 1);
        assert_eq!(ids_of(&tracks), vec![Some(2)]);
        assert_eq!(ids_of(&dets), vec![Some(2)]);
    }

    #[test]
    fn test_conflict_earlier_claim_stands() {
        let tracker = PoseTracker::default();
        let mut tracks = vec![tracked(8.0, 0.0, 1), tracked(0.0, 0.0, 2)];
        let mut dets = vec![at(10.0, 0.0)];
        let mut ids = IdCounter { next: 3 };

        tracker.update(&mut tracks, &mut dets, &mut ids).unwrap();

        assert_eq!(ids_of(&tracks), vec![Some(1)]);
    }

    #[test]
    fn test_conflict_tie_keeps_earlier_claim() {
        let tracker = PoseTracker::default();
        let mut tracks = vec![tracked(-5.0, 0.0, 1), tracked(5.0, 0.0, 2)];
        let mut dets = vec![at(0.0, 0.0)];
        let mut ids = IdCounter { next: 3 };

        tracker.update(&mut tracks, &mut dets, &mut ids).unwrap();

        assert_eq!(ids_of(&tracks), vec![Some(1)]);
        assert_eq!(ids_of(&dets), vec![Some(1)]);
    }

    #[test]
    fn test_loser_does_not_claim_other_detection() {
        let tracker = PoseTracker::default();
        // Track 2 loses detection 0 to track 1 and dies even though detection 1 is free.
        let mut tracks = vec![tracked(0.0, 0.0, 1), tracked(3.0, 0.0, 2)];
        let mut dets = vec![at(1.0, 0.0), at(50.0, 0.0)];
        let mut ids = IdCounter { next: 3 };

        let stats = tracker.update(&mut tracks, &mut dets, &mut ids).unwrap();

        assert_eq!(stats, FrameUpdate { kept: 1, died: 1, born: 1, conflicts: 1 });
        assert_eq!(ids_of(&tracks), vec![Some(1), Some(3)]);
        assert_eq!(ids_of(&dets), vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_rejects_assigned_detection() {
        let tracker = PoseTracker::default();
        let mut dets = vec![tracked(0.0, 0.0, 9)];
        let err = tracker.update(&mut Vec::new(), &mut dets, &mut IdCounter::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_unassigned_track() {
        let tracker = PoseTracker::default();
        let mut tracks = vec![at(0.0, 0.0)];
        let err = tracker.update(&mut tracks, &mut [], &mut IdCounter::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_survivor_without_detection_is_reported() {
        let mut tracks = vec![tracked(0.0, 0.0, 4)];
        let dets = vec![tracked(0.0, 0.0, 5)];
        let err = refresh_survivors(&mut tracks, &dets).unwrap_err();
        assert!(matches!(err, Error::MissingMatch { id: 4 }));
    }

    #[test]
    fn test_dimension_mismatch_propagates() {
        let tracker = PoseTracker::default();
        let mut tracks = vec![tracked(0.0, 0.0, 1)];
        let mut dets = vec![Pose::from_flat(&[0.0, 0.0, 1.0]).unwrap()];
        let err = tracker.update(&mut tracks, &mut dets, &mut IdCounter::new()).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { left: 2, right: 1 }));
        assert!(tracks[0].is_alive());
    }
}
