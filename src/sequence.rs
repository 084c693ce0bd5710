use tracing::info;

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::pose::{Keypoint, Pose};
use crate::tracker::{FrameUpdate, IdCounter, PoseTracker};

/// All detections of one time step, in detector order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub poses: Vec<Pose>,
}

impl Frame {
    pub fn new(poses: Vec<Pose>) -> Self {
        Self { poses }
    }

    /// Build a frame from one flat `(x, y, confidence)` sequence per person.
    pub fn from_flat<I, S>(people: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[f64]>,
    {
        let poses = people
            .into_iter()
            .map(|p| Pose::from_flat(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { poses })
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

/// A pose with its resolved track id, as handed to the persister.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPose {
    pub id: u32,
    pub keypoints: Vec<Keypoint>,
}

impl TrackedPose {
    pub fn flat_keypoints(&self) -> Vec<f64> {
        self.keypoints
            .iter()
            .flat_map(|kp| [kp.x(), kp.y(), kp.confidence])
            .collect()
    }
}

/// Identified poses of one processed frame, in detection order.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub index: usize,
    pub update: FrameUpdate,
    people: Vec<TrackedPose>,
}

impl FrameSnapshot {
    pub fn people(&self) -> &[TrackedPose] {
        &self.people
    }

    pub fn ids(&self) -> Vec<u32> {
        self.people.iter().map(|p| p.id).collect()
    }
}

/// Feeds frames, in order, through the pose tracker.
///
/// Owns the live track set and the id counter for the whole run; nothing
/// else keeps tracking state between frames.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    tracker: PoseTracker,
    tracks: Vec<Pose>,
    ids: IdCounter,
    frame_count: usize,
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

impl SequenceTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            tracker: PoseTracker::new(config),
            tracks: Vec::new(),
            ids: IdCounter::new(),
            frame_count: 0,
        }
    }

    /// Live tracks after the last processed frame.
    pub fn tracks(&self) -> &[Pose] {
        &self.tracks
    }

    /// The id the next new track will get.
    pub fn next_id(&self) -> u32 {
        self.ids.peek()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Process the next frame and return its identified poses.
    pub fn step(&mut self, frame: Frame) -> Result<FrameSnapshot> {
        let index = self.frame_count;
        let mut detections = frame.poses;

        let update = self.tracker.update(&mut self.tracks, &mut detections, &mut self.ids)?;
        self.frame_count += 1;

        info!(
            frame = index,
            detections = detections.len(),
            live = self.tracks.len(),
            born = update.born,
            died = update.died,
            "frame tracked"
        );

        let people = detections
            .into_iter()
            .enumerate()
            .map(|(i, pose)| {
                let id = pose.id.ok_or_else(|| {
                    Error::InvalidInput(format!("detection {} of frame {} left unassigned", i, index))
                })?;
                Ok(TrackedPose {
                    id,
                    keypoints: pose.keypoints().to_vec(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FrameSnapshot { index, update, people })
    }

    /// Process every frame in order, stopping at the first error.
    pub fn run<I>(&mut self, frames: I) -> Result<Vec<FrameSnapshot>>
    where
        I: IntoIterator<Item = Frame>,
    {
        frames.into_iter().map(|frame| self.step(frame)).collect()
    }
}
