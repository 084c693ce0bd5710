use nalgebra::{distance_squared, Point2};

use crate::config::TrackerConfig;
use crate::error::{Error, Result};

/// Number of values per keypoint in a flat sequence: x, y, confidence.
pub const KEYPOINT_STRIDE: usize = 3;

/// A single joint: image position and detector confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub position: Point2<f64>,
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            confidence,
        }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }
}

/// One detected subject in one frame, plus its tracking metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    keypoints: Vec<Keypoint>,
    /// Track id, `None` until the updater resolves the pose.
    pub id: Option<u32>,
    /// Cleared while a frame is being processed to mark the track for removal.
    alive: bool,
}

impl Pose {
    /// Create an unassigned, live pose.
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self {
            keypoints,
            id: None,
            alive: true,
        }
    }

    /// Build a pose from consecutive `(x, y, confidence)` triples.
    ///
    /// Fails if the length is not a multiple of three; nothing is truncated.
    pub fn from_flat(values: &[f64]) -> Result<Self> {
        if values.len() % KEYPOINT_STRIDE != 0 {
            return Err(Error::MalformedKeypoints { len: values.len() });
        }
        let keypoints = values
            .chunks_exact(KEYPOINT_STRIDE)
            .map(|kp| Keypoint::new(kp[0], kp[1], kp[2]))
            .collect();
        Ok(Self::new(keypoints))
    }

    /// Flatten back to `(x, y, confidence)` triples in joint order.
    pub fn flat_keypoints(&self) -> Vec<f64> {
        self.keypoints
            .iter()
            .flat_map(|kp| [kp.x(), kp.y(), kp.confidence])
            .collect()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn mark_dead(&mut self) {
        self.alive = false;
    }
}

/// Pairwise pose dissimilarity.
///
/// Sums the squared image distance of every joint pair where both
/// confidences exceed the threshold, and a fixed penalty for every other
/// pair. Low-confidence joints are therefore "maximally different" rather
/// than ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseDistance {
    pub confidence_threshold: f64,
    pub missing_keypoint_penalty: f64,
}

impl Default for PoseDistance {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

impl PoseDistance {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            missing_keypoint_penalty: config.missing_keypoint_penalty,
        }
    }

    pub fn between(&self, a: &Pose, b: &Pose) -> Result<f64> {
        if a.len() != b.len() {
            return Err(Error::DimensionMismatch {
                left: a.len(),
                right: b.len(),
            });
        }
        let d: f64 = a
            .keypoints
            .iter()
            .zip(&b.keypoints)
            .map(|(ka, kb)| {
                if ka.confidence > self.confidence_threshold
                    && kb.confidence > self.confidence_threshold
                {
                    distance_squared(&ka.position, &kb.position)
                } else {
                    self.missing_keypoint_penalty
                }
            })
            .sum();
        Ok(d)
    }
}
