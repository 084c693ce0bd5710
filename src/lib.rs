pub mod config;
pub mod error;
pub mod io;
pub mod matching;
pub mod pose;
pub mod sequence;
pub mod tracker;

// Re-export main types
pub use crate::config::TrackerConfig;
pub use crate::error::{Error, Result};
pub use crate::matching::{nearest_candidate, select_best_match};
pub use crate::pose::{Keypoint, Pose, PoseDistance};
pub use crate::sequence::{Frame, FrameSnapshot, SequenceTracker, TrackedPose};
pub use crate::tracker::{FrameUpdate, IdCounter, PoseTracker};
