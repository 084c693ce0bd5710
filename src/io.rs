//! Reading OpenPose keypoint folders and writing tracking results.
//!
//! Input: one JSON file per frame, `{"people": [{"pose_keypoints": [...]}]}`,
//! ordered by file name. Output: a single JSON document holding every frame
//! with the track id of each person.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::sequence::{Frame, FrameSnapshot};

#[derive(Debug, Deserialize)]
struct KeypointFile {
    people: Vec<PersonKeypoints>,
}

#[derive(Debug, Deserialize)]
struct PersonKeypoints {
    #[serde(alias = "pose_keypoints_2d")]
    pose_keypoints: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct TrackedPerson {
    pub pose_keypoints: Vec<f64>,
    pub id: u32,
}

#[derive(Debug, Serialize)]
pub struct TrackedFrame {
    pub people: Vec<TrackedPerson>,
}

/// Document written by [`save_frames`].
#[derive(Debug, Serialize)]
pub struct TrackingOutput {
    pub frames: Vec<TrackedFrame>,
}

impl TrackingOutput {
    pub fn from_snapshots(snapshots: &[FrameSnapshot]) -> Self {
        let frames = snapshots
            .iter()
            .map(|snap| TrackedFrame {
                people: snap
                    .people()
                    .iter()
                    .map(|p| TrackedPerson {
                        pose_keypoints: p.flat_keypoints(),
                        id: p.id,
                    })
                    .collect(),
            })
            .collect();
        Self { frames }
    }
}

/// Parse one frame document.
pub fn parse_frame(json: &str) -> Result<Frame> {
    let file: KeypointFile = serde_json::from_str(json)?;
    Frame::from_flat(file.people.iter().map(|p| p.pose_keypoints.as_slice()))
}

/// List `*.json` files in `dir`, sorted by file name.
pub fn keypoint_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every frame of a keypoint folder in file-name order.
pub fn load_keypoints_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Frame>> {
    let files = keypoint_files(dir.as_ref())?;
    debug!(count = files.len(), dir = %dir.as_ref().display(), "loading keypoint files");

    files
        .iter()
        .map(|path| {
            let data = fs::read_to_string(path)?;
            parse_frame(&data)
                .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))
        })
        .collect()
}

pub fn write_frames<W: Write>(writer: W, snapshots: &[FrameSnapshot]) -> Result<()> {
    serde_json::to_writer(writer, &TrackingOutput::from_snapshots(snapshots))?;
    Ok(())
}

pub fn save_frames<P: AsRef<Path>>(path: P, snapshots: &[FrameSnapshot]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_frames(&mut writer, snapshots)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::SequenceTracker;

    #[test]
    fn test_parse_frame() {
        let frame = parse_frame(
            r#"{"version": 1.0, "people": [
                {"pose_keypoints": [1.0, 2.0, 0.5, 3.0, 4.0, 0.9]},
                {"pose_keypoints_2d": [5.0, 6.0, 0.0, 7.0, 8.0, 0.2]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.poses[1].flat_keypoints(), vec![5.0, 6.0, 0.0, 7.0, 8.0, 0.2]);
    }

    #[test]
    fn test_parse_frame_errors() {
        assert!(matches!(parse_frame(r#"{"people": []}"#), Ok(f) if f.is_empty()));
        assert!(matches!(parse_frame(r#"{"frames": []}"#), Err(Error::Json(_))));
        assert!(matches!(
            parse_frame(r#"{"people": [{"pose_keypoints": [1.0, 2.0]}]}"#),
            Err(Error::MalformedKeypoints { len: 2 })
        ));
    }

    #[test]
    fn test_write_frames() {
        let frames = vec![parse_frame(r#"{"people": [{"pose_keypoints": [1.5, 2.0, 0.5]}]}"#).unwrap()];
        let snaps = SequenceTracker::default().run(frames).unwrap();

        let mut buf = Vec::new();
        write_frames(&mut buf, &snaps).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(
            value,
            serde_json::json!({"frames": [{"people": [{"pose_keypoints": [1.5, 2.0, 0.5], "id": 1}]}]})
        );
    }

    #[test]
    fn test_load_dir_sorted() {
        let dir = std::env::temp_dir().join(format!("posetrack-io-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("b_000001_keypoints.json"), r#"{"people": []}"#).unwrap();
        fs::write(dir.join("a_000000_keypoints.json"), r#"{"people": [{"pose_keypoints": [0, 0, 1]}]}"#).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let frames = load_keypoints_dir(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), 1);
        assert!(frames[1].is_empty());
    }
}
