use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use glam::Vec2;
use log::{debug, warn};
use nalgebra as na;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::detections::DetectionSet;
use crate::error::{RectifyError, Result};
use crate::scene::{CameraInfo, ImageFeatures};
use crate::types::{Homography, Point2D};
use crate::util::extract_image_number;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Reads a detection record, rejecting label arrays that do not match the boxes.
pub fn load_detections(path: &Path) -> Result<DetectionSet> {
    let missing = |reason: String| RectifyError::MissingArtifact {
        path: path.to_path_buf(),
        reason,
    };
    let detections: DetectionSet = object_from_json(path).map_err(|e| missing(e.to_string()))?;
    detections.validate().map_err(missing)?;
    Ok(detections)
}

/// Point correspondences split into source and destination points.
#[derive(Debug, Clone, PartialEq)]
pub struct Correspondences {
    pub src: Vec<Point2D>,
    pub dst: Vec<Point2D>,
}

impl Correspondences {
    pub fn from_rows(rows: &[[f64; 4]]) -> Correspondences {
        let (src, dst) = rows
            .iter()
            .map(|r| (Point2D::new(r[0], r[1]), Point2D::new(r[2], r[3])))
            .unzip();
        Correspondences { src, dst }
    }

    pub fn to_rows(&self) -> Vec<[f64; 4]> {
        self.src
            .iter()
            .zip(&self.dst)
            .map(|(s, d)| [s.x, s.y, d.x, d.y])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }
}

/// Reads the `N x 4` correspondence array stored under `key` in a JSON object.
pub fn load_correspondences(path: &Path, key: &str) -> Result<Correspondences> {
    let mut fields: HashMap<String, Vec<[f64; 4]>> = object_from_json(path)?;
    let rows = fields
        .remove(key)
        .ok_or_else(|| RectifyError::MissingArtifact {
            path: path.to_path_buf(),
            reason: format!("no field named {:?}", key),
        })?;
    Ok(Correspondences::from_rows(&rows))
}

pub fn save_correspondences(path: &Path, key: &str, correspondences: &Correspondences) -> Result<()> {
    let fields = HashMap::from([(key.to_string(), correspondences.to_rows())]);
    object_to_json(path, &fields)
}

#[derive(Serialize, Deserialize)]
struct HomographyRecord {
    #[serde(rename = "H")]
    h: [[f64; 3]; 3],
}

/// Writes `h` as `{"H": [[..], [..], [..]]}`, row-major.
pub fn save_homography(path: &Path, h: &Homography) -> Result<()> {
    object_to_json(path, &HomographyRecord { h: h.to_rows() })
}

/// Reads an `{"H": ..}` record and rescales it so that `H[2][2] == 1`.
pub fn load_homography(path: &Path) -> Result<Homography> {
    let record: HomographyRecord = object_from_json(path)?;
    Homography::normalized(*Homography::from_rows(&record.h).matrix())
}

/// Keypoints and descriptors of one image, as stored in a keypoint file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub keypoints: Vec<[f32; 2]>,
    pub descriptors: Vec<Vec<f32>>,
}

impl FeatureRecord {
    pub fn into_features(self) -> Result<ImageFeatures> {
        let keypoints = self.keypoints.iter().map(|&[x, y]| Vec2::new(x, y)).collect();
        ImageFeatures::new(keypoints, self.descriptors)
    }
}

/// Reads per-image features stored as `{"img1": {..}, "img2": {..}}`.
///
/// Keys starting with `_` are metadata and skipped. The rest are ordered by the number
/// following `img`; keys without one are skipped. A later key with the same number
/// replaces an earlier one.
pub fn load_image_features(path: &Path) -> Result<Vec<ImageFeatures>> {
    let raw: BTreeMap<String, serde_json::Value> = object_from_json(path)?;
    let mut by_index = BTreeMap::new();
    for (key, value) in raw {
        if key.starts_with('_') {
            continue;
        }
        let Some(index) = extract_image_number(&key) else {
            debug!("{}: key {:?} has no image number, skipped", path.display(), key);
            continue;
        };
        let record: FeatureRecord = serde_json::from_value(value)?;
        if by_index.insert(index, record).is_some() {
            warn!("{}: duplicate features for image {}", path.display(), index + 1);
        }
    }
    by_index.into_values().map(FeatureRecord::into_features).collect()
}

/// Camera data of one image, with the rgb frame stored as an image path.
///
/// A relative `rgb` path is resolved against the directory of the file it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    pub rgb: PathBuf,
    pub depth: Vec<Vec<f32>>,
    pub confidence: Vec<Vec<f32>>,
    pub focal_length: f64,
}

#[derive(Serialize, Deserialize)]
struct CameraFile {
    cams_info: Vec<CameraRecord>,
}

/// Row-major nested rows into a matrix, rejecting ragged input.
fn matrix_from_rows(what: &'static str, rows: &[Vec<f32>]) -> Result<na::DMatrix<f32>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(RectifyError::DimensionMismatch {
            what,
            expected: format!("{} columns", ncols),
            got: format!("{} columns", bad.len()),
        });
    }
    Ok(na::DMatrix::from_fn(rows.len(), ncols, |r, c| rows[r][c]))
}

impl CameraRecord {
    pub fn into_camera_info(self, base_dir: &Path) -> Result<CameraInfo> {
        let rgb_path = base_dir.join(&self.rgb);
        let rgb = image::open(&rgb_path)
            .map_err(|e| RectifyError::MissingArtifact {
                path: rgb_path.clone(),
                reason: e.to_string(),
            })?
            .to_rgb8();
        let depth = matrix_from_rows("depth map rows", &self.depth)?;
        let confidence = matrix_from_rows("confidence map rows", &self.confidence)?;
        CameraInfo::new(rgb, depth, confidence, self.focal_length)
    }
}

/// Reads the `cams_info` list of a camera file, in file order.
pub fn load_camera_infos(path: &Path) -> Result<Vec<CameraInfo>> {
    let file: CameraFile = object_from_json(path)?;
    let base_dir = path.parent().unwrap_or(Path::new(""));
    file.cams_info
        .into_iter()
        .map(|record| record.into_camera_info(base_dir))
        .collect()
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: String,
    pub frames: usize,
    pub frames_with_detections: usize,
    pub frames_exported: usize,
    pub failed_frames: Vec<u32>,
    pub correspondences: usize,
    pub mean_reprojection_error: f64,
    #[serde(rename = "H")]
    pub homography: [[f64; 3]; 3],
}

fn now_string() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

impl RunReport {
    pub fn stamped(mut self) -> RunReport {
        self.timestamp = now_string();
        self
    }
}

pub fn write_report(output_path: &Path, report: &RunReport) -> Result<()> {
    object_to_json(output_path, report)
}
