use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::object_from_json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// JSON file holding the `N x 4` correspondence array.
    pub keypoint_matches: PathBuf,
    /// Field of the correspondence file that holds the array.
    pub correspondence_key: String,
    /// Top-down reference map the frames are rectified onto.
    pub map_image: Option<PathBuf>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub frame_prefix: String,
    pub detection_prefix: String,
    pub output_image_extension: String,
    pub homography_file: String,
    pub report_file: String,
    /// Warp frames to the map's size instead of their own.
    pub fit_to_map: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keypoint_matches: PathBuf::from("kp_gmaps.json"),
            correspondence_key: "kp_gmaps".to_string(),
            map_image: None,
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            frame_prefix: "img_".to_string(),
            detection_prefix: "yolo_".to_string(),
            output_image_extension: "jpg".to_string(),
            homography_file: "homography.json".to_string(),
            report_file: "report.json".to_string(),
            fit_to_map: false,
        }
    }
}

impl PipelineConfig {
    /// Loads a config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<PipelineConfig> {
        object_from_json(path)
    }

    pub fn homography_path(&self) -> PathBuf {
        self.output_dir.join(&self.homography_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.report_file)
    }
}
