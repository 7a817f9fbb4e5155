use std::path::Path;

use glam::Vec2;
use image::RgbImage;
use log::{debug, info, warn};
use nalgebra as na;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RectifyError, Result};
use crate::io;
use crate::types::Point3D;
use crate::util::positive_max;

/// Keypoints with one fixed-length descriptor each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageFeatures {
    keypoints: Vec<Vec2>,
    descriptors: Vec<Vec<f32>>,
}

impl ImageFeatures {
    pub fn new(keypoints: Vec<Vec2>, descriptors: Vec<Vec<f32>>) -> Result<ImageFeatures> {
        if keypoints.len() != descriptors.len() {
            return Err(RectifyError::DimensionMismatch {
                what: "descriptor count",
                expected: keypoints.len().to_string(),
                got: descriptors.len().to_string(),
            });
        }
        if let Some(first) = descriptors.first() {
            if let Some(bad) = descriptors.iter().find(|d| d.len() != first.len()) {
                return Err(RectifyError::DimensionMismatch {
                    what: "descriptor length",
                    expected: first.len().to_string(),
                    got: bad.len().to_string(),
                });
            }
        }
        Ok(ImageFeatures {
            keypoints,
            descriptors,
        })
    }

    pub fn keypoints(&self) -> &[Vec2] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Vec<f32>] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// RGB frame with per-pixel depth and confidence from the same sensor.
///
/// Depth and confidence maps are `height x width` matrices indexed `(row, col)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    rgb: RgbImage,
    depth: na::DMatrix<f32>,
    confidence: na::DMatrix<f32>,
    focal_length: f64,
}

impl CameraInfo {
    pub fn new(
        rgb: RgbImage,
        depth: na::DMatrix<f32>,
        confidence: na::DMatrix<f32>,
        focal_length: f64,
    ) -> Result<CameraInfo> {
        if !(focal_length > 0.0 && focal_length.is_finite()) {
            return Err(RectifyError::InvalidFocalLength(focal_length));
        }
        let expected = (rgb.height() as usize, rgb.width() as usize);
        for (what, map) in [("depth map shape", &depth), ("confidence map shape", &confidence)] {
            if map.shape() != expected {
                return Err(RectifyError::DimensionMismatch {
                    what,
                    expected: format!("{:?}", expected),
                    got: format!("{:?}", map.shape()),
                });
            }
        }
        Ok(CameraInfo {
            rgb,
            depth,
            confidence,
            focal_length,
        })
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn depth(&self) -> &na::DMatrix<f32> {
        &self.depth
    }

    pub fn confidence(&self) -> &na::DMatrix<f32> {
        &self.confidence
    }

    /// Principal point in pixels, the integer half of each image dimension.
    pub fn principal_point(&self) -> (f64, f64) {
        ((self.width() / 2) as f64, (self.height() / 2) as f64)
    }

    /// Pinhole intrinsic matrix with the principal point at the image center.
    pub fn intrinsics(&self) -> na::Matrix3<f64> {
        let (cx, cy) = self.principal_point();
        let f = self.focal_length;
        na::Matrix3::new(f, 0.0, cx, 0.0, f, cy, 0.0, 0.0, 1.0)
    }

    /// Back-projects pixel `(u, v)` at `depth` into the camera frame.
    pub fn backproject(&self, u: f64, v: f64, depth: f64) -> Point3D {
        let (cx, cy) = self.principal_point();
        Point3D::new(
            (u - cx) * depth / self.focal_length,
            (v - cy) * depth / self.focal_length,
            depth,
        )
    }

    /// Depth and confidence at the pixel containing `p`.
    pub fn sample(&self, p: Vec2) -> Result<(f32, f32)> {
        let (width, height) = (self.width() as usize, self.height() as usize);
        let out_of_bounds = |u: i64, v: i64| RectifyError::OutOfBounds {
            u,
            v,
            width,
            height,
        };
        if !p.is_finite() {
            return Err(out_of_bounds(-1, -1));
        }
        let (u, v) = (p.x.floor() as i64, p.y.floor() as i64);
        if u < 0 || v < 0 || u as usize >= width || v as usize >= height {
            return Err(out_of_bounds(u, v));
        }
        let (row, col) = (v as usize, u as usize);
        Ok((self.depth[(row, col)], self.confidence[(row, col)]))
    }

    /// Largest confidence value in the map, `None` if it is not positive.
    pub fn max_confidence(&self) -> Option<f32> {
        positive_max(self.confidence.iter().copied())
    }
}

/// Depth is positive and confidence, relative to the map maximum, exceeds `threshold`.
#[inline]
fn is_valid(depth: f32, confidence: f32, max_confidence: f32, threshold: f32) -> bool {
    let has_depth = depth > 0.0;
    let is_confident = confidence / max_confidence > threshold;
    has_depth && is_confident
}

/// A point cloud with points and per-point colors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    points: Vec<[f64; 3]>,
    colors: Vec<[u8; 3]>,
}

impl PointCloud {
    pub fn new(points: Vec<[f64; 3]>, colors: Vec<[u8; 3]>) -> Self {
        Self { points, colors }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }
}

/// Features and camera data captured from the same frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneData {
    pub image_features: ImageFeatures,
    pub camera_info: CameraInfo,
}

impl SceneData {
    pub fn new(image_features: ImageFeatures, camera_info: CameraInfo) -> SceneData {
        SceneData {
            image_features,
            camera_info,
        }
    }

    /// Indices and depths of keypoints that pass the depth and confidence test.
    ///
    /// Keypoints outside the maps are dropped.
    fn valid_keypoints(&self, confidence_threshold: f32) -> Vec<(usize, f32)> {
        let Some(max_confidence) = self.camera_info.max_confidence() else {
            debug!("confidence map has no positive value, no keypoint is valid");
            return Vec::new();
        };
        self.image_features
            .keypoints()
            .iter()
            .enumerate()
            .filter_map(|(i, kp)| match self.camera_info.sample(*kp) {
                Ok((depth, confidence)) => {
                    is_valid(depth, confidence, max_confidence, confidence_threshold)
                        .then_some((i, depth))
                }
                Err(e) => {
                    debug!("keypoint {} dropped: {}", i, e);
                    None
                }
            })
            .collect()
    }

    /// Keeps the keypoint/descriptor pairs with positive depth and sufficient confidence.
    pub fn get_valid_keypoints_and_descriptors(&self, confidence_threshold: f32) -> ImageFeatures {
        let (keypoints, descriptors) = self
            .valid_keypoints(confidence_threshold)
            .into_iter()
            .map(|(i, _)| {
                (
                    self.image_features.keypoints()[i],
                    self.image_features.descriptors()[i].clone(),
                )
            })
            .unzip();
        ImageFeatures {
            keypoints,
            descriptors,
        }
    }

    /// 3-D positions of the keypoints kept by
    /// [`get_valid_keypoints_and_descriptors`](Self::get_valid_keypoints_and_descriptors), in
    /// the same order.
    pub fn valid_keypoints_3d(&self, confidence_threshold: f32) -> Vec<Point3D> {
        self.valid_keypoints(confidence_threshold)
            .into_iter()
            .map(|(i, depth)| {
                let kp = self.image_features.keypoints()[i];
                self.camera_info
                    .backproject(kp.x.floor() as f64, kp.y.floor() as f64, depth as f64)
            })
            .collect()
    }

    /// Back-projects every pixel with positive depth and sufficient confidence.
    pub fn as_point_cloud(&self, confidence_threshold: f32) -> PointCloud {
        let cam = &self.camera_info;
        let Some(max_confidence) = cam.max_confidence() else {
            return PointCloud::default();
        };
        let (width, height) = (cam.width(), cam.height());
        let (points, colors): (Vec<_>, Vec<_>) = (0..height)
            .into_par_iter()
            .flat_map_iter(|v| {
                (0..width).filter_map(move |u| {
                    let (row, col) = (v as usize, u as usize);
                    let depth = cam.depth[(row, col)];
                    let confidence = cam.confidence[(row, col)];
                    if !is_valid(depth, confidence, max_confidence, confidence_threshold) {
                        return None;
                    }
                    let p = cam.backproject(u as f64, v as f64, depth as f64);
                    Some(([p.x, p.y, p.z], cam.rgb.get_pixel(u, v).0))
                })
            })
            .unzip();
        PointCloud::new(points, colors)
    }
}

/// Pairs the features of a keypoint file with the cameras of a camera file.
///
/// The n-th image of the keypoint file goes with the n-th camera. Extra entries on
/// either side are left out.
pub fn load_scenes(keypoints_path: &Path, cameras_path: &Path) -> Result<Vec<SceneData>> {
    let features = io::load_image_features(keypoints_path)?;
    let cameras = io::load_camera_infos(cameras_path)?;
    if features.len() != cameras.len() {
        warn!(
            "{} feature sets but {} cameras, keeping the first {}",
            features.len(),
            cameras.len(),
            features.len().min(cameras.len())
        );
    }
    let scenes: Vec<SceneData> = features
        .into_iter()
        .zip(cameras)
        .map(|(f, c)| SceneData::new(f, c))
        .collect();
    info!("loaded {} scenes", scenes.len());
    Ok(scenes)
}
