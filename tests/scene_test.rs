use glam::Vec2;
use image::RgbImage;
use nalgebra as na;
use planar_rectification::RectifyError;
use planar_rectification::io;
use planar_rectification::scene::{self, CameraInfo, ImageFeatures, SceneData};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

// 3 x 2 image, focal length 2, principal point (1, 1)
fn camera() -> CameraInfo {
    let rgb = RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8, y as u8, 9]));
    let depth = na::DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, -1.0, 3.0, 4.0]);
    let confidence = na::DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 0.5, 1.0, 0.9, 1.0]);
    CameraInfo::new(rgb, depth, confidence, 2.0).unwrap()
}

fn features() -> ImageFeatures {
    let keypoints = vec![
        Vec2::new(0.5, 0.5),
        Vec2::new(1.9, 0.2),
        Vec2::new(2.2, 1.7),
        Vec2::new(5.0, 5.0),
        Vec2::new(-0.5, 0.0),
    ];
    let descriptors = (0..5).map(|i| vec![i as f32, 1.0]).collect();
    ImageFeatures::new(keypoints, descriptors).unwrap()
}

fn assert_point(p: &[f64; 3], expected: [f64; 3]) {
    for (a, b) in p.iter().zip(expected) {
        assert!((a - b).abs() < 1e-12, "{:?} != {:?}", p, expected);
    }
}

#[test]
fn test_intrinsics() {
    let k = camera().intrinsics();
    let expected = na::Matrix3::new(2.0, 0.0, 1.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0);
    assert_eq!(k, expected);
}

#[test]
fn test_point_cloud_backprojection() {
    let scene = SceneData::new(features(), camera());
    let cloud = scene.as_point_cloud(0.6);
    assert_eq!(cloud.len(), 3);
    assert_point(&cloud.points()[0], [-0.5, -0.5, 1.0]);
    assert_point(&cloud.points()[1], [0.0, 0.0, 3.0]);
    assert_point(&cloud.points()[2], [2.0, 0.0, 4.0]);
    assert_eq!(cloud.colors()[1], [1, 1, 9]);
}

#[test]
fn test_point_cloud_mask_for_any_threshold() {
    let cam = camera();
    let max = cam.confidence().max();
    let scene = SceneData::new(ImageFeatures::default(), cam.clone());
    for threshold in [0.0f32, 0.25, 0.5, 0.9, 0.99] {
        let cloud = scene.as_point_cloud(threshold);
        let expected = cam
            .depth()
            .iter()
            .zip(cam.confidence().iter())
            .filter(|(d, c)| **d > 0.0 && **c > threshold * max)
            .count();
        assert_eq!(cloud.len(), expected, "threshold {}", threshold);
        assert!(cloud.points().iter().all(|p| p[2] > 0.0));
    }
}

#[test]
fn test_point_cloud_without_confidence() {
    let rgb = RgbImage::new(2, 2);
    let depth = na::DMatrix::from_element(2, 2, 1.0f32);
    let confidence = na::DMatrix::zeros(2, 2);
    let cam = CameraInfo::new(rgb, depth, confidence, 1.0).unwrap();
    let scene = SceneData::new(ImageFeatures::default(), cam);
    assert!(scene.as_point_cloud(0.0).is_empty());
}

#[test]
fn test_valid_keypoints_and_descriptors() {
    let scene = SceneData::new(features(), camera());
    let valid = scene.get_valid_keypoints_and_descriptors(0.6);
    assert_eq!(valid.len(), 2);
    assert_eq!(valid.keypoints(), &[Vec2::new(0.5, 0.5), Vec2::new(2.2, 1.7)]);
    assert_eq!(valid.descriptors(), &[vec![0.0f32, 1.0], vec![2.0f32, 1.0]]);

    let points = scene.valid_keypoints_3d(0.6);
    assert_eq!(points.len(), 2);
    assert!((points[0] - na::Point3::new(-0.5, -0.5, 1.0)).norm() < 1e-12);
    assert!((points[1] - na::Point3::new(2.0, 0.0, 4.0)).norm() < 1e-12);
}

#[test]
fn test_out_of_bounds_sample() {
    let cam = camera();
    let err = cam.sample(Vec2::new(3.0, 0.0)).unwrap_err();
    assert!(matches!(err, RectifyError::OutOfBounds { u: 3, v: 0, .. }));
    assert!(cam.sample(Vec2::new(-0.1, 0.0)).is_err());
    assert_eq!(cam.sample(Vec2::new(2.9, 1.9)).unwrap(), (4.0, 1.0));
}

#[test]
fn test_shape_validation() {
    let rgb = RgbImage::new(3, 2);
    let depth = na::DMatrix::zeros(3, 2);
    let confidence = na::DMatrix::zeros(2, 3);
    let err = CameraInfo::new(rgb, depth, confidence, 1.0).unwrap_err();
    assert!(matches!(err, RectifyError::DimensionMismatch { .. }));

    let err = ImageFeatures::new(vec![Vec2::ZERO], vec![]).unwrap_err();
    assert!(matches!(err, RectifyError::DimensionMismatch { .. }));
    let err = ImageFeatures::new(vec![Vec2::ZERO, Vec2::ONE], vec![vec![1.0], vec![1.0, 2.0]])
        .unwrap_err();
    assert!(matches!(err, RectifyError::DimensionMismatch { .. }));
}

#[test]
fn test_focal_length_must_be_positive() {
    for f in [0.0, -2.0, f64::NAN, f64::INFINITY] {
        let err = CameraInfo::new(
            RgbImage::new(3, 2),
            na::DMatrix::zeros(2, 3),
            na::DMatrix::zeros(2, 3),
            f,
        )
        .unwrap_err();
        assert!(matches!(err, RectifyError::InvalidFocalLength(_)));
    }
}

fn write_scene_files(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    for name in ["first.png", "second.png"] {
        RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(dir.join(name))
            .unwrap();
    }
    let keypoints = dir.join("kp.json");
    let features = json!({
        "_header": "keypoint export",
        "img2": {"keypoints": [[2.5, 1.5]], "descriptors": [[0.0, 1.0, 0.0]]},
        "img1": {
            "keypoints": [[0.5, 0.5], [1.5, 1.5]],
            "descriptors": [[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]
        },
        "notes": {"keypoints": [], "descriptors": []}
    });
    std::fs::write(&keypoints, features.to_string()).unwrap();

    let cameras = dir.join("cams.json");
    let cams = json!({
        "cams_info": [
            {
                "rgb": "first.png",
                "depth": [[1.0, 0.0, 2.0], [-1.0, 3.0, 4.0]],
                "confidence": [[1.0, 1.0, 0.5], [1.0, 0.9, 1.0]],
                "focal_length": 2.0
            },
            {
                "rgb": "second.png",
                "depth": [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
                "confidence": [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
                "focal_length": 4.0
            }
        ]
    });
    std::fs::write(&cameras, cams.to_string()).unwrap();
    (keypoints, cameras)
}

#[test]
fn test_load_scenes() {
    let temp_dir = TempDir::new().unwrap();
    let (keypoints, cameras) = write_scene_files(temp_dir.path());

    let scenes = scene::load_scenes(&keypoints, &cameras).unwrap();
    assert_eq!(scenes.len(), 2);

    // ordered by image number, not by key order in the file
    let first = &scenes[0];
    assert_eq!(first.image_features.len(), 2);
    assert_eq!(first.image_features.keypoints()[0], Vec2::new(0.5, 0.5));
    assert_eq!(first.camera_info.focal_length(), 2.0);
    assert_eq!(first.camera_info.depth()[(1, 2)], 4.0);
    assert_eq!(first.camera_info.rgb().get_pixel(0, 0).0, [10, 20, 30]);
    assert_eq!(first.as_point_cloud(0.6).len(), 3);
    // (0.5, 0.5) has depth 1, (1.5, 1.5) has depth 3
    assert_eq!(first.valid_keypoints_3d(0.6).len(), 2);

    let second = &scenes[1];
    assert_eq!(second.image_features.keypoints(), &[Vec2::new(2.5, 1.5)]);
    assert_eq!(second.camera_info.focal_length(), 4.0);
    assert_eq!(second.as_point_cloud(0.5).len(), 6);
}

#[test]
fn test_load_scenes_keeps_shortest() {
    let temp_dir = TempDir::new().unwrap();
    let (keypoints, cameras) = write_scene_files(temp_dir.path());
    std::fs::write(
        &keypoints,
        json!({"img1": {"keypoints": [[0.5, 0.5]], "descriptors": [[1.0]]}}).to_string(),
    )
    .unwrap();
    let scenes = scene::load_scenes(&keypoints, &cameras).unwrap();
    assert_eq!(scenes.len(), 1);
}

#[test]
fn test_load_camera_infos_rejects_bad_maps() {
    let temp_dir = TempDir::new().unwrap();
    let (_, cameras) = write_scene_files(temp_dir.path());

    let ragged = json!({"cams_info": [{
        "rgb": "first.png",
        "depth": [[1.0, 0.0, 2.0], [1.0]],
        "confidence": [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
        "focal_length": 2.0
    }]});
    std::fs::write(&cameras, ragged.to_string()).unwrap();
    assert!(matches!(
        io::load_camera_infos(&cameras),
        Err(RectifyError::DimensionMismatch { .. })
    ));

    let missing_rgb = json!({"cams_info": [{
        "rgb": "nowhere.png",
        "depth": [[1.0]],
        "confidence": [[1.0]],
        "focal_length": 2.0
    }]});
    std::fs::write(&cameras, missing_rgb.to_string()).unwrap();
    assert!(matches!(
        io::load_camera_infos(&cameras),
        Err(RectifyError::MissingArtifact { .. })
    ));
}
