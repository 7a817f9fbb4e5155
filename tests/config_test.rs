use planar_rectification::config::PipelineConfig;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.keypoint_matches, PathBuf::from("kp_gmaps.json"));
    assert_eq!(config.correspondence_key, "kp_gmaps");
    assert_eq!(config.frame_prefix, "img_");
    assert_eq!(config.detection_prefix, "yolo_");
    assert!(config.map_image.is_none());
    assert!(!config.fit_to_map);
    assert_eq!(config.homography_path(), PathBuf::from("output/homography.json"));
}

#[test]
fn test_partial_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"input_dir": "frames", "map_image": "map.png", "fit_to_map": true}"#,
    )
    .unwrap();
    let config = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(config.input_dir, PathBuf::from("frames"));
    assert_eq!(config.map_image, Some(PathBuf::from("map.png")));
    assert!(config.fit_to_map);
    assert_eq!(config.output_dir, PathBuf::from("output"));
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(PipelineConfig::from_json_file(&path).is_err());
    assert!(PipelineConfig::from_json_file(&temp_dir.path().join("missing.json")).is_err());
}
