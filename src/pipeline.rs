use std::path::Path;

use log::{info, warn};

use crate::config::PipelineConfig;
use crate::data_loader::load_video;
use crate::error::Result;
use crate::geometry::{estimate_homography, reprojection_error};
use crate::io::{self, RunReport};
use crate::types::Homography;
use crate::video::EnrichedVideo;

/// Reads the map size, if a map is configured.
fn map_size(config: &PipelineConfig) -> Result<Option<(u32, u32)>> {
    match &config.map_image {
        Some(path) => {
            let size = image::image_dimensions(path)?;
            info!("reference map {} is {}x{}", path.display(), size.0, size.1);
            Ok(Some(size))
        }
        None => Ok(None),
    }
}

/// Estimates the frame-to-map homography from the configured correspondence file.
pub fn estimate_from_file(path: &Path, key: &str) -> Result<(Homography, f64, usize)> {
    let correspondences = io::load_correspondences(path, key)?;
    let h = estimate_homography(&correspondences.src, &correspondences.dst)?;
    let err = reprojection_error(&h, &correspondences.src, &correspondences.dst);
    Ok((h, err, correspondences.len()))
}

/// Warps and exports every frame; returns the indices that failed, ascending.
fn rectify_frames(
    video: &EnrichedVideo,
    h: &Homography,
    output_size: Option<(u32, u32)>,
    config: &PipelineConfig,
) -> Vec<u32> {
    let (warped, mut failures) = video.transform_to_size(h, output_size);
    failures.extend(warped.export(
        &config.output_dir,
        &config.frame_prefix,
        &config.detection_prefix,
        &config.output_image_extension,
    ));
    let mut failed: Vec<u32> = failures
        .into_iter()
        .map(|(index, e)| {
            warn!("frame {} failed: {}", index, e);
            index
        })
        .collect();
    failed.sort_unstable();
    failed
}

/// Loads the video, estimates one homography and writes every rectified frame.
///
/// Only estimation failures abort the run; per-frame failures are listed in the report.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    info!("loading files in {}, this may take a while...", config.input_dir.display());
    let video = load_video(&config.input_dir, &config.frame_prefix, &config.detection_prefix)?;
    info!(
        "loaded {} frames ({} with detections)",
        video.len(),
        video.count_with_detections()
    );

    let (h, mean_err, n_corr) =
        estimate_from_file(&config.keypoint_matches, &config.correspondence_key)?;
    info!(
        "homography from {} correspondences, mean transfer error {:.4} px\n{}",
        n_corr,
        mean_err,
        h.matrix()
    );
    // frames are warped with H^-1, so a singular H fails the whole run
    h.try_inverse()?;

    std::fs::create_dir_all(&config.output_dir)?;
    io::save_homography(&config.homography_path(), &h)?;

    let map = map_size(config)?;
    let output_size = if config.fit_to_map { map } else { None };
    let failed_frames = rectify_frames(&video, &h, output_size, config);

    let report = RunReport {
        timestamp: String::new(),
        frames: video.len(),
        frames_with_detections: video.count_with_detections(),
        frames_exported: video.len() - failed_frames.len(),
        failed_frames,
        correspondences: n_corr,
        mean_reprojection_error: mean_err,
        homography: h.to_rows(),
    }
    .stamped();
    io::write_report(&config.report_path(), &report)?;
    info!(
        "exported {}/{} frames to {}",
        report.frames_exported,
        report.frames,
        config.output_dir.display()
    );
    Ok(report)
}
