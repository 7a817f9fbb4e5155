use std::path::{Path, PathBuf};

use glob::glob;
use log::{info, trace};

use crate::error::{RectifyError, Result};
use crate::frame::EnrichedFrame;
use crate::util::file_name_of;
use crate::video::EnrichedVideo;

const IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".bmp", ".tif"];
const DETECTION_EXTENSION: &str = ".json";

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        let name = p.as_os_str().to_string_lossy().to_lowercase();
        for ext in &IMAGE_EXTENSIONS {
            if name.ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

fn detection_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    match rp {
        Ok(p) if p.as_os_str().to_string_lossy().ends_with(DETECTION_EXTENSION) => Some(p),
        _ => None,
    }
}

/// File names in `dir` that start with `prefix` and pass `filter`, sorted.
fn list_artifacts(
    dir: &Path,
    prefix: &str,
    filter: fn(glob::GlobResult) -> Option<PathBuf>,
) -> Result<Vec<String>> {
    let pattern = format!(
        "{}/{}*",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(prefix)
    );
    trace!("listing {}", pattern);
    let mut names: Vec<String> = glob(&pattern)?
        .filter_map(filter)
        .map(|p| file_name_of(&p))
        .collect();
    names.sort();
    Ok(names)
}

/// Frame and detection file names found in `input_dir`.
pub fn discover_artifacts(
    input_dir: &Path,
    frame_prefix: &str,
    detection_prefix: &str,
) -> Result<(Vec<String>, Vec<String>)> {
    if !input_dir.is_dir() {
        return Err(RectifyError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", input_dir.display()),
        )));
    }
    let frames = list_artifacts(input_dir, frame_prefix, img_filter)?;
    let detections = list_artifacts(input_dir, detection_prefix, detection_filter)?;
    Ok((frames, detections))
}

/// Loads every frame of `input_dir` with its detections, in parallel.
///
/// Frames are matched to detection records through the index in their file names.
/// Frames without a record, or with an unreadable one, have no detections.
pub fn load_video(input_dir: &Path, frame_prefix: &str, detection_prefix: &str) -> Result<EnrichedVideo> {
    let (frames, detections) = discover_artifacts(input_dir, frame_prefix, detection_prefix)?;
    info!(
        "found {} frame files and {} detection files in {}",
        frames.len(),
        detections.len(),
        input_dir.display()
    );
    let frame_ids: Vec<&str> = frames.iter().map(String::as_str).collect();
    let detection_ids: Vec<&str> = detections.iter().map(String::as_str).collect();
    let video = EnrichedVideo::from_artifacts(&frame_ids, &detection_ids, |pair| {
        let detection_path = pair.detection.map(|d| input_dir.join(d));
        EnrichedFrame::from_paths(
            &input_dir.join(pair.frame),
            detection_path.as_deref(),
            pair.index,
        )
    });
    Ok(video)
}
