use std::collections::BTreeMap;
use std::path::Path;

use indicatif::ParallelProgressIterator;
use log::{debug, warn};
use rayon::prelude::*;

use crate::data_loader;
use crate::error::{RectifyError, Result};
use crate::frame::EnrichedFrame;
use crate::types::Homography;
use crate::util::extract_frame_index;

/// A frame identifier paired with the detection identifier sharing its index, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPair<'a> {
    pub index: u32,
    pub frame: &'a str,
    pub detection: Option<&'a str>,
}

fn index_map<'a>(ids: &[&'a str], kind: &str) -> BTreeMap<u32, &'a str> {
    let mut map = BTreeMap::new();
    for id in ids {
        match extract_frame_index(id) {
            Some(index) => {
                if let Some(previous) = map.insert(index, *id) {
                    warn!("{} {} replaces {} for index {}", kind, id, previous, index);
                }
            }
            None => debug!("{} {} has no frame index, skipped", kind, id),
        }
    }
    map
}

/// Pairs frame and detection identifiers by their shared frame index.
///
/// The result follows ascending index. Detection identifiers whose index has no frame
/// are dropped.
pub fn pair_artifacts<'a>(frame_ids: &[&'a str], detection_ids: &[&'a str]) -> Vec<ArtifactPair<'a>> {
    let frames = index_map(frame_ids, "frame");
    let detections = index_map(detection_ids, "detection");
    for (index, id) in &detections {
        if !frames.contains_key(index) {
            debug!("detection {} has no matching frame, dropped", id);
        }
    }
    frames
        .into_iter()
        .map(|(index, frame)| ArtifactPair {
            index,
            frame,
            detection: detections.get(&index).copied(),
        })
        .collect()
}

/// Frames of a video ordered by frame index. Indices need not be contiguous.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedVideo {
    frames: Vec<EnrichedFrame>,
}

impl EnrichedVideo {
    pub fn new(mut frames: Vec<EnrichedFrame>) -> EnrichedVideo {
        frames.sort_by_key(|f| f.index());
        EnrichedVideo { frames }
    }

    /// Builds a video from frame and detection identifiers.
    ///
    /// `load` turns one pair into a frame. Frames that fail to load are logged and left
    /// out; the rest are still returned.
    pub fn from_artifacts<F>(frame_ids: &[&str], detection_ids: &[&str], load: F) -> EnrichedVideo
    where
        F: Fn(&ArtifactPair) -> Result<EnrichedFrame> + Sync,
    {
        let pairs = pair_artifacts(frame_ids, detection_ids);
        let frames: Vec<EnrichedFrame> = pairs
            .par_iter()
            .progress_count(pairs.len() as u64)
            .filter_map(|pair| match load(pair) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!("skipping frame {}: {}", pair.index, e);
                    None
                }
            })
            .collect();
        EnrichedVideo::new(frames)
    }

    /// Discovers `img_*` frames and `yolo_*` detection records in `input_dir`.
    pub fn from_input_directory(input_dir: &Path) -> Result<EnrichedVideo> {
        data_loader::load_video(input_dir, "img_", "yolo_")
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&EnrichedFrame> {
        self.frames.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnrichedFrame> {
        self.frames.iter()
    }

    pub fn frames(&self) -> &[EnrichedFrame] {
        &self.frames
    }

    pub fn frame_indices(&self) -> Vec<u32> {
        self.frames.iter().map(EnrichedFrame::index).collect()
    }

    pub fn count_with_detections(&self) -> usize {
        self.frames.iter().filter(|f| f.has_detections()).count()
    }

    /// Warps every frame through `h` in parallel, keeping each frame's size.
    ///
    /// Frames that fail are returned next to the warped video instead of aborting it.
    pub fn transform(&self, h: &Homography) -> (EnrichedVideo, Vec<(u32, RectifyError)>) {
        self.transform_to_size(h, None)
    }

    /// Like [`transform`](Self::transform), but every output has `output_size` when given.
    pub fn transform_to_size(
        &self,
        h: &Homography,
        output_size: Option<(u32, u32)>,
    ) -> (EnrichedVideo, Vec<(u32, RectifyError)>) {
        let (ok, failed): (Vec<_>, Vec<_>) = self
            .frames
            .par_iter()
            .progress_count(self.len() as u64)
            .map(|f| {
                let size = output_size.unwrap_or_else(|| f.image().dimensions());
                f.transform_to_size(h, size).map_err(|e| (f.index(), e))
            })
            .partition(|r| r.is_ok());
        let frames = ok.into_iter().filter_map(|r| r.ok()).collect();
        let failed = failed.into_iter().filter_map(|r| r.err()).collect();
        (EnrichedVideo { frames }, failed)
    }

    /// Writes every frame with [`EnrichedFrame::export_with_prefixes`]; returns the failures.
    pub fn export(
        &self,
        output_dir: &Path,
        frame_prefix: &str,
        detection_prefix: &str,
        image_extension: &str,
    ) -> Vec<(u32, RectifyError)> {
        self.frames
            .par_iter()
            .filter_map(|f| {
                f.export_with_prefixes(output_dir, frame_prefix, detection_prefix, image_extension)
                    .err()
                    .map(|e| (f.index(), e))
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a EnrichedVideo {
    type Item = &'a EnrichedFrame;
    type IntoIter = std::slice::Iter<'a, EnrichedFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl IntoIterator for EnrichedVideo {
    type Item = EnrichedFrame;
    type IntoIter = std::vec::IntoIter<EnrichedFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}
