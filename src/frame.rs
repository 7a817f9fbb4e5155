use std::path::Path;

use image::RgbImage;
use log::warn;

use crate::detections::DetectionSet;
use crate::error::{RectifyError, Result};
use crate::geometry::{warp_bounding_box, warp_image};
use crate::io;
use crate::types::{BoundingBox, Homography};

/// One video frame together with the detections found in it.
///
/// A frame without boxes is a valid "no detections" frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedFrame {
    image: RgbImage,
    boxes: Vec<BoundingBox>,
    index: u32,
}

impl EnrichedFrame {
    pub fn new(image: RgbImage, boxes: Vec<BoundingBox>, index: u32) -> EnrichedFrame {
        EnrichedFrame {
            image,
            boxes,
            index,
        }
    }

    /// Reads the frame image and, when given, its detection record.
    ///
    /// An unreadable image is an error. A missing or malformed detection record only
    /// downgrades the frame to having no detections.
    pub fn from_paths(
        image_path: &Path,
        detection_path: Option<&Path>,
        index: u32,
    ) -> Result<EnrichedFrame> {
        let image = image::open(image_path)
            .map_err(|e| RectifyError::MissingArtifact {
                path: image_path.to_path_buf(),
                reason: e.to_string(),
            })?
            .to_rgb8();
        let boxes = match detection_path {
            Some(path) => match io::load_detections(path) {
                Ok(detections) => detections.to_boxes(),
                Err(e) => {
                    warn!("frame {}: ignoring detections, {}", index, e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Ok(EnrichedFrame::new(image, boxes, index))
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn has_detections(&self) -> bool {
        !self.boxes.is_empty()
    }

    pub fn detections(&self) -> DetectionSet {
        DetectionSet::from_boxes(&self.boxes)
    }

    /// Warps image and boxes through `h`, keeping the frame's own size.
    pub fn transform(&self, h: &Homography) -> Result<EnrichedFrame> {
        self.transform_to_size(h, self.image.dimensions())
    }

    /// Warps image and boxes through `h` into an output of `output_size` (width, height).
    pub fn transform_to_size(&self, h: &Homography, output_size: (u32, u32)) -> Result<EnrichedFrame> {
        let image = warp_image(&self.image, h, output_size)?;
        let boxes = self
            .boxes
            .iter()
            .map(|b| warp_bounding_box(b, h))
            .collect::<Result<Vec<_>>>()?;
        Ok(EnrichedFrame::new(image, boxes, self.index))
    }

    /// Writes `img_<n>.<ext>` and, if there are detections, `yolo_<n>.json` into `output_dir`.
    pub fn export(&self, output_dir: &Path, image_extension: &str) -> Result<()> {
        self.export_with_prefixes(output_dir, "img_", "yolo_", image_extension)
    }

    pub fn export_with_prefixes(
        &self,
        output_dir: &Path,
        frame_prefix: &str,
        detection_prefix: &str,
        image_extension: &str,
    ) -> Result<()> {
        if self.has_detections() {
            let path = output_dir.join(format!("{}{}.json", detection_prefix, self.index));
            io::object_to_json(&path, &self.detections())?;
        }
        let path = output_dir.join(format!("{}{}.{}", frame_prefix, self.index, image_extension));
        self.image.save(path)?;
        Ok(())
    }
}
