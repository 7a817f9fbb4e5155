use serde::{Deserialize, Serialize};

use crate::types::BoundingBox;

/// On-disk detection record.
///
/// `xyxy` is always present; `id` and `class`, when present, run parallel to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    pub xyxy: Vec<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<Vec<u32>>,
}

impl DetectionSet {
    /// Checks that the optional label arrays match the box count.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.xyxy.len();
        if let Some(ids) = &self.id {
            if ids.len() != n {
                return Err(format!("{} ids for {} boxes", ids.len(), n));
            }
        }
        if let Some(classes) = &self.class {
            if classes.len() != n {
                return Err(format!("{} classes for {} boxes", classes.len(), n));
            }
        }
        Ok(())
    }

    pub fn to_boxes(&self) -> Vec<BoundingBox> {
        self.xyxy
            .iter()
            .enumerate()
            .map(|(i, xyxy)| {
                let id = self.id.as_ref().and_then(|ids| ids.get(i).copied());
                let class = self.class.as_ref().and_then(|c| c.get(i).copied());
                BoundingBox::from_xyxy(xyxy).with_labels(id, class)
            })
            .collect()
    }

    /// Packs boxes back into a record; label arrays are emitted only when every box has one.
    pub fn from_boxes(boxes: &[BoundingBox]) -> DetectionSet {
        let xyxy = boxes.iter().map(BoundingBox::xyxy).collect();
        let id = boxes.iter().map(|b| b.id).collect::<Option<Vec<_>>>();
        let class = boxes.iter().map(|b| b.class).collect::<Option<Vec<_>>>();
        let labelled = !boxes.is_empty();
        DetectionSet {
            xyxy,
            id: id.filter(|_| labelled),
            class: class.filter(|_| labelled),
        }
    }

    pub fn len(&self) -> usize {
        self.xyxy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xyxy.is_empty()
    }
}
