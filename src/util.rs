use std::path::Path;

/// Extracts the frame index from an identifier such as `img_0042.jpg` or `yolo_7.json`.
///
/// The index is the run of digits between the last underscore and the period that
/// follows it. Returns `None` when there is no such run.
pub fn extract_frame_index(identifier: &str) -> Option<u32> {
    let name = Path::new(identifier)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(identifier);
    let after_underscore = &name[name.rfind('_')? + 1..];
    let digits = &after_underscore[..after_underscore.find('.')?];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Zero-based image index from a record key such as `img3` or `scene_img12`.
///
/// The first run of digits after `img` is read as a one-based number. `img0` and keys
/// without such a run give `None`.
pub fn extract_image_number(key: &str) -> Option<usize> {
    key.match_indices("img").find_map(|(start, _)| {
        let rest = &key[start + 3..];
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        rest[..end].parse::<usize>().ok()?.checked_sub(1)
    })
}

/// File name of an identifier, or the identifier itself when it has none.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Largest finite value, `None` when there is none or it is not positive.
pub fn positive_max(values: impl Iterator<Item = f32>) -> Option<f32> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |m| m.max(v))))
        .filter(|m| *m > 0.0)
}
