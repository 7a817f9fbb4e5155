use std::path::PathBuf;

/// Errors raised while estimating, warping, loading or persisting rectification data.
#[derive(thiserror::Error, Debug)]
pub enum RectifyError {
    /// Fewer than four point pairs were handed to the homography estimator.
    #[error("at least {required} correspondences are required, got {got}")]
    InsufficientCorrespondences { required: usize, got: usize },

    /// Source and destination point lists have different lengths.
    #[error("source has {src} points but destination has {dst}")]
    CorrespondenceMismatch { src: usize, dst: usize },

    /// The homogeneous scale of a transformed point is zero.
    #[error("point ({x}, {y}) maps to the line at infinity")]
    DegenerateProjection { x: f64, y: f64 },

    /// The estimated homography has a zero bottom-right entry and cannot be normalized.
    #[error("estimated homography cannot be normalized, H[2][2] = {0}")]
    DegenerateHomography(f64),

    /// The homography has no inverse, so backward warping is impossible.
    #[error("homography is singular")]
    SingularHomography,

    /// Too few matched pairs for rigid alignment.
    #[error("at least {required} matches are required, got {got}")]
    InsufficientMatches { required: usize, got: usize },

    /// A match references a keypoint that does not exist.
    #[error("match index {index} is out of range for {len} keypoints")]
    InvalidMatch { index: usize, len: usize },

    /// A frame or detection artifact is missing or cannot be parsed.
    #[error("missing or unreadable artifact {path:?}: {reason}")]
    MissingArtifact { path: PathBuf, reason: String },

    /// A pixel lookup fell outside a depth or confidence map.
    #[error("pixel ({u}, {v}) is outside a {width}x{height} map")]
    OutOfBounds {
        u: i64,
        v: i64,
        width: usize,
        height: usize,
    },

    /// Two buffers that must share a shape do not.
    #[error("{what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: String,
        got: String,
    },

    /// Pinhole back-projection needs a positive, finite focal length.
    #[error("focal length must be positive, got {0}")]
    InvalidFocalLength(f64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, RectifyError>;
