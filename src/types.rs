use nalgebra as na;

use crate::error::{RectifyError, Result};

pub type Point2D = na::Point2<f64>;
pub type Point3D = na::Point3<f64>;

/// Axis-aligned box in pixel coordinates of its owning frame.
///
/// Always stored in (xmin, ymin, xmax, ymax) order with `xmin <= xmax` and `ymin <= ymax`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub id: Option<i64>,
    pub class: Option<u32>,
}

impl BoundingBox {
    /// Builds a box from two opposite corners, reordering them if needed.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox {
            xmin: x0.min(x1),
            ymin: y0.min(y1),
            xmax: x0.max(x1),
            ymax: y0.max(y1),
            id: None,
            class: None,
        }
    }

    pub fn from_xyxy(xyxy: &[f64; 4]) -> BoundingBox {
        Self::new(xyxy[0], xyxy[1], xyxy[2], xyxy[3])
    }

    pub fn with_labels(mut self, id: Option<i64>, class: Option<u32>) -> BoundingBox {
        self.id = id;
        self.class = class;
        self
    }

    pub fn xyxy(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    /// Corners in the order top-left, top-right, bottom-right, bottom-left (image axes).
    pub fn corners(&self) -> [Point2D; 4] {
        [
            Point2D::new(self.xmin, self.ymin),
            Point2D::new(self.xmax, self.ymin),
            Point2D::new(self.xmax, self.ymax),
            Point2D::new(self.xmin, self.ymax),
        ]
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Projective map between two image planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    mat: na::Matrix3<f64>,
}

impl Homography {
    pub fn identity() -> Homography {
        Homography {
            mat: na::Matrix3::identity(),
        }
    }

    /// Wraps a raw matrix without rescaling it.
    ///
    /// The result is unnormalized; use [`normalized`](Self::normalized) for matrices from
    /// untrusted sources.
    pub fn from_matrix(mat: na::Matrix3<f64>) -> Homography {
        Homography { mat }
    }

    /// Wraps a matrix scaled so that its bottom-right entry equals one.
    pub fn normalized(mat: na::Matrix3<f64>) -> Result<Homography> {
        let s = mat[(2, 2)];
        if s == 0.0 || !s.is_finite() {
            return Err(RectifyError::DegenerateHomography(s));
        }
        Ok(Homography { mat: mat / s })
    }

    /// Row-major constructor, unnormalized like [`from_matrix`](Self::from_matrix).
    pub fn from_rows(rows: &[[f64; 3]; 3]) -> Homography {
        Homography {
            mat: na::Matrix3::from_fn(|r, c| rows[r][c]),
        }
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.mat;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    pub fn matrix(&self) -> &na::Matrix3<f64> {
        &self.mat
    }

    pub fn try_inverse(&self) -> Result<Homography> {
        self.mat
            .try_inverse()
            .map(|mat| Homography { mat })
            .ok_or(RectifyError::SingularHomography)
    }
}

/// Rotation and translation with `rotation * p + translation` mapping the first set onto the second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: na::Matrix3<f64>,
    pub translation: na::Vector3<f64>,
}

impl RigidTransform {
    pub fn new(rotation: na::Matrix3<f64>, translation: na::Vector3<f64>) -> RigidTransform {
        RigidTransform {
            rotation,
            translation,
        }
    }

    pub fn apply(&self, p: &Point3D) -> Point3D {
        Point3D::from(self.rotation * p.coords + self.translation)
    }

    pub fn to_na_isometry3(&self) -> na::Isometry3<f64> {
        let rotation = na::Rotation3::from_matrix_unchecked(self.rotation);
        na::Isometry3::from_parts(
            na::Translation3::from(self.translation),
            na::UnitQuaternion::from_rotation_matrix(&rotation),
        )
    }
}

/// Planar counterpart of [`RigidTransform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform2 {
    pub rotation: na::Matrix2<f64>,
    pub translation: na::Vector2<f64>,
}

impl RigidTransform2 {
    pub fn apply(&self, p: &Point2D) -> Point2D {
        Point2D::from(self.rotation * p.coords + self.translation)
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.rotation[(1, 0)].atan2(self.rotation[(0, 0)])
    }
}
