use log::debug;
use nalgebra as na;

use crate::error::{RectifyError, Result};
use crate::types::{Point2D, Point3D, RigidTransform, RigidTransform2};

/// Fewer matches than this leave the rotation underdetermined.
pub const MIN_MATCHES: usize = 3;

/// Gathers the matched rows of both keypoint sets as `n x dim` matrices.
fn gather_matched<const D: usize>(
    matches: &[(usize, usize)],
    keypoints1: &[[f64; D]],
    keypoints2: &[[f64; D]],
) -> Result<(na::DMatrix<f64>, na::DMatrix<f64>)> {
    if matches.len() < MIN_MATCHES {
        return Err(RectifyError::InsufficientMatches {
            required: MIN_MATCHES,
            got: matches.len(),
        });
    }
    let mut m1 = na::DMatrix::<f64>::zeros(matches.len(), D);
    let mut m2 = na::DMatrix::<f64>::zeros(matches.len(), D);
    for (row, &(i, j)) in matches.iter().enumerate() {
        let p1 = keypoints1.get(i).ok_or(RectifyError::InvalidMatch {
            index: i,
            len: keypoints1.len(),
        })?;
        let p2 = keypoints2.get(j).ok_or(RectifyError::InvalidMatch {
            index: j,
            len: keypoints2.len(),
        })?;
        for c in 0..D {
            m1[(row, c)] = p1[c];
            m2[(row, c)] = p2[c];
        }
    }
    Ok((m1, m2))
}

fn centroid(points: &na::DMatrix<f64>) -> na::DVector<f64> {
    points.row_mean().transpose()
}

/// Procrustes alignment of two `n x dim` point matrices.
///
/// Returns `(R, t)` with `R * p1 + t ~ p2` and `det(R) = +1`.
fn procrustes(m1: &na::DMatrix<f64>, m2: &na::DMatrix<f64>) -> Result<(na::DMatrix<f64>, na::DVector<f64>)> {
    let c1 = centroid(m1);
    let c2 = centroid(m2);

    let mut centered1 = m1.clone();
    let mut centered2 = m2.clone();
    for mut row in centered1.row_iter_mut() {
        row -= c1.transpose();
    }
    for mut row in centered2.row_iter_mut() {
        row -= c2.transpose();
    }

    let cross_cov = centered1.transpose() * &centered2;
    let svd = cross_cov.svd(true, true);
    let (u, mut v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(RectifyError::InsufficientMatches {
                required: MIN_MATCHES,
                got: m1.nrows(),
            });
        }
    };

    let mut r = v_t.transpose() * u.transpose();
    if r.determinant() < 0.0 {
        debug!("procrustes produced a reflection, flipping the last singular vector");
        let last = v_t.nrows() - 1;
        let mut row = v_t.row_mut(last);
        row *= -1.0;
        r = v_t.transpose() * u.transpose();
    }
    let t = &c2 - &r * &c1;
    Ok((r, t))
}

/// Estimates the rotation and translation taking `keypoints1` onto `keypoints2`.
///
/// `matches` holds `(index into keypoints1, index into keypoints2)` pairs. The result
/// minimizes the summed squared distance between `R * p1 + t` and `p2` and is always a
/// proper rotation.
pub fn estimate_rigid_transform(
    matches: &[(usize, usize)],
    keypoints1: &[Point3D],
    keypoints2: &[Point3D],
) -> Result<RigidTransform> {
    let k1: Vec<[f64; 3]> = keypoints1.iter().map(|p| [p.x, p.y, p.z]).collect();
    let k2: Vec<[f64; 3]> = keypoints2.iter().map(|p| [p.x, p.y, p.z]).collect();
    let (m1, m2) = gather_matched(matches, &k1, &k2)?;
    let (r, t) = procrustes(&m1, &m2)?;
    Ok(RigidTransform::new(
        na::Matrix3::from_fn(|i, j| r[(i, j)]),
        na::Vector3::new(t[0], t[1], t[2]),
    ))
}

/// Planar variant of [`estimate_rigid_transform`].
pub fn estimate_rigid_transform_2d(
    matches: &[(usize, usize)],
    keypoints1: &[Point2D],
    keypoints2: &[Point2D],
) -> Result<RigidTransform2> {
    let k1: Vec<[f64; 2]> = keypoints1.iter().map(|p| [p.x, p.y]).collect();
    let k2: Vec<[f64; 2]> = keypoints2.iter().map(|p| [p.x, p.y]).collect();
    let (m1, m2) = gather_matched(matches, &k1, &k2)?;
    let (r, t) = procrustes(&m1, &m2)?;
    Ok(RigidTransform2 {
        rotation: na::Matrix2::from_fn(|i, j| r[(i, j)]),
        translation: na::Vector2::new(t[0], t[1]),
    })
}
