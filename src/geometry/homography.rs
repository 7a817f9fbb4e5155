use log::{debug, warn};
use nalgebra as na;

use crate::error::{RectifyError, Result};
use crate::geometry::warp::warp_point;
use crate::types::{Homography, Point2D};

pub const MIN_CORRESPONDENCES: usize = 4;

/// Stacks the two DLT rows of every correspondence.
///
/// The matrix always has at least 9 rows so that a thin SVD still yields the full
/// right-singular basis; the padding rows are zero and leave the solution unchanged.
fn dlt_matrix(src_points: &[Point2D], dst_points: &[Point2D]) -> na::DMatrix<f64> {
    let rows = (2 * src_points.len()).max(9);
    let mut a = na::DMatrix::<f64>::zeros(rows, 9);
    for (k, (p, p_prime)) in src_points.iter().zip(dst_points).enumerate() {
        let (x, y) = (p.x, p.y);
        let (x_p, y_p) = (p_prime.x, p_prime.y);

        let r = 2 * k;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -x_p * x;
        a[(r, 7)] = -x_p * y;
        a[(r, 8)] = -x_p;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -y_p * x;
        a[(r + 1, 7)] = -y_p * y;
        a[(r + 1, 8)] = -y_p;
    }
    a
}

/// Estimates the homography mapping `src_points[i]` onto `dst_points[i]` with the
/// Direct Linear Transform.
///
/// The nine coefficients are the right-singular vector of the DLT matrix with the
/// smallest singular value, reshaped row-major and scaled so that `H[2][2] == 1`.
/// With noisy input this is the least-squares solution of the algebraic error under a
/// unit-norm constraint.
///
/// Degenerate configurations (collinear or repeated points) are not detected here and
/// may produce an ill-conditioned matrix.
pub fn estimate_homography(src_points: &[Point2D], dst_points: &[Point2D]) -> Result<Homography> {
    if src_points.len() != dst_points.len() {
        return Err(RectifyError::CorrespondenceMismatch {
            src: src_points.len(),
            dst: dst_points.len(),
        });
    }
    if src_points.len() < MIN_CORRESPONDENCES {
        return Err(RectifyError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            got: src_points.len(),
        });
    }

    let a = dlt_matrix(src_points, dst_points);
    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(RectifyError::DegenerateHomography(f64::NAN))?;
    let smallest = svd.singular_values.imin();
    debug!(
        "dlt singular values {:?}, using index {}",
        svd.singular_values.as_slice(),
        smallest
    );
    let h = v_t.row(smallest);
    let mat = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let homography = Homography::normalized(mat)?;
    let det = homography.matrix().determinant();
    if det.abs() < 1e-12 {
        warn!("estimated homography is close to singular (det = {:e})", det);
    }
    Ok(homography)
}

/// Mean Euclidean distance between `H * src` and `dst` over all correspondences.
///
/// Points that map to infinity are skipped.
pub fn reprojection_error(h: &Homography, src_points: &[Point2D], dst_points: &[Point2D]) -> f64 {
    let dists: Vec<f64> = src_points
        .iter()
        .zip(dst_points)
        .filter_map(|(p, q)| warp_point(p, h).ok().map(|w| (w - q).norm()))
        .collect();
    if dists.is_empty() {
        return f64::NAN;
    }
    dists.iter().sum::<f64>() / dists.len() as f64
}
