use image::RgbImage;
use nalgebra as na;

use crate::error::{RectifyError, Result};
use crate::types::{BoundingBox, Homography, Point2D};

/// Maps a point through `h` and divides by the homogeneous scale.
///
/// Fails only when the scale is exactly zero or the result is not finite.
pub fn warp_point(p: &Point2D, h: &Homography) -> Result<Point2D> {
    let q = h.matrix() * na::Vector3::new(p.x, p.y, 1.0);
    let degenerate = || RectifyError::DegenerateProjection { x: p.x, y: p.y };
    if q.z == 0.0 || !q.z.is_finite() {
        return Err(degenerate());
    }
    let warped = Point2D::new(q.x / q.z, q.y / q.z);
    if !(warped.x.is_finite() && warped.y.is_finite()) {
        return Err(degenerate());
    }
    Ok(warped)
}

/// Maps all four corners of `bbox` and returns their axis-aligned hull.
///
/// Labels are carried over unchanged.
pub fn warp_bounding_box(bbox: &BoundingBox, h: &Homography) -> Result<BoundingBox> {
    let mut xmin = f64::INFINITY;
    let mut ymin = f64::INFINITY;
    let mut xmax = f64::NEG_INFINITY;
    let mut ymax = f64::NEG_INFINITY;
    for corner in bbox.corners() {
        let p = warp_point(&corner, h)?;
        xmin = xmin.min(p.x);
        ymin = ymin.min(p.y);
        xmax = xmax.max(p.x);
        ymax = ymax.max(p.y);
    }
    Ok(BoundingBox::new(xmin, ymin, xmax, ymax).with_labels(bbox.id, bbox.class))
}

/// Pre-image of a destination pixel, truncated toward zero.
///
/// `None` when the pixel maps to infinity or outside `(width, height)`.
#[inline]
fn source_pixel(h_inv: &na::Matrix3<f64>, x: u32, y: u32, width: u32, height: u32) -> Option<(u32, u32)> {
    let q = h_inv * na::Vector3::new(x as f64, y as f64, 1.0);
    let xs = (q.x / q.z).trunc();
    let ys = (q.y / q.z).trunc();
    if !xs.is_finite() || !ys.is_finite() {
        return None;
    }
    if xs >= 0.0 && xs < width as f64 && ys >= 0.0 && ys < height as f64 {
        Some((xs as u32, ys as u32))
    } else {
        None
    }
}

/// Backward-warps `src` through `h` into a new image of `output_size` (width, height).
///
/// Every destination pixel is mapped through `h^-1` and takes the value of the source
/// pixel it lands on (nearest neighbour by truncation). Pixels with no pre-image
/// inside `src` stay black. Rows are filled in parallel.
pub fn warp_image(src: &RgbImage, h: &Homography, output_size: (u32, u32)) -> Result<RgbImage> {
    let h_inv = *h.try_inverse()?.matrix();
    let (src_w, src_h) = src.dimensions();
    let (out_w, out_h) = output_size;
    let out = RgbImage::from_par_fn(out_w, out_h, |x, y| {
        match source_pixel(&h_inv, x, y, src_w, src_h) {
            Some((xs, ys)) => *src.get_pixel(xs, ys),
            None => image::Rgb([0, 0, 0]),
        }
    });
    Ok(out)
}
