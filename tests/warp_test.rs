use image::{Rgb, RgbImage};
use nalgebra as na;
use planar_rectification::RectifyError;
use planar_rectification::geometry::{warp_bounding_box, warp_image, warp_point};
use planar_rectification::types::{BoundingBox, Homography, Point2D};

fn perspective() -> Homography {
    Homography::from_matrix(na::Matrix3::new(
        1.1, 0.2, -4.0, -0.1, 0.9, 7.0, 0.002, -0.001, 1.0,
    ))
}

fn test_image(w: u32, h: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| Rgb([x as u8 * 10, y as u8 * 20, (x + y) as u8]))
}

#[test]
fn test_warp_point_round_trip() {
    let h = perspective();
    let h_inv = h.try_inverse().unwrap();
    for p in [
        Point2D::new(0.0, 0.0),
        Point2D::new(12.5, -3.0),
        Point2D::new(320.0, 240.0),
        Point2D::new(-50.0, 80.0),
    ] {
        let q = warp_point(&p, &h).unwrap();
        let back = warp_point(&q, &h_inv).unwrap();
        assert!((back - p).norm() < 1e-9, "{} -> {} -> {}", p, q, back);
    }
}

#[test]
fn test_warp_point_at_infinity() {
    // w = x - 1, zero on the line x = 1
    let h = Homography::from_matrix(na::Matrix3::new(
        1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, -1.0,
    ));
    let err = warp_point(&Point2D::new(1.0, 5.0), &h).unwrap_err();
    assert!(matches!(err, RectifyError::DegenerateProjection { .. }));
    assert!(warp_point(&Point2D::new(2.0, 5.0), &h).is_ok());
}

#[test]
fn test_warp_box_rotation_keeps_order() {
    // 90 degree rotation: (x, y) -> (-y, x)
    let rot = Homography::from_matrix(na::Matrix3::new(
        0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ));
    let b = BoundingBox::new(1.0, 2.0, 3.0, 5.0).with_labels(Some(7), Some(2));
    let w = warp_bounding_box(&b, &rot).unwrap();
    assert!(w.xmin <= w.xmax && w.ymin <= w.ymax);
    let expected = [-5.0, 1.0, -2.0, 3.0];
    for (got, want) in w.xyxy().iter().zip(expected) {
        assert!((got - want).abs() < 1e-12);
    }
    assert_eq!(w.id, Some(7));
    assert_eq!(w.class, Some(2));
}

#[test]
fn test_warp_box_is_hull_of_corners() {
    let h = perspective();
    let b = BoundingBox::new(10.0, 20.0, 60.0, 45.0);
    let w = warp_bounding_box(&b, &h).unwrap();
    assert!(w.xmin <= w.xmax && w.ymin <= w.ymax);
    for c in b.corners() {
        let p = warp_point(&c, &h).unwrap();
        assert!(p.x >= w.xmin - 1e-9 && p.x <= w.xmax + 1e-9);
        assert!(p.y >= w.ymin - 1e-9 && p.y <= w.ymax + 1e-9);
    }
}

#[test]
fn test_warp_box_mirror() {
    let mirror = Homography::from_matrix(na::Matrix3::new(
        -1.0, 0.0, 10.0, 0.0, -1.0, 10.0, 0.0, 0.0, 1.0,
    ));
    let w = warp_bounding_box(&BoundingBox::new(1.0, 2.0, 4.0, 3.0), &mirror).unwrap();
    assert_eq!(w.xyxy(), [6.0, 7.0, 9.0, 8.0]);
}

#[test]
fn test_warp_image_identity_is_exact() {
    let img = test_image(7, 5);
    let out = warp_image(&img, &Homography::identity(), img.dimensions()).unwrap();
    assert_eq!(out, img);
}

#[test]
fn test_warp_image_translation() {
    let img = test_image(6, 4);
    let shift = Homography::from_matrix(na::Matrix3::new(
        1.0, 0.0, 2.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0,
    ));
    let out = warp_image(&img, &shift, (6, 4)).unwrap();
    for y in 0..4 {
        for x in 0..6 {
            let px = *out.get_pixel(x, y);
            if x >= 2 && y >= 1 {
                assert_eq!(px, *img.get_pixel(x - 2, y - 1));
            } else {
                assert_eq!(px, Rgb([0, 0, 0]));
            }
        }
    }
}

#[test]
fn test_warp_image_output_size() {
    let img = test_image(6, 4);
    let out = warp_image(&img, &Homography::identity(), (9, 2)).unwrap();
    assert_eq!(out.dimensions(), (9, 2));
    assert_eq!(*out.get_pixel(5, 1), *img.get_pixel(5, 1));
    assert_eq!(*out.get_pixel(8, 0), Rgb([0, 0, 0]));
}

#[test]
fn test_warp_image_singular() {
    let img = test_image(3, 3);
    let singular = Homography::from_matrix(na::Matrix3::zeros());
    let err = warp_image(&img, &singular, (3, 3)).unwrap_err();
    assert!(matches!(err, RectifyError::SingularHomography));
}

#[test]
fn test_warp_point_tiny_scale_is_not_degenerate() {
    // w = 1e-3 * x + 1 is about 1.1e-16 here, small but not zero
    let h = Homography::from_matrix(na::Matrix3::new(
        1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1e-3, 0.0, 1.0,
    ));
    let q = warp_point(&Point2D::new(-999.9999999999999, 0.0), &h).unwrap();
    assert!(q.x.is_finite() && q.x.abs() > 1e15);
    assert_eq!(q.y, 0.0);
}
