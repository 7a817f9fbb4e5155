use image::ImageReader;
use nalgebra as na;
use planar_rectification::frame::EnrichedFrame;
use planar_rectification::types::{BoundingBox, Homography};

fn main() {
    let path = std::env::args().nth(1).unwrap_or("data/img_0001.jpg".to_string());
    let img = ImageReader::open(&path).unwrap().decode().unwrap().to_rgb8();
    let (w, h) = img.dimensions();
    let boxes = vec![BoundingBox::new(
        w as f64 * 0.4,
        h as f64 * 0.4,
        w as f64 * 0.6,
        h as f64 * 0.6,
    )];
    let frame = EnrichedFrame::new(img, boxes, 1);

    // rotate 90 degrees about the image center
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let m = na::Matrix3::new(0.0, -1.0, cx + cy, 1.0, 0.0, cy - cx, 0.0, 0.0, 1.0);
    let warped = frame.transform(&Homography::from_matrix(m)).unwrap();
    println!("box before: {:?}", frame.boxes()[0].xyxy());
    println!("box after: {:?}", warped.boxes()[0].xyxy());
    warped.image().save("warped.png").unwrap()
}
