use glam::Vec2;
use image::RgbImage;
use nalgebra as na;
use planar_rectification::geometry::estimate_rigid_transform;
use planar_rectification::scene::{CameraInfo, ImageFeatures, SceneData, load_scenes};
use std::path::Path;

/// Renders a synthetic depth view of a tilted plane and its keypoints.
fn synthetic_scene(
    rotation: &na::Rotation3<f64>,
    translation: &na::Vector3<f64>,
    landmarks: &[na::Point3<f64>],
) -> SceneData {
    let (w, h, f) = (320u32, 240u32, 300.0);
    let (cx, cy) = ((w / 2) as f64, (h / 2) as f64);
    let rgb = RgbImage::from_pixel(w, h, image::Rgb([128, 128, 128]));
    let mut depth = na::DMatrix::<f32>::zeros(h as usize, w as usize);
    let mut confidence = na::DMatrix::<f32>::from_element(h as usize, w as usize, 0.2);

    let mut keypoints = Vec::new();
    let mut descriptors = Vec::new();
    for (i, p) in landmarks.iter().enumerate() {
        let pc = rotation * p + translation;
        let u = f * pc.x / pc.z + cx;
        let v = f * pc.y / pc.z + cy;
        let (col, row) = (u.floor() as usize, v.floor() as usize);
        if col >= w as usize || row >= h as usize || u < 0.0 || v < 0.0 {
            continue;
        }
        depth[(row, col)] = pc.z as f32;
        confidence[(row, col)] = 1.0;
        keypoints.push(Vec2::new(u as f32, v as f32));
        descriptors.push(vec![i as f32; 8]);
    }
    let features = ImageFeatures::new(keypoints, descriptors).unwrap();
    let camera = CameraInfo::new(rgb, depth, confidence, f).unwrap();
    SceneData::new(features, camera)
}

fn nearest(d: &[f32], candidates: &[Vec<f32>]) -> Option<usize> {
    let dist = |c: &Vec<f32>| d.iter().zip(c).map(|(a, b)| (a - b) * (a - b)).sum::<f32>();
    (0..candidates.len()).min_by(|&i, &j| dist(&candidates[i]).total_cmp(&dist(&candidates[j])))
}

/// Mutual nearest neighbours in descriptor space.
fn match_descriptors(f0: &ImageFeatures, f1: &ImageFeatures) -> Vec<(usize, usize)> {
    f0.descriptors()
        .iter()
        .enumerate()
        .filter_map(|(i, d0)| {
            let j = nearest(d0, f1.descriptors())?;
            (nearest(&f1.descriptors()[j], f0.descriptors()) == Some(i)).then_some((i, j))
        })
        .collect()
}

/// Usage: `align_scenes [<keypoints.json> <cameras.json>]`.
///
/// Without arguments two synthetic views of the same landmarks are aligned.
fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let (scene0, scene1) = if args.len() == 3 {
        let mut scenes = load_scenes(Path::new(&args[1]), Path::new(&args[2])).unwrap();
        assert!(scenes.len() >= 2, "need at least two scenes");
        let scene1 = scenes.swap_remove(1);
        (scenes.swap_remove(0), scene1)
    } else {
        let landmarks: Vec<na::Point3<f64>> = (0..40)
            .map(|i| {
                let a = i as f64 * 0.37;
                na::Point3::new(a.sin() * 1.5, a.cos() * 1.0, 4.0 + 0.5 * (a * 0.5).sin())
            })
            .collect();
        let r1 = na::Rotation3::from_euler_angles(0.02, -0.05, 0.1);
        let t1 = na::Vector3::new(0.2, -0.1, 0.3);
        println!("true rotation:\n{}", r1.matrix());
        println!("true translation: {}", t1.transpose());
        (
            synthetic_scene(&na::Rotation3::identity(), &na::Vector3::zeros(), &landmarks),
            synthetic_scene(&r1, &t1, &landmarks),
        )
    };

    let cloud = scene0.as_point_cloud(0.95);
    println!("scene 0 point cloud has {} points", cloud.len());

    let f0 = scene0.get_valid_keypoints_and_descriptors(0.95);
    let f1 = scene1.get_valid_keypoints_and_descriptors(0.95);
    let p0 = scene0.valid_keypoints_3d(0.95);
    let p1 = scene1.valid_keypoints_3d(0.95);

    let matches = match_descriptors(&f0, &f1);
    println!("{} matches", matches.len());

    let rt = estimate_rigid_transform(&matches, &p0, &p1).unwrap();
    println!("estimated rotation:\n{}", rt.rotation);
    println!("estimated translation: {}", rt.translation.transpose());
}
