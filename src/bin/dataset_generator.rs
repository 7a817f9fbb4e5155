use clap::{Parser, Subcommand};
use image::{Rgb, RgbImage};
use nalgebra as na;
use planar_rectification::detections::DetectionSet;
use planar_rectification::geometry::{warp_image, warp_point};
use planar_rectification::io::{self, Correspondences};
use planar_rectification::types::{BoundingBox, Homography, Point2D};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic rectification dataset
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Ground-truth frame-to-map homography JSON ({"H": [[..], [..], [..]]})
        #[arg(long)]
        homography: Option<String>,

        /// Number of frames to generate
        #[arg(short, long, default_value = "20")]
        num_frames: u32,

        /// Number of correspondences to write
        #[arg(long, default_value = "12")]
        num_correspondences: usize,

        /// Uniform noise amplitude added to destination points, in pixels
        #[arg(long, default_value = "0.0")]
        noise: f64,

        /// Image width
        #[arg(long, default_value = "640", value_parser = clap::value_parser!(u32).range(1..))]
        width: u32,

        /// Image height
        #[arg(long, default_value = "480", value_parser = clap::value_parser!(u32).range(1..))]
        height: u32,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            output,
            homography,
            num_frames,
            num_correspondences,
            noise,
            width,
            height,
            seed,
        } => {
            let h = match homography {
                Some(path) => io::load_homography(Path::new(&path))?,
                None => default_homography(width, height),
            };
            generate_dataset(
                Path::new(&output),
                &h,
                num_frames,
                num_correspondences,
                noise,
                (width, height),
                seed,
            )?;
        }
    }

    Ok(())
}

/// A mild top-down tilt that keeps the frame inside a map of the same size.
fn default_homography(width: u32, height: u32) -> Homography {
    let (w, h) = (width as f64, height as f64);
    Homography::from_matrix(na::Matrix3::new(
        0.9,
        -0.15,
        0.1 * w,
        0.05,
        0.7,
        0.05 * h,
        0.0,
        0.4 / h,
        1.0,
    ))
}

/// Checkerboard with a colored grid so rectification is easy to check by eye.
fn checker_map(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let cell = ((x / 32) + (y / 32)) % 2;
        let base = if cell == 0 { 60 } else { 200 };
        Rgb([base, (x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8])
    })
}

fn draw_box(img: &mut RgbImage, b: &BoundingBox, color: Rgb<u8>) {
    let x0 = b.xmin.max(0.0) as u32;
    let y0 = b.ymin.max(0.0) as u32;
    let x1 = (b.xmax as u32).min(img.width().saturating_sub(1));
    let y1 = (b.ymax as u32).min(img.height().saturating_sub(1));
    for y in y0..=y1 {
        for x in x0..=x1 {
            img.put_pixel(x, y, color);
        }
    }
}

/// A random box of at least 8 px per side whose top-left corner lies in the image.
fn random_box<R: Rng>(rng: &mut R, width: u32, height: u32, id: i64) -> BoundingBox {
    let (w, h) = (width as f64, height as f64);
    let x = rng.random_range(0.0..w * 0.8);
    let y = rng.random_range(0.0..h * 0.8);
    let bw = rng.random_range(8.0..(w * 0.2).max(9.0));
    let bh = rng.random_range(8.0..(h * 0.2).max(9.0));
    BoundingBox::new(x, y, x + bw, y + bh).with_labels(Some(id), Some(rng.random_range(0..3u32)))
}

fn generate_dataset(
    output_dir: &Path,
    h: &Homography,
    num_frames: u32,
    num_correspondences: usize,
    noise: f64,
    size: (u32, u32),
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let (width, height) = size;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    std::fs::create_dir_all(output_dir)?;

    let map = checker_map(width, height);
    map.save(output_dir.join("map.png"))?;
    io::save_homography(&output_dir.join("ground_truth.json"), h)?;

    // a frame pixel p shows the map at H * p
    let background = warp_image(&map, &h.try_inverse()?, size)?;

    for frame_idx in 1..=num_frames {
        let mut frame = background.clone();
        let num_boxes = rng.random_range(0..4usize);
        let boxes: Vec<BoundingBox> = (0..num_boxes)
            .map(|i| random_box(&mut rng, width, height, i as i64))
            .collect();
        for b in &boxes {
            let c = b.class.unwrap_or(0) as u8;
            draw_box(&mut frame, b, Rgb([255, 80 * c, 255 - 80 * c]));
        }
        frame.save(output_dir.join(format!("img_{:04}.jpg", frame_idx)))?;
        if !boxes.is_empty() {
            let path = output_dir.join(format!("yolo_{:04}.json", frame_idx));
            io::object_to_json(&path, &DetectionSet::from_boxes(&boxes))?;
        }
    }

    let (src, dst): (Vec<Point2D>, Vec<Point2D>) = (0..num_correspondences)
        .filter_map(|_| {
            let p = Point2D::new(
                rng.random_range(0.0..width as f64),
                rng.random_range(0.0..height as f64),
            );
            let q = warp_point(&p, h).ok()?;
            let jitter = na::Vector2::new(
                rng.random_range(-1.0..=1.0) * noise,
                rng.random_range(-1.0..=1.0) * noise,
            );
            Some((p, q + jitter))
        })
        .unzip();
    io::save_correspondences(
        &output_dir.join("kp_gmaps.json"),
        "kp_gmaps",
        &Correspondences { src, dst },
    )?;

    log::info!(
        "generated {} frames in {}",
        num_frames,
        output_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_box_fits_small_images() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for (width, height) in [(1, 1), (16, 12), (40, 40), (640, 480)] {
            for id in 0..20 {
                let b = random_box(&mut rng, width, height, id);
                assert!(b.xmin >= 0.0 && b.xmin < width as f64);
                assert!(b.ymin >= 0.0 && b.ymin < height as f64);
                assert!(b.width() > 8.0 - 1e-9 && b.height() > 8.0 - 1e-9);
                assert_eq!(b.id, Some(id));
            }
        }
    }

    #[test]
    fn generate_small_dataset() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let h = default_homography(24, 20);
        generate_dataset(temp_dir.path(), &h, 3, 8, 0.0, (24, 20), 1).unwrap();
        assert!(temp_dir.path().join("map.png").exists());
        assert!(temp_dir.path().join("img_0003.jpg").exists());
        let c = io::load_correspondences(&temp_dir.path().join("kp_gmaps.json"), "kp_gmaps").unwrap();
        assert_eq!(c.len(), 8);
    }
}
