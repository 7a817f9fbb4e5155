use clap::Parser;
use planar_rectification::config::PipelineConfig;
use planar_rectification::pipeline;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct RectifyCli {
    /// JSON config file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// path to the keypoint matches file (N x 4: src_x, src_y, dst_x, dst_y)
    #[arg(short = 'k', long)]
    keypoint_matches: Option<PathBuf>,

    /// field of the keypoint matches file holding the array
    #[arg(long)]
    correspondence_key: Option<String>,

    /// top-down reference map image
    #[arg(short = 'm', long)]
    map: Option<PathBuf>,

    /// directory containing img_<n> frames and yolo_<n>.json detections
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// directory receiving rectified frames, detections and the homography
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// warp frames to the map size instead of their own size
    #[arg(long)]
    fit_to_map: bool,
}

impl RectifyCli {
    fn into_config(self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(p) = self.keypoint_matches {
            config.keypoint_matches = p;
        }
        if let Some(k) = self.correspondence_key {
            config.correspondence_key = k;
        }
        if let Some(m) = self.map {
            config.map_image = Some(m);
        }
        if let Some(i) = self.input_dir {
            config.input_dir = i;
        }
        if let Some(o) = self.output_dir {
            config.output_dir = o;
        }
        config.fit_to_map |= self.fit_to_map;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = RectifyCli::parse().into_config()?;
    let now = Instant::now();
    let report = pipeline::run(&config)?;
    let duration_sec = now.elapsed().as_secs_f64();
    println!(
        "{} frames ({} with detections), {} exported, {} failed",
        report.frames,
        report.frames_with_detections,
        report.frames_exported,
        report.failed_frames.len()
    );
    println!("rectification took {:.6} sec", duration_sec);
    if report.frames > 0 {
        println!("avg: {} sec", duration_sec / report.frames as f64);
    }
    Ok(())
}
