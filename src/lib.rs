pub mod config;
pub mod data_loader;
pub mod detections;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod io;
pub mod pipeline;
pub mod scene;
pub mod types;
pub mod util;
pub mod video;

pub use error::{RectifyError, Result};
