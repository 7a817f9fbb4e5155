pub mod homography;
pub mod rigid;
pub mod warp;

pub use homography::*;
pub use rigid::*;
pub use warp::*;
