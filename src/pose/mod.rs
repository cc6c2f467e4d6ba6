pub mod estimator;
pub mod keypoint;
pub mod named;

pub use estimator::{ModelArchitecture, ModelLoader, PoseEstimator};
pub use keypoint::{Keypoint, PartName, Pose};
pub use named::NamedKeypoints;
