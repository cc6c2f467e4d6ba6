//! Pose-estimation collaborator interface.
//!
//! The model itself lives outside this crate; the render loop only sees
//! these traits. Inference may suspend, so both entry points are async.

use anyhow::Result;
use serde::Deserialize;

use super::keypoint::Pose;
use crate::video::VideoFrame;

/// MobileNet 系アーキテクチャ。1.01 が最大・最低速、0.50 が最速・低精度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ModelArchitecture {
    #[serde(rename = "0.50")]
    MobileNet050,
    #[serde(rename = "0.75")]
    MobileNet075,
    #[serde(rename = "1.00")]
    MobileNet100,
    #[default]
    #[serde(rename = "1.01")]
    MobileNet101,
}

impl ModelArchitecture {
    pub fn multiplier(&self) -> f32 {
        match self {
            Self::MobileNet050 => 0.50,
            Self::MobileNet075 => 0.75,
            Self::MobileNet100 => 1.00,
            Self::MobileNet101 => 1.01,
        }
    }
}

impl std::fmt::Display for ModelArchitecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.multiplier())
    }
}

/// A loaded pose-estimation model.
///
/// `mirror` tells the model to report keypoints in a horizontally flipped
/// coordinate frame (webcam convention). Overlay math downstream assumes
/// the keypoints already live in that frame.
#[allow(async_fn_in_trait)]
pub trait PoseEstimator {
    async fn estimate_single_pose(
        &mut self,
        frame: &VideoFrame,
        image_scale_factor: f32,
        mirror: bool,
        output_stride: u32,
    ) -> Result<Pose>;

    #[allow(clippy::too_many_arguments)]
    async fn estimate_multiple_poses(
        &mut self,
        frame: &VideoFrame,
        image_scale_factor: f32,
        mirror: bool,
        output_stride: u32,
        max_poses: usize,
        min_part_confidence: f32,
        nms_radius: f32,
    ) -> Result<Vec<Pose>>;
}

/// Loads model weights for a given architecture.
///
/// Used once at startup and again on every hot-swap request. A failed
/// load must leave no half-initialized state behind; the caller keeps
/// the previous estimator in that case.
#[allow(async_fn_in_trait)]
pub trait ModelLoader {
    type Estimator: PoseEstimator;

    async fn load(&self, architecture: ModelArchitecture) -> Result<Self::Estimator>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier() {
        assert_eq!(ModelArchitecture::MobileNet050.multiplier(), 0.50);
        assert_eq!(ModelArchitecture::MobileNet101.multiplier(), 1.01);
    }

    #[test]
    fn test_default_is_largest() {
        assert_eq!(ModelArchitecture::default(), ModelArchitecture::MobileNet101);
    }

    #[test]
    fn test_deserialize_wire_format() {
        #[derive(Deserialize)]
        struct Wrap {
            arch: ModelArchitecture,
        }
        let w: Wrap = toml::from_str("arch = \"0.50\"").unwrap();
        assert_eq!(w.arch, ModelArchitecture::MobileNet050);
    }
}
