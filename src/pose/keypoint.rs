use serde::{Deserialize, Serialize};

/// PoseNet の 17 キーポイント部位名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(usize)]
pub enum PartName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl PartName {
    pub const COUNT: usize = 17;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEye),
            2 => Some(Self::RightEye),
            3 => Some(Self::LeftEar),
            4 => Some(Self::RightEar),
            5 => Some(Self::LeftShoulder),
            6 => Some(Self::RightShoulder),
            7 => Some(Self::LeftElbow),
            8 => Some(Self::RightElbow),
            9 => Some(Self::LeftWrist),
            10 => Some(Self::RightWrist),
            11 => Some(Self::LeftHip),
            12 => Some(Self::RightHip),
            13 => Some(Self::LeftKnee),
            14 => Some(Self::RightKnee),
            15 => Some(Self::LeftAnkle),
            16 => Some(Self::RightAnkle),
            _ => None,
        }
    }

    /// PoseNet のワイヤ名 ("leftEye" など)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "leftEye",
            Self::RightEye => "rightEye",
            Self::LeftEar => "leftEar",
            Self::RightEar => "rightEar",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftElbow => "leftElbow",
            Self::RightElbow => "rightElbow",
            Self::LeftWrist => "leftWrist",
            Self::RightWrist => "rightWrist",
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
            Self::LeftAnkle => "leftAnkle",
            Self::RightAnkle => "rightAnkle",
        }
    }
}

/// 単一キーポイント
///
/// 座標は入力画像のピクセル空間。フレームごとにモデルが生成し、
/// フレームをまたいで保持しない。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: PartName,
    /// X座標（ピクセル）
    pub x: f32,
    /// Y座標（ピクセル）
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub score: f32,
}

impl Keypoint {
    pub fn new(part: PartName, x: f32, y: f32, score: f32) -> Self {
        Self { part, x, y, score }
    }

    /// 信頼度が閾値以上か
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.score >= threshold
    }
}

/// 一人分の検出結果
///
/// keypoints はモデルの出力順（部位ごとに一つ、重複なし）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pose {
    pub score: f32,
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(score: f32, keypoints: Vec<Keypoint>) -> Self {
        Self { score, keypoints }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_name_count() {
        assert_eq!(PartName::COUNT, 17);
    }

    #[test]
    fn test_part_name_from_index() {
        assert_eq!(PartName::from_index(0), Some(PartName::Nose));
        assert_eq!(PartName::from_index(16), Some(PartName::RightAnkle));
        assert_eq!(PartName::from_index(17), None);
    }

    #[test]
    fn test_part_name_roundtrip() {
        for i in 0..PartName::COUNT {
            let part = PartName::from_index(i).unwrap();
            assert_eq!(part as usize, i);
        }
    }

    #[test]
    fn test_wire_name_serde() {
        // PoseNet 互換のキャメルケース名で直列化される
        let json = serde_json::to_string(&PartName::LeftEye).unwrap();
        assert_eq!(json, "\"leftEye\"");
        let part: PartName = serde_json::from_str("\"rightShoulder\"").unwrap();
        assert_eq!(part, PartName::RightShoulder);
    }

    #[test]
    fn test_keypoint_is_confident() {
        let kp = Keypoint::new(PartName::Nose, 10.0, 20.0, 0.7);
        assert!(kp.is_confident(0.5));
        assert!(!kp.is_confident(0.8));
    }
}
