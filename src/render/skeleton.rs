use crate::pose::PartName;

/// 骨格の接続定義 (開始キーポイント, 終了キーポイント)
///
/// PoseNet の隣接部位ペア。顔のキーポイントは線で結ばない。
pub const SKELETON_CONNECTIONS: [(PartName, PartName); 12] = [
    // 上半身
    (PartName::LeftShoulder, PartName::RightShoulder),
    (PartName::LeftShoulder, PartName::LeftElbow),
    (PartName::LeftElbow, PartName::LeftWrist),
    (PartName::RightShoulder, PartName::RightElbow),
    (PartName::RightElbow, PartName::RightWrist),
    // 胴体
    (PartName::LeftShoulder, PartName::LeftHip),
    (PartName::RightShoulder, PartName::RightHip),
    (PartName::LeftHip, PartName::RightHip),
    // 下半身
    (PartName::LeftHip, PartName::LeftKnee),
    (PartName::LeftKnee, PartName::LeftAnkle),
    (PartName::RightHip, PartName::RightKnee),
    (PartName::RightKnee, PartName::RightAnkle),
];

/// キーポイントマーカーの色 (RGB)
pub const KEYPOINT_COLOR: u32 = 0x00FF00; // 緑

/// 骨格線の色 (RGB)
pub const SKELETON_COLOR: u32 = 0xFFFF00; // 黄色

/// キーポイントマーカーの半径（ピクセル）
pub const KEYPOINT_RADIUS: i32 = 4;
