use crate::pose::{NamedKeypoints, PartName};

/// 2D座標（ピクセル空間）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// キーポイントから導出する解剖学的基準ジオメトリ
///
/// 毎フレーム計算し直す一時データ。平滑化は行わない
/// （フレーム間の状態を持たないことが契約）。
/// 必要な部位が一つでも欠けていれば構築自体が失敗するので、
/// NaN が描画系に渡ることはない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorGeometry {
    /// 頭部ロール角（度）。両目の傾きから導出、目が水平なら 0
    pub rotation_deg: f32,
    /// 首の基準点。頭より動きが小さい回転ピボット
    pub neck: Point,
    /// 両耳のX方向の符号付き距離 (left - right)
    pub ear_span: f32,
    /// 両目のX方向の符号付き距離 (left - right)
    pub eye_span: f32,
    /// 鼻のY座標
    pub nose_y: f32,
}

impl AnchorGeometry {
    /// 必要部位: 両目・両耳・鼻・両肩。欠けていれば None
    pub fn compute(named: &NamedKeypoints) -> Option<Self> {
        let [left_eye, right_eye, nose, left_ear, right_ear, left_shoulder, right_shoulder] =
            named.require([
                PartName::LeftEye,
                PartName::RightEye,
                PartName::Nose,
                PartName::LeftEar,
                PartName::RightEar,
                PartName::LeftShoulder,
                PartName::RightShoulder,
            ])?;

        // atan2 なので目が垂直に並んでもゼロ除算しない
        let rotation_deg =
            f32::atan2(left_eye.y - right_eye.y, left_eye.x - right_eye.x).to_degrees();

        let shoulder_mid_y = (left_shoulder.y + right_shoulder.y) / 2.0;
        let neck = Point::new(
            (left_shoulder.x + right_shoulder.x) / 2.0,
            (nose.y + shoulder_mid_y) / 2.0,
        );

        Some(Self {
            rotation_deg,
            neck,
            ear_span: left_ear.x - right_ear.x,
            eye_span: left_eye.x - right_eye.x,
            nose_y: nose.y,
        })
    }
}
