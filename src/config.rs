use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::overlay::OverlayTuning;
use crate::pose::ModelArchitecture;

/// 実行時設定
///
/// コアからは読み取り専用。外部の設定パネルが書き換え、
/// レンダーループが毎ティック読み直す。
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// 姿勢推定アルゴリズム
    #[serde(default)]
    pub algorithm: AlgorithmMode,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub single_pose: SinglePoseConfig,
    #[serde(default)]
    pub multi_pose: MultiPoseConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

/// single-pose は高速だがフレーム内に一人のみ想定。
/// multi-pose は複数人に対応する。
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlgorithmMode {
    #[default]
    #[serde(rename = "single-pose")]
    SinglePose,
    #[serde(rename = "multi-pose")]
    MultiPose,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// 推論前に画像を縮小する係数 (0.2〜1.0)
    #[serde(default = "default_image_scale_factor")]
    pub image_scale_factor: f32,
    /// 出力ストライド (8, 16, 32)。小さいほど高精度・低速
    #[serde(default = "default_output_stride")]
    pub output_stride: u32,
    /// モデルアーキテクチャ
    #[serde(default)]
    pub architecture: ModelArchitecture,
    /// 映像を左右反転した座標系で推定するか（Webカメラ前提）
    #[serde(default = "default_mirror")]
    pub mirror: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SinglePoseConfig {
    /// ポーズ全体の信頼度の下限
    #[serde(default = "default_single_min_pose_confidence")]
    pub min_pose_confidence: f32,
    /// キーポイント単位の信頼度の下限
    #[serde(default = "default_single_min_part_confidence")]
    pub min_part_confidence: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MultiPoseConfig {
    #[serde(default = "default_max_pose_detections")]
    pub max_pose_detections: usize,
    #[serde(default = "default_multi_min_pose_confidence")]
    pub min_pose_confidence: f32,
    #[serde(default = "default_multi_min_part_confidence")]
    pub min_part_confidence: f32,
    /// 検出ポーズ間の最小距離（ピクセル）
    #[serde(default = "default_nms_radius")]
    pub nms_radius: f32,
    /// true ならスコア最大のポーズをオーバーレイ対象にする。
    /// false なら先頭のポーズ。
    #[serde(default)]
    pub select_highest_score: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub show_video: bool,
    #[serde(default = "default_true")]
    pub show_skeleton: bool,
    #[serde(default = "default_true")]
    pub show_points: bool,
    /// 正方形キャンバスの一辺（ピクセル）
    #[serde(default = "default_canvas_size")]
    pub canvas_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    /// アセットのルートディレクトリ
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    /// コスチュームID (img/{id}/hat.png などのパス規約)
    #[serde(default = "default_costume")]
    pub costume: String,
    /// オーバーレイごとの固定オフセット・スケール係数
    #[serde(default)]
    pub tuning: OverlayTuning,
}

fn default_image_scale_factor() -> f32 { 0.5 }
fn default_output_stride() -> u32 { 16 }
fn default_mirror() -> bool { true }
fn default_single_min_pose_confidence() -> f32 { 0.1 }
fn default_single_min_part_confidence() -> f32 { 0.5 }
fn default_max_pose_detections() -> usize { 2 }
fn default_multi_min_pose_confidence() -> f32 { 0.1 }
fn default_multi_min_part_confidence() -> f32 { 0.3 }
fn default_nms_radius() -> f32 { 20.0 }
fn default_true() -> bool { true }
fn default_canvas_size() -> usize { 600 }
fn default_assets_dir() -> String { "img".to_string() }
fn default_costume() -> String { "1".to_string() }

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            image_scale_factor: default_image_scale_factor(),
            output_stride: default_output_stride(),
            architecture: ModelArchitecture::default(),
            mirror: default_mirror(),
        }
    }
}

impl Default for SinglePoseConfig {
    fn default() -> Self {
        Self {
            min_pose_confidence: default_single_min_pose_confidence(),
            min_part_confidence: default_single_min_part_confidence(),
        }
    }
}

impl Default for MultiPoseConfig {
    fn default() -> Self {
        Self {
            max_pose_detections: default_max_pose_detections(),
            min_pose_confidence: default_multi_min_pose_confidence(),
            min_part_confidence: default_multi_min_part_confidence(),
            nms_radius: default_nms_radius(),
            select_highest_score: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_video: true,
            show_skeleton: true,
            show_points: true,
            canvas_size: default_canvas_size(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            assets_dir: default_assets_dir(),
            costume: default_costume(),
            tuning: OverlayTuning::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmMode::default(),
            input: InputConfig::default(),
            single_pose: SinglePoseConfig::default(),
            multi_pose: MultiPoseConfig::default(),
            output: OutputConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// ファイルが無い・読めない場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::info!("設定ファイルを読み込めないためデフォルトを使用: {}", e);
                Config::default()
            }
        }
    }

    /// 現在のアルゴリズムモードに対応する (min_pose, min_part) 信頼度閾値
    pub fn active_confidence(&self) -> (f32, f32) {
        match self.algorithm {
            AlgorithmMode::SinglePose => (
                self.single_pose.min_pose_confidence,
                self.single_pose.min_part_confidence,
            ),
            AlgorithmMode::MultiPose => (
                self.multi_pose.min_pose_confidence,
                self.multi_pose.min_part_confidence,
            ),
        }
    }
}
