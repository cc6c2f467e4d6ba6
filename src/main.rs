use anyhow::Result;
use tokio_util::sync::CancellationToken;

use kisekae_overlay::config::Config;
use kisekae_overlay::overlay::{CostumeSet, OverlayAsset};
use kisekae_overlay::pose::{Keypoint, ModelArchitecture, ModelLoader, PartName, Pose, PoseEstimator};
use kisekae_overlay::render::MinifbPresenter;
use kisekae_overlay::runtime::RenderLoop;
use kisekae_overlay::video::{FrameSource, VideoFrame};

const CONFIG_PATH: &str = "config.toml";

/// 正規化座標での基準ポーズ（正面向き・直立）
const BASE_POSE: [(PartName, f32, f32); 17] = [
    (PartName::Nose, 0.50, 0.38),
    (PartName::LeftEye, 0.545, 0.355),
    (PartName::RightEye, 0.455, 0.355),
    (PartName::LeftEar, 0.59, 0.37),
    (PartName::RightEar, 0.41, 0.37),
    (PartName::LeftShoulder, 0.64, 0.52),
    (PartName::RightShoulder, 0.36, 0.52),
    (PartName::LeftElbow, 0.68, 0.64),
    (PartName::RightElbow, 0.32, 0.64),
    (PartName::LeftWrist, 0.70, 0.76),
    (PartName::RightWrist, 0.30, 0.76),
    (PartName::LeftHip, 0.59, 0.75),
    (PartName::RightHip, 0.41, 0.75),
    (PartName::LeftKnee, 0.58, 0.88),
    (PartName::RightKnee, 0.42, 0.88),
    (PartName::LeftAnkle, 0.58, 0.98),
    (PartName::RightAnkle, 0.42, 0.98),
];

/// カメラもモデルも無い環境向けのデモ用推定器。
/// 頭を周期的に傾け、体を左右に揺らすポーズを合成する。
struct ScriptedEstimator {
    tick: u32,
}

impl ScriptedEstimator {
    fn synthesize(&mut self, frame: &VideoFrame) -> Pose {
        let size = frame.width as f32;
        let t = self.tick as f32;
        self.tick = self.tick.wrapping_add(1);

        // 頭部ロール ±12度、体の揺れ ±5%
        let roll = (t / 40.0).sin() * 12.0_f32.to_radians();
        let sway = (t / 60.0).sin() * 0.05 * size;
        let (sin, cos) = roll.sin_cos();
        let (head_cx, head_cy) = (0.5 * size, 0.37 * size);

        let keypoints = BASE_POSE
            .iter()
            .map(|&(part, nx, ny)| {
                let (mut x, mut y) = (nx * size, ny * size);
                let head_part = matches!(
                    part,
                    PartName::Nose
                        | PartName::LeftEye
                        | PartName::RightEye
                        | PartName::LeftEar
                        | PartName::RightEar
                );
                if head_part {
                    // 頭部キーポイントだけ頭の中心まわりに回転
                    let (dx, dy) = (x - head_cx, y - head_cy);
                    x = head_cx + dx * cos - dy * sin;
                    y = head_cy + dx * sin + dy * cos;
                }
                Keypoint::new(part, x + sway, y, 0.95)
            })
            .collect();

        Pose::new(0.92, keypoints)
    }
}

impl PoseEstimator for ScriptedEstimator {
    async fn estimate_single_pose(
        &mut self,
        frame: &VideoFrame,
        _image_scale_factor: f32,
        _mirror: bool,
        _output_stride: u32,
    ) -> Result<Pose> {
        Ok(self.synthesize(frame))
    }

    async fn estimate_multiple_poses(
        &mut self,
        frame: &VideoFrame,
        _image_scale_factor: f32,
        _mirror: bool,
        _output_stride: u32,
        max_poses: usize,
        _min_part_confidence: f32,
        _nms_radius: f32,
    ) -> Result<Vec<Pose>> {
        let mut poses = vec![self.synthesize(frame)];
        // 2人目: 画面端に低スコアのポーズ
        if max_poses > 1 {
            let mut second = poses[0].clone();
            second.score = 0.4;
            for kp in &mut second.keypoints {
                kp.x = (kp.x - frame.width as f32 * 0.3).max(0.0);
                kp.score = 0.6;
            }
            poses.push(second);
        }
        Ok(poses)
    }
}

struct ScriptedLoader;

impl ModelLoader for ScriptedLoader {
    type Estimator = ScriptedEstimator;

    async fn load(&self, architecture: ModelArchitecture) -> Result<ScriptedEstimator> {
        log::info!("スクリプトモデル {} をロード", architecture);
        Ok(ScriptedEstimator { tick: 0 })
    }
}

/// 縦グラデーションのダミー映像
struct GradientSource {
    size: u32,
}

impl FrameSource for GradientSource {
    fn resolution(&self) -> (u32, u32) {
        (self.size, self.size)
    }

    fn read_frame(&mut self) -> Result<VideoFrame> {
        let pixels = (0..self.size * self.size)
            .map(|i| {
                let y = i / self.size;
                let v = 0x28 + (y * 0x30 / self.size);
                (v << 16) | (v << 8) | (v + 0x10)
            })
            .collect();
        Ok(VideoFrame::new(self.size, self.size, pixels))
    }
}

/// アセットが無い環境用の市松模様コスチューム
fn placeholder_costume(assets_dir: &str) -> CostumeSet {
    CostumeSet::from_assets(
        assets_dir,
        "placeholder",
        OverlayAsset::checker(120, 80, 0xFFCC2222, 0xFF881111),
        OverlayAsset::checker(100, 60, 0xFF22AACC, 0xFF116688),
        OverlayAsset::checker(120, 140, 0xFF22CC44, 0xFF118822),
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    println!("=== Kisekae Overlay ({}) ===", env!("GIT_VERSION"));
    println!("ESC: 終了 / 数字キー: コスチューム切替");

    let config = Config::load_or_default(CONFIG_PATH);
    let canvas_size = config.output.canvas_size;

    let assets = match CostumeSet::load(&config.overlay.assets_dir, &config.overlay.costume) {
        Ok(assets) => assets,
        Err(e) => {
            log::warn!("{:#} (プレースホルダアセットを使用)", e);
            placeholder_costume(&config.overlay.assets_dir)
        }
    };

    // ウィンドウを開けなければここで終了（ループは開始しない）
    let presenter = MinifbPresenter::new("Kisekae Overlay", canvas_size)?;
    let source = GradientSource {
        size: canvas_size as u32,
    };

    let mut render_loop =
        RenderLoop::new(ScriptedLoader, source, presenter, assets, &config).await?;

    let cancel = CancellationToken::new();
    let tick_config = config.clone();
    render_loop.run(cancel, move || tick_config.clone()).await
}
