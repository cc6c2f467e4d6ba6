use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::{AlgorithmMode, Config};
use crate::overlay::{resolve_placements, CostumeSet, OverlayPlacements, OverlayTuning};
use crate::pose::{ModelArchitecture, ModelLoader, NamedKeypoints, Pose, PoseEstimator};
use crate::render::{FrameCompositor, FramePresenter};
use crate::video::FrameSource;

/// レンダーループの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// 外部（設定パネル等）からループへ渡す非同期の操作要求。
///
/// ループ自体は単一の論理スレッドで回る。このハンドルの Mutex は
/// フレーム状態ではなくスレッド間の制御入力を守るためのもの。
#[derive(Clone, Default)]
pub struct ControlHandle {
    model_swap: Arc<Mutex<Option<ModelArchitecture>>>,
    costume_swap: Arc<Mutex<Option<String>>>,
}

impl ControlHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次のティックでモデルを切り替える。連続要求は最後のものが勝つ
    pub fn request_model_swap(&self, architecture: ModelArchitecture) {
        *self.model_swap.lock().unwrap() = Some(architecture);
    }

    /// 次のティックでコスチュームを切り替える
    pub fn request_costume(&self, costume_id: &str) {
        *self.costume_swap.lock().unwrap() = Some(costume_id.to_string());
    }

    fn take_model_swap(&self) -> Option<ModelArchitecture> {
        self.model_swap.lock().unwrap().take()
    }

    fn take_costume(&self) -> Option<String> {
        self.costume_swap.lock().unwrap().take()
    }
}

/// レンダーループ制御部
///
/// ティックごとに: スワップ要求の確認 → フレーム取得 → 推論(await) →
/// アンカー計算 → 配置解決 → 合成 → 表示。
/// 同時に処理中のフレームは構造上つねに一つで、推論が唯一の
/// サスペンションポイント。推論1回につき描画1回、フレームスキップなし。
pub struct RenderLoop<L: ModelLoader, S: FrameSource, P: FramePresenter> {
    loader: L,
    estimator: L::Estimator,
    architecture: ModelArchitecture,
    source: S,
    presenter: P,
    compositor: FrameCompositor,
    assets: CostumeSet,
    tuning: OverlayTuning,
    handle: ControlHandle,
    state: LoopState,
}

impl<L: ModelLoader, S: FrameSource, P: FramePresenter> RenderLoop<L, S, P> {
    /// 初期モデルを読み込んで Idle 状態のループを作る。
    /// モデルが読み込めなければループは開始しない。
    pub async fn new(
        loader: L,
        source: S,
        presenter: P,
        assets: CostumeSet,
        config: &Config,
    ) -> Result<Self> {
        let architecture = config.input.architecture;
        let estimator = loader
            .load(architecture)
            .await
            .with_context(|| format!("初期モデル {} の読み込みに失敗", architecture))?;

        Ok(Self {
            loader,
            estimator,
            architecture,
            source,
            presenter,
            compositor: FrameCompositor::new(config.output.canvas_size),
            assets,
            tuning: config.overlay.tuning,
            handle: ControlHandle::new(),
            state: LoopState::Idle,
        })
    }

    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn assets(&self) -> &CostumeSet {
        &self.assets
    }

    pub fn architecture(&self) -> ModelArchitecture {
        self.architecture
    }

    /// キャンセルされるか表示先が閉じられるまで毎ティック回す。
    /// 設定はティック開始時に読み直し、ティック中は変化しない。
    pub async fn run<C>(&mut self, cancel: CancellationToken, config_source: C) -> Result<()>
    where
        C: Fn() -> Config,
    {
        self.state = LoopState::Running;
        while !cancel.is_cancelled() && self.presenter.is_open() {
            let config = config_source();
            self.tick(&config).await?;
        }
        self.state = LoopState::Stopped;
        log::info!("レンダーループを停止");
        Ok(())
    }

    async fn tick(&mut self, config: &Config) -> Result<()> {
        // スワップは推論と相互排他: 完了を待ってから次の推論を発行する
        if let Some(architecture) = self.handle.take_model_swap() {
            self.swap_model(architecture).await;
        }
        if let Some(costume_id) = self.handle.take_costume() {
            if let Err(e) = self.assets.swap(&costume_id) {
                // 失敗時は現行コスチュームを維持
                log::warn!("{:#}", e);
            }
        }
        if let Some(digit) = self.presenter.pressed_digit() {
            self.handle.request_costume(&digit.to_string());
        }

        if self.compositor.size() != config.output.canvas_size {
            self.compositor = FrameCompositor::new(config.output.canvas_size);
        }

        let frame = match self.source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("フレーム取得に失敗: {:#}", e);
                return Ok(());
            }
        };

        let poses = match config.algorithm {
            AlgorithmMode::SinglePose => {
                let pose = self
                    .estimator
                    .estimate_single_pose(
                        &frame,
                        config.input.image_scale_factor,
                        config.input.mirror,
                        config.input.output_stride,
                    )
                    .await?;
                vec![pose]
            }
            AlgorithmMode::MultiPose => {
                self.estimator
                    .estimate_multiple_poses(
                        &frame,
                        config.input.image_scale_factor,
                        config.input.mirror,
                        config.input.output_stride,
                        config.multi_pose.max_pose_detections,
                        config.multi_pose.min_part_confidence,
                        config.multi_pose.nms_radius,
                    )
                    .await?
            }
        };

        let placements = match select_pose(&poses, config) {
            Some(pose) => resolve_placements(
                &NamedKeypoints::from_pose(pose),
                &self.assets.hat,
                &self.assets.mask,
                &self.assets.shirt,
                &self.tuning,
            ),
            None => OverlayPlacements::skip_all(),
        };

        self.compositor
            .render_frame(Some(&frame), &poses, &placements, &self.assets, config);
        self.presenter
            .present(self.compositor.buffer(), self.compositor.size())?;
        Ok(())
    }

    /// モデルの切り替え。読み込みに成功した時点で旧モデルを解放する。
    /// 失敗した場合は旧モデルのまま推論を続け、エラーは握りつぶさず報告する。
    async fn swap_model(&mut self, architecture: ModelArchitecture) {
        log::info!("モデルを {} から {} へ切り替え", self.architecture, architecture);
        match self.loader.load(architecture).await {
            Ok(estimator) => {
                self.estimator = estimator;
                self.architecture = architecture;
            }
            Err(e) => {
                log::warn!(
                    "モデル {} の読み込みに失敗 ({} を維持): {:#}",
                    architecture,
                    self.architecture,
                    e
                );
            }
        }
    }
}

/// オーバーレイ配置の対象ポーズを選ぶ。
/// single-pose は唯一の結果、multi-pose は先頭
/// （設定によりスコア最大）のポーズ。
fn select_pose<'a>(poses: &'a [Pose], config: &Config) -> Option<&'a Pose> {
    if config.algorithm == AlgorithmMode::MultiPose && config.multi_pose.select_highest_score {
        poses.iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(Ordering::Equal)
        })
    } else {
        poses.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayAsset;
    use crate::pose::{Keypoint, PartName};
    use crate::video::VideoFrame;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// 全部位そろったポーズ
    fn full_pose(score: f32) -> Pose {
        let keypoints = (0..PartName::COUNT)
            .map(|i| {
                let part = PartName::from_index(i).unwrap();
                Keypoint::new(part, 50.0 + i as f32, 40.0 + i as f32, 0.9)
            })
            .collect();
        Pose::new(score, keypoints)
    }

    struct MockEstimator {
        architecture: ModelArchitecture,
        inference_log: Arc<Mutex<Vec<ModelArchitecture>>>,
    }

    impl PoseEstimator for MockEstimator {
        async fn estimate_single_pose(
            &mut self,
            _frame: &VideoFrame,
            _image_scale_factor: f32,
            _mirror: bool,
            _output_stride: u32,
        ) -> Result<Pose> {
            self.inference_log.lock().unwrap().push(self.architecture);
            Ok(full_pose(0.9))
        }

        async fn estimate_multiple_poses(
            &mut self,
            _frame: &VideoFrame,
            _image_scale_factor: f32,
            _mirror: bool,
            _output_stride: u32,
            max_poses: usize,
            _min_part_confidence: f32,
            _nms_radius: f32,
        ) -> Result<Vec<Pose>> {
            self.inference_log.lock().unwrap().push(self.architecture);
            Ok((0..max_poses).map(|i| full_pose(0.5 + i as f32 * 0.1)).collect())
        }
    }

    struct MockLoader {
        fail_on: Option<ModelArchitecture>,
        load_count: Arc<AtomicUsize>,
        inference_log: Arc<Mutex<Vec<ModelArchitecture>>>,
    }

    impl MockLoader {
        fn new(fail_on: Option<ModelArchitecture>) -> Self {
            Self {
                fail_on,
                load_count: Arc::new(AtomicUsize::new(0)),
                inference_log: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ModelLoader for MockLoader {
        type Estimator = MockEstimator;

        async fn load(&self, architecture: ModelArchitecture) -> Result<MockEstimator> {
            self.load_count.fetch_add(1, AtomicOrdering::SeqCst);
            if self.fail_on == Some(architecture) {
                anyhow::bail!("mock load failure for {}", architecture);
            }
            Ok(MockEstimator {
                architecture,
                inference_log: self.inference_log.clone(),
            })
        }
    }

    struct StaticSource;

    impl FrameSource for StaticSource {
        fn resolution(&self) -> (u32, u32) {
            (8, 8)
        }

        fn read_frame(&mut self) -> Result<VideoFrame> {
            Ok(VideoFrame::filled(8, 8, 0x202020))
        }
    }

    /// 指定回数 present したらキャンセルを発行するヘッドレス表示先
    struct HeadlessPresenter {
        presented: Cell<usize>,
        cancel_after: usize,
        cancel: CancellationToken,
    }

    impl HeadlessPresenter {
        fn new(cancel_after: usize, cancel: CancellationToken) -> Self {
            Self {
                presented: Cell::new(0),
                cancel_after,
                cancel,
            }
        }
    }

    impl FramePresenter for HeadlessPresenter {
        fn is_open(&self) -> bool {
            true
        }

        fn present(&mut self, buffer: &[u32], size: usize) -> Result<()> {
            assert_eq!(buffer.len(), size * size);
            let count = self.presented.get() + 1;
            self.presented.set(count);
            if count >= self.cancel_after {
                self.cancel.cancel();
            }
            Ok(())
        }
    }

    fn test_costume() -> CostumeSet {
        let asset = OverlayAsset::checker(16, 12, 0xFFFF0000, 0xFF00FF00);
        CostumeSet::from_assets("img", "test", asset.clone(), asset.clone(), asset)
    }

    async fn build_loop(
        loader: MockLoader,
        cancel_after: usize,
        cancel: CancellationToken,
        config: &Config,
    ) -> RenderLoop<MockLoader, StaticSource, HeadlessPresenter> {
        RenderLoop::new(
            loader,
            StaticSource,
            HeadlessPresenter::new(cancel_after, cancel),
            test_costume(),
            config,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_loop_stops_on_cancellation() {
        let config = Config::default();
        let cancel = CancellationToken::new();
        let mut render_loop =
            build_loop(MockLoader::new(None), 3, cancel.clone(), &config).await;
        assert_eq!(render_loop.state(), LoopState::Idle);

        render_loop.run(cancel, || Config::default()).await.unwrap();

        assert_eq!(render_loop.state(), LoopState::Stopped);
        assert_eq!(render_loop.presenter.presented.get(), 3);
    }

    #[tokio::test]
    async fn test_swap_completes_before_next_inference() {
        let config = Config::default();
        let loader = MockLoader::new(None);
        let load_count = loader.load_count.clone();
        let inference_log = loader.inference_log.clone();
        let cancel = CancellationToken::new();
        let mut render_loop = build_loop(loader, 2, cancel.clone(), &config).await;

        render_loop
            .handle()
            .request_model_swap(ModelArchitecture::MobileNet050);
        render_loop.run(cancel, || Config::default()).await.unwrap();

        // 初期ロード + スワップで2回
        assert_eq!(load_count.load(AtomicOrdering::SeqCst), 2);
        // スワップ完了後のモデルだけが推論に使われる
        let log = inference_log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|&a| a == ModelArchitecture::MobileNet050));
        assert_eq!(render_loop.architecture(), ModelArchitecture::MobileNet050);
    }

    #[tokio::test]
    async fn test_failed_swap_keeps_previous_model() {
        let config = Config::default();
        let loader = MockLoader::new(Some(ModelArchitecture::MobileNet075));
        let inference_log = loader.inference_log.clone();
        let cancel = CancellationToken::new();
        let mut render_loop = build_loop(loader, 2, cancel.clone(), &config).await;

        render_loop
            .handle()
            .request_model_swap(ModelArchitecture::MobileNet075);
        render_loop.run(cancel, || Config::default()).await.unwrap();

        // 旧モデル (デフォルト 1.01) のまま推論が続く
        let log = inference_log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|&a| a == ModelArchitecture::MobileNet101));
        assert_eq!(render_loop.architecture(), ModelArchitecture::MobileNet101);
    }

    #[tokio::test]
    async fn test_failed_costume_swap_keeps_previous_set() {
        let config = Config::default();
        let cancel = CancellationToken::new();
        let mut render_loop =
            build_loop(MockLoader::new(None), 1, cancel.clone(), &config).await;

        render_loop.handle().request_costume("no-such-costume");
        render_loop.run(cancel, || Config::default()).await.unwrap();

        assert_eq!(render_loop.assets().costume_id, "test");
    }

    #[tokio::test]
    async fn test_initial_model_load_failure_aborts_startup() {
        let config = Config::default();
        let loader = MockLoader::new(Some(ModelArchitecture::MobileNet101));
        let result = RenderLoop::new(
            loader,
            StaticSource,
            HeadlessPresenter::new(1, CancellationToken::new()),
            test_costume(),
            &config,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_select_pose_first_by_default() {
        let mut config = Config::default();
        config.algorithm = AlgorithmMode::MultiPose;
        let poses = vec![full_pose(0.4), full_pose(0.8)];
        let selected = select_pose(&poses, &config).unwrap();
        assert_eq!(selected.score, 0.4);
    }

    #[test]
    fn test_select_pose_highest_score() {
        let mut config = Config::default();
        config.algorithm = AlgorithmMode::MultiPose;
        config.multi_pose.select_highest_score = true;
        let poses = vec![full_pose(0.4), full_pose(0.8), full_pose(0.6)];
        let selected = select_pose(&poses, &config).unwrap();
        assert_eq!(selected.score, 0.8);
    }

    #[test]
    fn test_select_pose_empty() {
        let config = Config::default();
        assert!(select_pose(&[], &config).is_none());
    }
}
