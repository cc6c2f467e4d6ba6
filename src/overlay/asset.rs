use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// デコード済みオーバーレイ画像
///
/// 起動時（またはコスチューム切替時）に一度読み込み、全フレームで共有する。
/// レンダーパスからは不変。
#[derive(Debug, Clone)]
pub struct OverlayAsset {
    pub width: u32,
    pub height: u32,
    /// 0xAARRGGBB のパックドピクセル（行優先）
    pub pixels: Vec<u32>,
    /// 高さ/幅。配置計算で width から height を導く
    pub aspect: f32,
    pub source_path: String,
}

impl OverlayAsset {
    /// PNG ファイルから読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .with_context(|| format!("オーバーレイ画像を読み込めない: {}", path.display()))?
            .to_rgba8();

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("空のオーバーレイ画像: {}", path.display());
        }

        let pixels = decoded
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
            })
            .collect();

        Ok(Self {
            width,
            height,
            pixels,
            aspect: height as f32 / width as f32,
            source_path: path.display().to_string(),
        })
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>, source: &str) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
            aspect: height as f32 / width as f32,
            source_path: source.to_string(),
        }
    }

    /// 市松模様のプレースホルダ（テスト・アセット不在時のデモ用）
    pub fn checker(width: u32, height: u32, color_a: u32, color_b: u32) -> Self {
        let pixels = (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                if (x / 8 + y / 8) % 2 == 0 {
                    color_a
                } else {
                    color_b
                }
            })
            .collect();
        Self::from_pixels(width, height, pixels, "<checker>")
    }

    /// 範囲外は完全透明
    pub fn texel(&self, x: u32, y: u32) -> u32 {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize]
        } else {
            0
        }
    }
}

/// コスチューム1式（帽子・マスク・シャツ）
///
/// パス規約: {assets_dir}/{costume_id}/{hat|mask|shirt}.png
pub struct CostumeSet {
    pub costume_id: String,
    pub hat: OverlayAsset,
    pub mask: OverlayAsset,
    pub shirt: OverlayAsset,
    assets_dir: PathBuf,
}

impl CostumeSet {
    /// 読み込み済み（または手続き生成の）アセットから構築する
    pub fn from_assets<P: AsRef<Path>>(
        assets_dir: P,
        costume_id: &str,
        hat: OverlayAsset,
        mask: OverlayAsset,
        shirt: OverlayAsset,
    ) -> Self {
        Self {
            costume_id: costume_id.to_string(),
            hat,
            mask,
            shirt,
            assets_dir: assets_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load<P: AsRef<Path>>(assets_dir: P, costume_id: &str) -> Result<Self> {
        let assets_dir = assets_dir.as_ref().to_path_buf();
        let dir = assets_dir.join(costume_id);
        let set = Self {
            costume_id: costume_id.to_string(),
            hat: OverlayAsset::load(dir.join("hat.png"))?,
            mask: OverlayAsset::load(dir.join("mask.png"))?,
            shirt: OverlayAsset::load(dir.join("shirt.png"))?,
            assets_dir,
        };
        log::info!(
            "コスチューム {} を読み込み (hat {}x{}, mask {}x{}, shirt {}x{})",
            costume_id,
            set.hat.width,
            set.hat.height,
            set.mask.width,
            set.mask.height,
            set.shirt.width,
            set.shirt.height,
        );
        Ok(set)
    }

    /// コスチュームを切り替える。読み込みに失敗した場合は現状維持で Err。
    pub fn swap(&mut self, costume_id: &str) -> Result<()> {
        let next = Self::load(&self.assets_dir, costume_id)
            .with_context(|| format!("コスチューム {} への切替に失敗", costume_id))?;
        *self = next;
        Ok(())
    }
}
