use crate::config::Config;
use crate::overlay::{CostumeSet, OverlayAsset, OverlayPlacements, PlacementRect};
use crate::pose::{NamedKeypoints, Pose};
use crate::render::skeleton::{
    KEYPOINT_COLOR, KEYPOINT_RADIUS, SKELETON_COLOR, SKELETON_CONNECTIONS,
};
use crate::video::VideoFrame;

/// ソフトウェアラスタライザによるフレーム合成器
///
/// 正方形の 0x00RRGGBB バッファに固定Z順で描く:
/// 映像 → 帽子 → マスク → シャツ → 骨格 → キーポイント。
/// 左右反転は映像ブリットにのみ適用する。キーポイントは最初から
/// 反転済み座標系で届くので、オーバーレイには反転をかけない。
pub struct FrameCompositor {
    size: usize,
    buffer: Vec<u32>,
}

impl FrameCompositor {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            buffer: vec![0u32; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    /// 1フレーム分の合成。呼び出しごとに全面を描き直す。
    pub fn render_frame(
        &mut self,
        video: Option<&VideoFrame>,
        poses: &[Pose],
        placements: &OverlayPlacements,
        assets: &CostumeSet,
        config: &Config,
    ) {
        self.clear();

        if config.output.show_video {
            if let Some(frame) = video {
                self.draw_video(frame, config.input.mirror);
            }
        }

        if let Some(rect) = &placements.hat {
            self.draw_overlay(&assets.hat, rect);
        }
        if let Some(rect) = &placements.mask {
            self.draw_overlay(&assets.mask, rect);
        }
        if let Some(rect) = &placements.shirt {
            self.draw_overlay(&assets.shirt, rect);
        }

        // 骨格・キーポイントはキャンバス/映像比でスケールして全ポーズ分描く
        let scale = match video {
            Some(frame) if frame.width > 0 => self.size as f32 / frame.width as f32,
            _ => 1.0,
        };
        let (min_pose_confidence, min_part_confidence) = config.active_confidence();
        for pose in poses {
            if pose.score < min_pose_confidence {
                continue;
            }
            if config.output.show_skeleton {
                self.draw_skeleton(pose, min_part_confidence, scale);
            }
            if config.output.show_points {
                self.draw_points(pose, min_part_confidence, scale);
            }
        }
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0);
    }

    /// 映像をキャンバス全面に最近傍スケールで描く。
    /// mirror ならX方向を反転する（Webカメラのセルフィー表示）。
    pub fn draw_video(&mut self, frame: &VideoFrame, mirror: bool) {
        if frame.width == 0 || frame.height == 0 {
            return;
        }
        for y in 0..self.size {
            let src_y = (y as u32 * frame.height) / self.size as u32;
            for x in 0..self.size {
                let mut src_x = (x as u32 * frame.width) / self.size as u32;
                if mirror {
                    src_x = frame.width - 1 - src_x;
                }
                self.buffer[y * self.size + x] = frame.pixel(src_x, src_y);
            }
        }
    }

    /// 配置矩形にアセットを描く。回転はピボット中心。
    ///
    /// 回転後の矩形を含む範囲の各出力ピクセルを逆変換で
    /// アセット座標に写し、最近傍サンプル + アルファ合成する。
    pub fn draw_overlay(&mut self, asset: &OverlayAsset, rect: &PlacementRect) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let rad = rect.rotation_deg.to_radians();
        let (sin, cos) = rad.sin_cos();

        // 回転後の4隅から出力側のバウンディングボックスを求める
        let corners = [
            (rect.x, rect.y),
            (rect.x + rect.width, rect.y),
            (rect.x, rect.y + rect.height),
            (rect.x + rect.width, rect.y + rect.height),
        ];
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for (cx, cy) in corners {
            let dx = cx - rect.pivot.x;
            let dy = cy - rect.pivot.y;
            let rx = rect.pivot.x + dx * cos - dy * sin;
            let ry = rect.pivot.y + dx * sin + dy * cos;
            min_x = min_x.min(rx);
            min_y = min_y.min(ry);
            max_x = max_x.max(rx);
            max_y = max_y.max(ry);
        }

        let x0 = (min_x.floor().max(0.0)) as usize;
        let y0 = (min_y.floor().max(0.0)) as usize;
        let x1 = (max_x.ceil().min(self.size as f32)) as usize;
        let y1 = (max_y.ceil().min(self.size as f32)) as usize;

        for dy in y0..y1 {
            for dx in x0..x1 {
                // 出力ピクセル中心を逆回転して矩形ローカル座標へ
                let px = dx as f32 + 0.5 - rect.pivot.x;
                let py = dy as f32 + 0.5 - rect.pivot.y;
                let ux = rect.pivot.x + px * cos + py * sin - rect.x;
                let uy = rect.pivot.y - px * sin + py * cos - rect.y;
                if ux < 0.0 || uy < 0.0 || ux >= rect.width || uy >= rect.height {
                    continue;
                }
                let tx = (ux / rect.width * asset.width as f32) as u32;
                let ty = (uy / rect.height * asset.height as f32) as u32;
                let texel = asset.texel(tx, ty);
                let index = dy * self.size + dx;
                self.buffer[index] = blend(self.buffer[index], texel);
            }
        }
    }

    /// 骨格線を描画
    pub fn draw_skeleton(&mut self, pose: &Pose, min_part_confidence: f32, scale: f32) {
        let named = NamedKeypoints::from_pose(pose);
        for (start_part, end_part) in SKELETON_CONNECTIONS.iter() {
            let (start, end) = match (named.get(*start_part), named.get(*end_part)) {
                (Some(s), Some(e)) => (s, e),
                _ => continue,
            };
            if start.is_confident(min_part_confidence) && end.is_confident(min_part_confidence) {
                self.draw_line(
                    (start.x * scale) as i32,
                    (start.y * scale) as i32,
                    (end.x * scale) as i32,
                    (end.y * scale) as i32,
                    SKELETON_COLOR,
                );
            }
        }
    }

    /// キーポイントマーカーを描画
    pub fn draw_points(&mut self, pose: &Pose, min_part_confidence: f32, scale: f32) {
        for kp in &pose.keypoints {
            if kp.is_confident(min_part_confidence) {
                self.draw_circle(
                    (kp.x * scale) as i32,
                    (kp.y * scale) as i32,
                    KEYPOINT_RADIUS,
                    KEYPOINT_COLOR,
                );
            }
        }
    }

    /// Bresenhamのアルゴリズムで線を描画
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 円を描画（塗りつぶし）
    fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// ピクセルをセット（境界チェック付き）
    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.size as i32 && y >= 0 && y < self.size as i32 {
            self.buffer[y as usize * self.size + x as usize] = color;
        }
    }
}

/// src (0xAARRGGBB) を dst (0x00RRGGBB) にアルファ合成
fn blend(dst: u32, src: u32) -> u32 {
    let alpha = src >> 24;
    match alpha {
        0 => dst,
        255 => src & 0x00FF_FFFF,
        a => {
            let inv = 255 - a;
            let r = ((src >> 16 & 0xFF) * a + (dst >> 16 & 0xFF) * inv) / 255;
            let g = ((src >> 8 & 0xFF) * a + (dst >> 8 & 0xFF) * inv) / 255;
            let b = ((src & 0xFF) * a + (dst & 0xFF) * inv) / 255;
            (r << 16) | (g << 8) | b
        }
    }
}
