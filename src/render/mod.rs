pub mod compositor;
pub mod skeleton;
pub mod window;

use anyhow::Result;

pub use compositor::FrameCompositor;
pub use skeleton::SKELETON_CONNECTIONS;
pub use window::MinifbPresenter;

/// 合成済みバッファの表示先
///
/// minifb 実装のほか、テストではヘッドレス実装を使う。
/// present はホストの描画ケイデンスに合わせてブロックしてよい。
pub trait FramePresenter {
    /// 表示先がまだ有効か（ウィンドウが閉じられていないか）
    fn is_open(&self) -> bool;

    fn present(&mut self, buffer: &[u32], size: usize) -> Result<()>;

    /// 押された数字キー（コスチューム切替用）。未対応の実装は None
    fn pressed_digit(&self) -> Option<u8> {
        None
    }
}
