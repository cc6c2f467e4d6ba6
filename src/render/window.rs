use anyhow::{Context, Result};
use minifb::{Key, Window, WindowOptions};

use crate::render::FramePresenter;

/// minifb ウィンドウへの表示
pub struct MinifbPresenter {
    window: Window,
}

impl MinifbPresenter {
    /// ウィンドウを作成。開けなければレンダーループは開始しない。
    pub fn new(title: &str, size: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            size,
            size,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .context("表示ウィンドウを作成できない")?;
        window.set_target_fps(60);

        Ok(Self { window })
    }
}

impl FramePresenter for MinifbPresenter {
    /// ESCで閉じる
    fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    fn present(&mut self, buffer: &[u32], size: usize) -> Result<()> {
        self.window
            .update_with_buffer(buffer, size, size)
            .context("フレームの表示に失敗")?;
        Ok(())
    }

    fn pressed_digit(&self) -> Option<u8> {
        const DIGITS: [(Key, u8); 9] = [
            (Key::Key1, 1),
            (Key::Key2, 2),
            (Key::Key3, 3),
            (Key::Key4, 4),
            (Key::Key5, 5),
            (Key::Key6, 6),
            (Key::Key7, 7),
            (Key::Key8, 8),
            (Key::Key9, 9),
        ];
        DIGITS
            .iter()
            .find(|(key, _)| self.window.is_key_pressed(*key, minifb::KeyRepeat::No))
            .map(|&(_, digit)| digit)
    }
}
