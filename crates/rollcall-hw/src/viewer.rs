//! Live preview window via minifb.

use minifb::{Key, Window, WindowOptions};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("window: {0}")]
    Window(String),
}

/// An on-screen preview surface with quit-key polling.
///
/// Quit is requested when the window is closed or Q/Escape is pressed.
pub struct PreviewWindow {
    window: Window,
    argb: Vec<u32>,
    width: usize,
    height: usize,
}

impl PreviewWindow {
    pub fn open(title: &str, width: usize, height: usize) -> Result<Self, ViewerError> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| ViewerError::Window(e.to_string()))?;
        window.limit_update_rate(Some(std::time::Duration::from_micros(16_600))); // ~60 FPS

        Ok(Self {
            window,
            argb: vec![0; width * height],
            width,
            height,
        })
    }

    /// Blit an RGB8 buffer to the window.
    pub fn present(&mut self, rgb: &[u8]) -> Result<(), ViewerError> {
        for (i, px) in rgb.chunks_exact(3).enumerate() {
            if i >= self.argb.len() {
                break;
            }
            self.argb[i] = ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32;
        }
        self.window
            .update_with_buffer(&self.argb, self.width, self.height)
            .map_err(|e| ViewerError::Window(e.to_string()))
    }

    pub fn quit_requested(&self) -> bool {
        !self.window.is_open()
            || self.window.is_key_down(Key::Q)
            || self.window.is_key_down(Key::Escape)
    }
}
