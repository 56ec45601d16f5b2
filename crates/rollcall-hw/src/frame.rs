//! Grayscale frame type and pixel utilities.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },
}

/// A captured grayscale frame.
#[derive(Clone)]
pub struct Frame {
    /// `width * height` luma bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Downscale by an integer factor using box averaging.
    ///
    /// A factor of 4 yields the 0.25× frame the recognition loop detects
    /// on; boxes found there are scaled back up by the same factor for
    /// display.
    pub fn downscaled(&self, factor: u32) -> Frame {
        assert!(factor >= 1);
        let dw = (self.width / factor).max(1);
        let dh = (self.height / factor).max(1);
        let sw = self.width as usize;
        let f = factor as usize;

        let mut data = Vec::with_capacity((dw * dh) as usize);
        for y in 0..dh as usize {
            for x in 0..dw as usize {
                let mut sum = 0u32;
                for dy in 0..f {
                    for dx in 0..f {
                        sum += self.data[(y * f + dy) * sw + (x * f + dx)] as u32;
                    }
                }
                data.push((sum / (f * f) as u32) as u8);
            }
        }

        Frame {
            data,
            width: dw,
            height: dh,
        }
    }

    /// Extract a rectangular region, clamped to the frame bounds.
    ///
    /// Returns the cropped luma bytes and the clamped (width, height).
    /// An entirely out-of-frame rectangle yields an empty crop.
    pub fn crop(&self, x: i32, y: i32, w: u32, h: u32) -> (Vec<u8>, u32, u32) {
        let x0 = x.max(0) as u32;
        let y0 = y.max(0) as u32;
        let x1 = (x.saturating_add(w as i32)).clamp(0, self.width as i32) as u32;
        let y1 = (y.saturating_add(h as i32)).clamp(0, self.height as i32) as u32;
        if x0 >= x1 || y0 >= y1 {
            return (Vec::new(), 0, 0);
        }

        let (cw, ch) = (x1 - x0, y1 - y0);
        let mut out = Vec::with_capacity((cw * ch) as usize);
        for row in y0..y1 {
            let start = (row * self.width + x0) as usize;
            out.extend_from_slice(&self.data[start..start + cw as usize]);
        }
        (out, cw, ch)
    }

    /// Expand luma into an RGB8 buffer for overlay drawing and display.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.data.len() * 3);
        for &p in &self.data {
            rgb.extend_from_slice(&[p, p, p]);
        }
        rgb
    }
}

/// Extract the Y channel from packed YUYV 4:2:2 ([Y0, U, Y1, V] per pixel
/// pair).
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::BufferTooShort {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}
