//! Video frame types and processing

use crate::CameraError;
use image::ImageFormat;

/// Decoded RGB video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since the Unix epoch)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a frame from raw RGB data, checking the buffer length
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self, CameraError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CameraError::FrameSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_ns: now_ns(),
            sequence: 0,
        })
    }

    /// Decode a JPEG image (one MJPEG frame) into RGB
    pub fn from_jpeg(bytes: &[u8]) -> Result<Self, CameraError> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
            .map_err(|e| CameraError::Decode(e.to_string()))?;
        let (width, height) = (img.width(), img.height());
        Self::from_rgb(img.to_rgb8().into_raw(), width, height)
    }

    /// Single-colour frame, mostly useful for synthetic feeds
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            data,
            width,
            height,
            timestamp_ns: now_ns(),
            sequence: 0,
        }
    }

    /// Frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when the frame carries no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Resize frame using nearest-neighbour sampling
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        let mut resized = Vec::with_capacity(new_width as usize * new_height as usize * 3);

        if self.is_empty() {
            resized.resize(new_width as usize * new_height as usize * 3, 0);
        } else {
            let x_ratio = self.width as f32 / new_width.max(1) as f32;
            let y_ratio = self.height as f32 / new_height.max(1) as f32;

            for y in 0..new_height {
                let src_y = ((y as f32 * y_ratio) as u32).min(self.height - 1);
                for x in 0..new_width {
                    let src_x = ((x as f32 * x_ratio) as u32).min(self.width - 1);
                    let pixel = self.get_pixel(src_x, src_y).unwrap_or([0, 0, 0]);
                    resized.extend_from_slice(&pixel);
                }
            }
        }

        VideoFrame {
            data: resized,
            width: new_width,
            height: new_height,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        }
    }

    /// Downscaled luminance thumbnail, each value normalised to 0..1
    pub fn luminance_thumbnail(&self, width: u32, height: u32) -> Vec<f32> {
        self.resize(width, height)
            .data
            .chunks_exact(3)
            .map(|p| luminance(p[0], p[1], p[2]) / 255.0)
            .collect()
    }
}

// Luminance formula: 0.299*R + 0.587*G + 0.114*B
fn luminance(r: u8, g: u8, b: u8) -> f32 {
    r as f32 * 0.299 + g as f32 * 0.587 + b as f32 * 0.114
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
