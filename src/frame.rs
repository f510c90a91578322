//! Frame and stream metadata types.
//!
//! - `Frame`: owned RGB24 pixel container produced by the ingestion layer.
//! - `VideoInfo`: immutable stream metadata derived once at open time.
//!
//! Frames are per-iteration transients: the pipeline processes one frame,
//! drops it, then asks the source for the next. Nothing in the core retains
//! pixel data across frames, which bounds peak memory regardless of video
//! length.

use serde::{Deserialize, Serialize};

/// Immutable metadata for an open video stream.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VideoInfo {
    /// Frames per second as reported by the container.
    pub fps: f64,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Total frame count as reported by the container; 0 when unknown.
    pub total_frames: u64,
}

impl VideoInfo {
    /// Duration in seconds, derived from the reported frame count.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.frame_width) * u64::from(self.frame_height)
    }
}

/// One decoded video frame, RGB24, row-major, no padding.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Create a frame from a tightly packed RGB24 buffer.
    ///
    /// Called only by the ingestion layer.
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 3);
        Self {
            data,
            width,
            height,
        }
    }

    /// Read-only pixel access for vision backends and debug dumps.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Luma value of the pixel at (x, y) using integer Rec.601 weights.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let r = u32::from(self.data[idx]);
        let g = u32::from(self.data[idx + 1]);
        let b = u32::from(self.data[idx + 2]);
        ((r * 299 + g * 587 + b * 114) / 1000) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_info_duration() {
        let info = VideoInfo {
            fps: 30.0,
            frame_width: 640,
            frame_height: 480,
            total_frames: 300,
        };
        assert!((info.duration_secs() - 10.0).abs() < 1e-9);
        assert_eq!(info.pixel_count(), 640 * 480);
    }

    #[test]
    fn luma_of_uniform_grey_pixel() {
        let frame = Frame::new(vec![100; 3], 1, 1);
        assert_eq!(frame.luma_at(0, 0), 100);
    }
}
