//! Vision primitive backends.
//!
//! Backends supply the image-processing steps the motion extractor composes:
//! background-model application, morphological closing, and external-contour
//! extraction. Two implementations:
//!
//! - `FrameDiffBackend`: always available, pure Rust. Running-average
//!   grayscale background with per-pixel differencing.
//! - `OpenCvBackend` (feature `backend-opencv`): MOG2 background subtraction,
//!   matching the deployed camera calibration.
//!
//! Backends are stateful and order-dependent: the background model updates
//! incrementally per call, so frames MUST be presented in stream order.

mod frame_diff;
#[cfg(feature = "backend-opencv")]
mod opencv;

pub use self::frame_diff::FrameDiffBackend;
#[cfg(feature = "backend-opencv")]
pub use self::opencv::OpenCvBackend;

use anyhow::Result;

use crate::frame::Frame;
use crate::roi::Mask;

/// One external contour of a foreground blob.
///
/// Carries the zeroth and first-order horizontal spatial moments so the
/// caller can derive the centroid without retaining pixel data.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Contour {
    pub area: f64,
    pub m00: f64,
    pub m10: f64,
}

impl Contour {
    /// Horizontal centroid, or `None` when the zeroth moment is zero.
    pub fn centroid_x(&self) -> Option<f64> {
        if self.m00 != 0.0 {
            Some(self.m10 / self.m00)
        } else {
            None
        }
    }
}

/// Image-processing primitives consumed by the motion extractor.
pub trait VisionBackend {
    /// Backend identifier for logs and config.
    fn name(&self) -> &'static str;

    /// Feed one frame to the stateful background model; returns the raw
    /// foreground mask. Must be called exactly once per frame, in order.
    fn apply_background_model(&mut self, frame: &Frame) -> Result<Mask>;

    /// Morphological closing (dilate then erode) with a roughly elliptical
    /// structuring element of the given size, merging fragmented blobs.
    fn morphological_close(&self, mask: &mut Mask, kernel_size: u32) -> Result<()>;

    /// External contours of the mask's foreground blobs; holes are ignored.
    fn find_external_contours(&self, mask: &Mask) -> Result<Vec<Contour>>;
}

/// Background-model settings shared by the backends.
#[derive(Clone, Copy, Debug)]
pub struct BackgroundSettings {
    /// MOG2 history length (OpenCV backend).
    pub history: i32,
    /// MOG2 variance threshold; lower is more sensitive (OpenCV backend).
    pub var_threshold: f64,
    /// MOG2 shadow detection (OpenCV backend).
    pub detect_shadows: bool,
    /// Running-average adaptation rate (frame-diff backend).
    pub learning_rate: f64,
    /// Per-pixel absolute luma difference flagged as foreground
    /// (frame-diff backend).
    pub diff_threshold: u8,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            history: 10,
            var_threshold: 16.0,
            detect_shadows: true,
            learning_rate: 0.05,
            diff_threshold: 25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_requires_mass() {
        let empty = Contour::default();
        assert_eq!(empty.centroid_x(), None);

        let blob = Contour {
            area: 4.0,
            m00: 4.0,
            m10: 12.0,
        };
        assert_eq!(blob.centroid_x(), Some(3.0));
    }
}
