//! Per-frame motion measurement.
//!
//! `FrameMotionExtractor` composes the vision primitives into one
//! `MotionObservation` per frame: foreground mask, region-of-interest
//! intersection, morphological closing, contour filtering. Observations are
//! ephemeral; nothing here survives past the frame that produced it.

use anyhow::Result;

use crate::frame::Frame;
use crate::roi::RegionMask;
use crate::vision::{Contour, VisionBackend};

/// Motion measured in a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionObservation {
    /// Total significant foreground area as % of frame area.
    pub motion_percentage: f64,
    /// Area of the largest significant contour, 0 when none.
    pub largest_blob_area: f64,
    /// Number of contours above the area threshold.
    pub significant_blob_count: usize,
    /// Horizontal centroid of the largest significant contour.
    /// `None` when no significant contour exists.
    pub largest_blob_centroid_x: Option<f64>,
}

/// Turns raw frames into `MotionObservation`s.
pub struct FrameMotionExtractor {
    vision: Box<dyn VisionBackend>,
    region: RegionMask,
    kernel_size: u32,
}

impl FrameMotionExtractor {
    pub fn new(vision: Box<dyn VisionBackend>, region: RegionMask, kernel_size: u32) -> Self {
        Self {
            vision,
            region,
            kernel_size,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.vision.name()
    }

    /// Measure one frame under the currently active area threshold.
    ///
    /// The threshold is passed per call because the active profile may be
    /// swapped mid-run by the direction classifier.
    pub fn observe(&mut self, frame: &Frame, area_threshold: f64) -> Result<MotionObservation> {
        let (observation, _) = self.observe_masked(frame, area_threshold)?;
        Ok(observation)
    }

    /// `observe`, but also hands back the post-close foreground mask so
    /// debug mode can dump what the detector saw.
    pub fn observe_masked(
        &mut self,
        frame: &Frame,
        area_threshold: f64,
    ) -> Result<(MotionObservation, crate::roi::Mask)> {
        let mut foreground = self.vision.apply_background_model(frame)?;
        foreground.intersect(self.region.mask());
        self.vision
            .morphological_close(&mut foreground, self.kernel_size)?;
        let contours = self.vision.find_external_contours(&foreground)?;

        let mut total_motion_area = 0.0;
        let mut significant_blob_count = 0usize;
        let mut largest: Option<Contour> = None;

        for contour in contours {
            if contour.area > area_threshold {
                significant_blob_count += 1;
                total_motion_area += contour.area;
                if largest.map_or(true, |best| contour.area > best.area) {
                    largest = Some(contour);
                }
            }
        }

        let frame_area = f64::from(frame.width) * f64::from(frame.height);
        let motion_percentage = total_motion_area * 100.0 / frame_area;
        // A degenerate largest contour (zero mass) still reads as motion at
        // the frame's horizontal center.
        let largest_blob_centroid_x = largest
            .map(|contour| contour.centroid_x().unwrap_or(f64::from(frame.width) / 2.0));

        let observation = MotionObservation {
            motion_percentage,
            largest_blob_area: largest.map_or(0.0, |contour| contour.area),
            significant_blob_count,
            largest_blob_centroid_x,
        };
        Ok((observation, foreground))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::vision::{BackgroundSettings, FrameDiffBackend};

    fn full_frame_region(width: u32, height: u32) -> RegionMask {
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        RegionMask::from_normalized_polygon(&square, width, height).unwrap()
    }

    fn grey_frame(width: u32, height: u32, level: u8) -> Frame {
        Frame::new(vec![level; width as usize * height as usize * 3], width, height)
    }

    fn frame_with_block(width: u32, height: u32, x0: u32, w: u32) -> Frame {
        let mut data = vec![40u8; width as usize * height as usize * 3];
        for y in 0..height {
            for x in x0..(x0 + w) {
                let idx = (y as usize * width as usize + x as usize) * 3;
                data[idx] = 220;
                data[idx + 1] = 220;
                data[idx + 2] = 220;
            }
        }
        Frame::new(data, width, height)
    }

    fn extractor(width: u32, height: u32) -> FrameMotionExtractor {
        FrameMotionExtractor::new(
            Box::new(FrameDiffBackend::new(BackgroundSettings::default())),
            full_frame_region(width, height),
            2,
        )
    }

    #[test]
    fn static_frame_yields_empty_observation() {
        let mut extractor = extractor(32, 32);
        extractor.observe(&grey_frame(32, 32, 40), 4.0).unwrap();
        let obs = extractor.observe(&grey_frame(32, 32, 40), 4.0).unwrap();
        assert_eq!(obs, MotionObservation::default());
    }

    #[test]
    fn moving_block_is_measured() {
        let mut extractor = extractor(40, 20);
        extractor.observe(&grey_frame(40, 20, 40), 4.0).unwrap();
        let obs = extractor
            .observe(&frame_with_block(40, 20, 10, 8), 4.0)
            .unwrap();

        assert_eq!(obs.significant_blob_count, 1);
        assert_eq!(obs.largest_blob_area, (8 * 20) as f64);
        let expected_pct = (8 * 20) as f64 * 100.0 / (40 * 20) as f64;
        assert!((obs.motion_percentage - expected_pct).abs() < 1e-9);
        // The even 2x2 closing kernel shifts the block half a pixel left:
        // columns 9..=16 average to 12.5.
        assert!((obs.largest_blob_centroid_x.unwrap() - 12.5).abs() < 1e-9);
    }

    #[test]
    fn small_blobs_fall_below_area_threshold() {
        let mut extractor = extractor(40, 20);
        extractor.observe(&grey_frame(40, 20, 40), 500.0).unwrap();
        let obs = extractor
            .observe(&frame_with_block(40, 20, 10, 8), 500.0)
            .unwrap();

        assert_eq!(obs.significant_blob_count, 0);
        assert_eq!(obs.largest_blob_area, 0.0);
        assert_eq!(obs.largest_blob_centroid_x, None);
    }
}
