//! OpenCV-backed vision primitives.
//!
//! MOG2 background subtraction with morphological closing and external
//! contour extraction. This is the calibrated production path; the settings
//! default to the deployed camera's tuning (short history, variance
//! threshold 16, shadow detection on).

use anyhow::{Context, Result};
use opencv::core::{Mat, Point, Ptr, Size, Vector};
use opencv::prelude::*;
use opencv::{imgproc, video};

use crate::frame::Frame;
use crate::roi::Mask;
use crate::vision::{BackgroundSettings, Contour, VisionBackend};

pub struct OpenCvBackend {
    subtractor: Ptr<video::BackgroundSubtractorMOG2>,
}

impl OpenCvBackend {
    pub fn new(settings: BackgroundSettings) -> Result<Self> {
        let subtractor = video::create_background_subtractor_mog2(
            settings.history,
            settings.var_threshold,
            settings.detect_shadows,
        )
        .context("create MOG2 background subtractor")?;
        Ok(Self { subtractor })
    }
}

impl VisionBackend for OpenCvBackend {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn apply_background_model(&mut self, frame: &Frame) -> Result<Mask> {
        let mat = rgb_to_mat(frame)?;
        let mut foreground = Mat::default();
        self.subtractor
            .apply(&mat, &mut foreground, -1.0)
            .context("apply background model")?;
        mat_to_mask(&foreground)
    }

    fn morphological_close(&self, mask: &mut Mask, kernel_size: u32) -> Result<()> {
        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_ELLIPSE,
            Size::new(kernel_size as i32, kernel_size as i32),
            Point::new(-1, -1),
        )
        .context("build structuring element")?;

        let src = mask_to_mat(mask)?;
        let mut dst = Mat::default();
        imgproc::morphology_ex(
            &src,
            &mut dst,
            imgproc::MORPH_CLOSE,
            &kernel,
            Point::new(-1, -1),
            1,
            opencv::core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value().context("default border value")?,
        )
        .context("morphological close")?;

        *mask = mat_to_mask(&dst)?;
        Ok(())
    }

    fn find_external_contours(&self, mask: &Mask) -> Result<Vec<Contour>> {
        let mat = mask_to_mat(mask)?;
        let mut raw: Vector<Vector<Point>> = Vector::new();
        imgproc::find_contours(
            &mat,
            &mut raw,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .context("find contours")?;

        let mut contours = Vec::with_capacity(raw.len());
        for contour in raw.iter() {
            let area = imgproc::contour_area(&contour, false).context("contour area")?;
            let moments = imgproc::moments(&contour, false).context("contour moments")?;
            contours.push(Contour {
                area,
                m00: moments.m00,
                m10: moments.m10,
            });
        }
        Ok(contours)
    }
}

fn rgb_to_mat(frame: &Frame) -> Result<Mat> {
    let flat = Mat::from_slice(frame.pixels()).context("wrap frame pixels")?;
    let shaped = flat
        .reshape(3, frame.height as i32)
        .context("reshape frame to rows")?;
    shaped.try_clone().context("copy frame mat")
}

fn mask_to_mat(mask: &Mask) -> Result<Mat> {
    let flat = Mat::from_slice(mask.bytes()).context("wrap mask bytes")?;
    let shaped = flat
        .reshape(1, mask.height as i32)
        .context("reshape mask to rows")?;
    shaped.try_clone().context("copy mask mat")
}

fn mat_to_mask(mat: &Mat) -> Result<Mask> {
    // try_clone yields a continuous buffer even when the source is a view.
    let owned = mat.try_clone().context("copy mat")?;
    let bytes = owned.data_bytes().context("read mask bytes")?;
    Ok(Mask::from_raw(
        bytes.to_vec(),
        mat.cols() as u32,
        mat.rows() as u32,
    ))
}
