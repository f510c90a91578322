//! OpenCV-backed video decoding.
//!
//! Wraps `VideoCapture` for real container formats. Frames are converted to
//! tightly packed RGB24 before they cross into the pipeline.

use anyhow::{anyhow, Context, Result};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgproc, videoio};

use super::SourceStats;
use crate::frame::{Frame, VideoInfo};

pub(crate) struct OpenCvCapture {
    capture: videoio::VideoCapture,
    info: VideoInfo,
    path: String,
    frames_read: u64,
}

impl OpenCvCapture {
    pub(crate) fn open(path: &str) -> Result<Self> {
        let capture = videoio::VideoCapture::from_file(path, videoio::CAP_ANY)
            .with_context(|| format!("open video '{}'", path))?;
        if !capture.is_opened().context("query capture state")? {
            return Err(anyhow!("cannot open video '{}'", path));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS).context("read fps")?;
        let frame_width = capture
            .get(videoio::CAP_PROP_FRAME_WIDTH)
            .context("read frame width")? as u32;
        let frame_height = capture
            .get(videoio::CAP_PROP_FRAME_HEIGHT)
            .context("read frame height")? as u32;
        let total_frames = capture
            .get(videoio::CAP_PROP_FRAME_COUNT)
            .context("read frame count")?
            .max(0.0) as u64;

        if fps <= 0.0 || frame_width == 0 || frame_height == 0 {
            return Err(anyhow!(
                "video '{}' reports unusable stream properties (fps={}, {}x{})",
                path,
                fps,
                frame_width,
                frame_height
            ));
        }

        let info = VideoInfo {
            fps,
            frame_width,
            frame_height,
            total_frames,
        };
        log::info!("VideoSource: opened {} (opencv)", path);

        Ok(Self {
            capture,
            info,
            path: path.to_string(),
            frames_read: 0,
        })
    }

    pub(crate) fn info(&self) -> VideoInfo {
        self.info
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut bgr = Mat::default();
        let got = self
            .capture
            .read(&mut bgr)
            .context("read frame from capture")?;
        if !got || bgr.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .context("convert frame to RGB")?;
        let owned = rgb.try_clone().context("copy frame buffer")?;
        let bytes = owned.data_bytes().context("read frame bytes")?;

        self.frames_read += 1;
        Ok(Some(Frame::new(
            bytes.to_vec(),
            rgb.cols() as u32,
            rgb.rows() as u32,
        )))
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frames_read,
            path: self.path.clone(),
        }
    }
}
