//! Video ingestion sources.
//!
//! `VideoSource::open` resolves a path to a decoding backend:
//! - `stub://` paths select the synthetic source (deterministic scripted
//!   scenes used by tests and demos)
//! - anything else requires the `backend-opencv` feature and is decoded with
//!   OpenCV's `VideoCapture`
//!
//! Sources yield frames strictly in stream order until exhausted. A path that
//! cannot be opened is a fatal error for that video and is not retried.

#[cfg(feature = "backend-opencv")]
pub(crate) mod opencv;
pub(crate) mod synthetic;

use anyhow::{anyhow, Result};

use crate::frame::{Frame, VideoInfo};
#[cfg(feature = "backend-opencv")]
use self::opencv::OpenCvCapture;
use self::synthetic::SyntheticSource;

/// Statistics for a video source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_read: u64,
    pub path: String,
}

/// A finite, sequential stream of decoded frames.
pub struct VideoSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "backend-opencv")]
    OpenCv(OpenCvCapture),
}

impl VideoSource {
    /// Open a video and derive its stream metadata.
    pub fn open(path: &str) -> Result<(VideoInfo, Self)> {
        if !is_local_file_path(path) {
            return Err(anyhow!(
                "video ingestion only supports local paths (no URL schemes)"
            ));
        }
        if path.starts_with("stub://") {
            let source = SyntheticSource::open(path)?;
            let info = source.info();
            return Ok((
                info,
                Self {
                    backend: SourceBackend::Synthetic(source),
                },
            ));
        }

        #[cfg(feature = "backend-opencv")]
        {
            let source = OpenCvCapture::open(path)?;
            let info = source.info();
            Ok((
                info,
                Self {
                    backend: SourceBackend::OpenCv(source),
                },
            ))
        }
        #[cfg(not(feature = "backend-opencv"))]
        {
            Err(anyhow!(
                "decoding '{}' requires the backend-opencv feature",
                path
            ))
        }
    }

    /// Next frame in stream order; `Ok(None)` once the stream is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "backend-opencv")]
            SourceBackend::OpenCv(source) => source.next_frame(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "backend-opencv")]
            SourceBackend::OpenCv(source) => source.stats(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_url_schemes() {
        assert!(VideoSource::open("rtsp://camera-1/stream").is_err());
        assert!(VideoSource::open("").is_err());
    }

    #[test]
    fn stub_paths_open_synthetic_scenes() {
        let (info, mut source) = VideoSource::open("stub://empty").unwrap();
        assert_eq!(info.frame_width, 640);
        assert_eq!(info.frame_height, 480);
        assert!(info.fps > 0.0);

        let mut frames = 0u64;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.width, info.frame_width);
            frames += 1;
        }
        assert_eq!(frames, info.total_frames);
        assert_eq!(source.stats().frames_read, frames);
    }

    #[test]
    fn unknown_stub_scene_is_an_error() {
        assert!(VideoSource::open("stub://no-such-scene").is_err());
    }
}
