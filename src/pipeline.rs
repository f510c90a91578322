//! Per-video analysis pipeline and batch processing.
//!
//! `analyze_video` wires the collaborators together for one video: open the
//! source, rasterize the region mask, then stream every frame through the
//! motion extractor into the tracker. `process_videos` runs a file or a
//! directory of files, persisting each result independently.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use regex::Regex;

use crate::config::SpeedcamConfig;
use crate::debug;
use crate::ingest::VideoSource;
use crate::motion::{
    FrameMotionExtractor, MotionResult, MotionTracker, TrackerStep, TrackingPhase,
};
use crate::roi::RegionMask;
use crate::storage::ResultStore;
use crate::vision::{FrameDiffBackend, VisionBackend};

const FRAME_PROGRESS_INTERVAL: u32 = 25;

const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

fn build_vision_backend(config: &SpeedcamConfig) -> Result<Box<dyn VisionBackend>> {
    match config.vision.backend.as_str() {
        "frame-diff" => Ok(Box::new(FrameDiffBackend::new(config.vision.background))),
        "opencv" => {
            #[cfg(feature = "backend-opencv")]
            {
                Ok(Box::new(crate::vision::OpenCvBackend::new(
                    config.vision.background,
                )?))
            }
            #[cfg(not(feature = "backend-opencv"))]
            {
                Err(anyhow!(
                    "vision backend 'opencv' requires the backend-opencv feature"
                ))
            }
        }
        other => Err(anyhow!("unknown vision backend '{}'", other)),
    }
}

/// Analyze a single video to completion (or early noise rejection).
pub fn analyze_video(
    path: &str,
    config: &SpeedcamConfig,
    debug_mode: bool,
) -> Result<MotionResult> {
    let started = Instant::now();
    let (info, mut source) = VideoSource::open(path)?;
    log::info!(
        "video properties: {:.2} fps, {}x{}, {} frames ({:.2}s)",
        info.fps,
        info.frame_width,
        info.frame_height,
        info.total_frames,
        info.duration_secs()
    );

    let detection_time = detection_time_from_path(path);
    let region = RegionMask::from_normalized_polygon(
        &config.region_polygon,
        info.frame_width,
        info.frame_height,
    )?;
    let vision = build_vision_backend(config)?;
    let mut extractor = FrameMotionExtractor::new(vision, region, config.vision.kernel_size);
    let mut tracker = MotionTracker::new(config.gates, config.profiles, info.frame_width);
    log::debug!("vision backend: {}", extractor.backend_name());

    while let Some(frame) = source.next_frame()? {
        let frame_index = tracker.frame_index();

        let (observation, mask) = if debug_mode {
            let (observation, mask) =
                extractor.observe_masked(&frame, tracker.area_threshold())?;
            (observation, Some(mask))
        } else {
            (extractor.observe(&frame, tracker.area_threshold())?, None)
        };

        let step = tracker.observe(&observation);
        let sustained = tracker.phase() == TrackingPhase::Sustained;

        if debug_mode {
            debug::dump_frame(&frame, &config.debug_dir, frame_index, sustained)?;
            if let Some(mask) = &mask {
                if observation.significant_blob_count > 0 || sustained {
                    debug::dump_mask(mask, &config.debug_dir, frame_index)?;
                }
            }
            log::debug!(
                "frame {}: motion={:.4}%, largest={:.0}, contours={}, consecutive={}, sustained={}",
                frame_index,
                observation.motion_percentage,
                observation.largest_blob_area,
                observation.significant_blob_count,
                tracker.consecutive_motion_frames(),
                sustained
            );
        } else if frame_index % FRAME_PROGRESS_INTERVAL == 0 {
            log::info!(
                "frame {}: motion={:.4}%, largest={:.0}, contours={}",
                frame_index,
                observation.motion_percentage,
                observation.largest_blob_area,
                observation.significant_blob_count
            );
        }

        if step == TrackerStep::Rejected {
            break;
        }
    }

    let stats = source.stats();
    log::info!(
        "analyzed {} frames from {} in {:.2}s",
        stats.frames_read,
        stats.path,
        started.elapsed().as_secs_f64()
    );

    Ok(MotionResult::new(info, detection_time, tracker.finish()))
}

/// Process a file, a directory of videos, or a `stub://` scene.
///
/// Results are keyed by path. Persistence is fire-and-forget: insert
/// failures are logged and never abort the batch.
pub fn process_videos(
    input: &str,
    config: &SpeedcamConfig,
    mut store: Option<&mut dyn ResultStore>,
    debug_mode: bool,
) -> Result<BTreeMap<String, MotionResult>> {
    let paths = collect_video_paths(input)?;
    let mut results = BTreeMap::new();

    for path in paths {
        log::info!("processing {}", path);
        let result = analyze_video(&path, config, debug_mode)?;

        if let Some(store) = store.as_mut() {
            if let Err(e) = store.insert(&result, &path) {
                log::warn!("failed to persist result for {}: {}", path, e);
            }
        }
        results.insert(path, result);
    }

    Ok(results)
}

/// Expand the input into an ordered list of video paths.
fn collect_video_paths(input: &str) -> Result<Vec<String>> {
    if input.starts_with("stub://") {
        return Ok(vec![input.to_string()]);
    }

    let path = Path::new(input);
    if !path.exists() {
        return Err(anyhow!("path does not exist: {}", input));
    }
    if !path.is_dir() {
        return Ok(vec![input.to_string()]);
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if !entry_path.is_file() {
            continue;
        }
        let recognized = entry_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if recognized {
            paths.push(entry_path.to_string_lossy().into_owned());
        }
    }
    paths.sort();

    if paths.is_empty() {
        log::warn!("no video files found in directory: {}", input);
    } else {
        log::info!("found {} video files to process", paths.len());
    }
    Ok(paths)
}

/// Parse the capture timestamp out of camera filenames like
/// `Road Cam 6-7-2025, 2.05.46pm PDT - front.mp4`. Non-matching names
/// yield `None` rather than an error.
pub fn detection_time_from_path(path: &str) -> Option<NaiveDateTime> {
    static TIMESTAMP_RE: OnceLock<Regex> = OnceLock::new();
    let re = TIMESTAMP_RE.get_or_init(|| {
        Regex::new(r"(\d{1,2})-(\d{1,2})-(\d{4}),\s*(\d{1,2})\.(\d{1,2})\.(\d{1,2})\s*([AaPp][Mm])")
            .expect("valid timestamp regex")
    });

    let name = Path::new(path).file_name()?.to_str()?;
    let caps = re.captures(name)?;
    let normalized = format!(
        "{}-{}-{}, {}.{}.{}{}",
        &caps[1],
        &caps[2],
        &caps[3],
        &caps[4],
        &caps[5],
        &caps[6],
        caps[7].to_uppercase()
    );
    NaiveDateTime::parse_from_str(&normalized, "%m-%d-%Y, %I.%M.%S%p").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn camera_filenames_parse_to_timestamps() {
        let parsed =
            detection_time_from_path("videos/Road Cam 6-7-2025, 2.05.46pm PDT - front.mp4")
                .unwrap();
        assert_eq!(parsed.year(), 2025);
        assert_eq!(parsed.month(), 6);
        assert_eq!(parsed.day(), 7);
        assert_eq!(parsed.hour(), 14);
        assert_eq!(parsed.minute(), 5);
        assert_eq!(parsed.second(), 46);
    }

    #[test]
    fn morning_timestamps_stay_in_the_morning() {
        let parsed = detection_time_from_path("Road Cam 6-9-2025, 9.57.54am - x.mp4").unwrap();
        assert_eq!(parsed.hour(), 9);
    }

    #[test]
    fn unrelated_filenames_have_no_timestamp() {
        assert_eq!(detection_time_from_path("videos/plain.mp4"), None);
        assert_eq!(detection_time_from_path("stub://car-ltr"), None);
    }

    #[test]
    fn directory_listing_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.MOV", "notes.txt", "c.webm"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let paths = collect_video_paths(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(paths.len(), 3);
        let names: Vec<_> = paths
            .iter()
            .map(|p| Path::new(p).file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.MOV", "b.mp4", "c.webm"]);
    }

    #[test]
    fn missing_paths_are_fatal() {
        assert!(collect_video_paths("/no/such/place").is_err());
    }
}
