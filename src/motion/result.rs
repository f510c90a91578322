//! Final per-video motion result and speed derivation.
//!
//! `MotionResult` is immutable once built. Unset frame fields are `Option`
//! internally; the legacy −1 sentinel is reconstructed only at the
//! serialization boundary (`WireResult`) so persisted rows keep the original
//! on-the-wire contract.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::frame::VideoInfo;
use crate::motion::profile::Direction;
use crate::motion::tracker::TrackerSummary;

/// Calibrated field-of-view length along the travel direction. The two
/// differ because the region of interest is not symmetric.
const FIELD_OF_VIEW_FEET_LEFT_TO_RIGHT: f64 = 155.0;
const FIELD_OF_VIEW_FEET_RIGHT_TO_LEFT: f64 = 165.0;

/// 3600 / 5280: feet-per-second to miles-per-hour.
const FPS_TO_MPH: f64 = 0.681818;

/// Immutable outcome of analyzing one video.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionResult {
    pub video: VideoInfo,
    pub detection_time: Option<NaiveDateTime>,
    pub total_frames_processed: u32,
    pub first_motion_frame: Option<u32>,
    pub last_motion_frame: Option<u32>,
    pub first_motion_x: Option<f64>,
    pub is_rejected: bool,
}

impl MotionResult {
    pub fn new(
        video: VideoInfo,
        detection_time: Option<NaiveDateTime>,
        summary: TrackerSummary,
    ) -> Self {
        Self {
            video,
            detection_time,
            total_frames_processed: summary.frames_processed,
            first_motion_frame: summary.first_motion_frame,
            last_motion_frame: summary.last_motion_frame,
            first_motion_x: summary.first_motion_x,
            is_rejected: summary.is_rejected,
        }
    }

    /// True when sustained motion was observed and the video passed the
    /// noise gate. Distinct from rejection: a quiet video has
    /// `has_motion() == false` with `is_rejected == false`.
    pub fn has_motion(&self) -> bool {
        self.first_motion_frame.is_some() && !self.is_rejected
    }

    pub fn direction(&self) -> Direction {
        if !self.has_motion() {
            return Direction::Unknown;
        }
        match self.first_motion_x {
            Some(x) if x < f64::from(self.video.frame_width) / 2.0 => Direction::LeftToRight,
            Some(_) => Direction::RightToLeft,
            None => Direction::Unknown,
        }
    }

    pub fn first_motion_time(&self) -> Option<f64> {
        self.motion_time(self.first_motion_frame)
    }

    pub fn last_motion_time(&self) -> Option<f64> {
        self.motion_time(self.last_motion_frame)
    }

    fn motion_time(&self, frame: Option<u32>) -> Option<f64> {
        if !self.has_motion() || self.video.fps <= 0.0 {
            return None;
        }
        frame.map(|f| f64::from(f) / self.video.fps)
    }

    fn field_of_view_feet(&self) -> f64 {
        match self.direction() {
            Direction::LeftToRight => FIELD_OF_VIEW_FEET_LEFT_TO_RIGHT,
            _ => FIELD_OF_VIEW_FEET_RIGHT_TO_LEFT,
        }
    }

    /// Estimated speed in miles per hour; 0 when no motion was measured or
    /// the motion interval is degenerate.
    pub fn speed_mph(&self) -> f64 {
        if !self.has_motion() {
            return 0.0;
        }
        let (Some(first), Some(last)) = (self.first_motion_frame, self.last_motion_frame) else {
            return 0.0;
        };
        let duration_frames = i64::from(last) - i64::from(first);
        if duration_frames <= 0 || self.video.fps <= 0.0 {
            return 0.0;
        }

        let duration_secs = duration_frames as f64 / self.video.fps;
        let feet_per_second = self.field_of_view_feet() / duration_secs;
        feet_per_second * FPS_TO_MPH
    }

    /// Human-readable report, printed after each processed video.
    pub fn summary(&self) -> String {
        let detection_time = self
            .detection_time
            .map(|t| t.format("%Y-%m-%d %I:%M:%S %p").to_string())
            .unwrap_or_else(|| "N/A".to_string());

        let details = if self.has_motion() {
            let first = self.first_motion_frame.unwrap_or_default();
            let last = self.last_motion_frame.unwrap_or_default();
            let duration_frames = i64::from(last) - i64::from(first);
            format!(
                "  First motion at frame: {} (time: {:.2}s)\n  \
                 Last motion at frame: {} (time: {:.2}s)\n  \
                 Motion duration: {} frames ({:.2} seconds)\n  \
                 Direction: {}\n  \
                 Calculated speed: {:.1} mph",
                first,
                self.first_motion_time().unwrap_or_default(),
                last,
                self.last_motion_time().unwrap_or_default(),
                duration_frames,
                duration_frames as f64 / self.video.fps,
                self.direction(),
                self.speed_mph()
            )
        } else if self.is_rejected {
            "  Video rejected due to noise".to_string()
        } else {
            "  No significant motion detected".to_string()
        };

        format!(
            "Motion detection results:\n  Detection time: {}\n  \
             Total frames: {}\n  Distance: {:.0} feet\n{}",
            detection_time,
            self.total_frames_processed,
            self.field_of_view_feet(),
            details
        )
    }

    /// Serialization form with the legacy −1 sentinels.
    pub fn wire(&self) -> WireResult {
        WireResult {
            video: self.video,
            detection_time: self
                .detection_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
            total_frames_processed: self.total_frames_processed,
            first_motion_frame: self.first_motion_frame.map_or(-1, i64::from),
            last_motion_frame: self.last_motion_frame.map_or(-1, i64::from),
            first_motion_x: self.first_motion_x.unwrap_or(-1.0),
            has_motion: self.has_motion(),
            is_rejected: self.is_rejected,
            direction: self.direction(),
            first_motion_time: self.first_motion_time().unwrap_or(-1.0),
            last_motion_time: self.last_motion_time().unwrap_or(-1.0),
            speed_mph: self.speed_mph(),
        }
    }
}

/// On-the-wire rendition of a `MotionResult`: −1 means "unset".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireResult {
    pub video: VideoInfo,
    pub detection_time: Option<String>,
    pub total_frames_processed: u32,
    pub first_motion_frame: i64,
    pub last_motion_frame: i64,
    pub first_motion_x: f64,
    pub has_motion: bool,
    pub is_rejected: bool,
    pub direction: Direction,
    pub first_motion_time: f64,
    pub last_motion_time: f64,
    pub speed_mph: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> VideoInfo {
        VideoInfo {
            fps: 30.0,
            frame_width: 640,
            frame_height: 480,
            total_frames: 400,
        }
    }

    fn summary(
        first: Option<u32>,
        last: Option<u32>,
        x: Option<f64>,
        rejected: bool,
    ) -> TrackerSummary {
        TrackerSummary {
            frames_processed: 400,
            first_motion_frame: first,
            last_motion_frame: last,
            first_motion_x: x,
            is_rejected: rejected,
        }
    }

    #[test]
    fn left_to_right_speed_arithmetic() {
        let result = MotionResult::new(
            video(),
            None,
            summary(Some(61), Some(178), Some(100.0), false),
        );
        assert_eq!(result.direction(), Direction::LeftToRight);
        // 155 ft / (117 frames / 30 fps) * 0.681818
        assert!((result.speed_mph() - 27.0979).abs() < 1e-3);
        assert!((result.first_motion_time().unwrap() - 61.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn right_to_left_uses_the_longer_field_of_view() {
        let result = MotionResult::new(
            video(),
            None,
            summary(Some(61), Some(178), Some(500.0), false),
        );
        assert_eq!(result.direction(), Direction::RightToLeft);
        let expected = 165.0 / (117.0 / 30.0) * 0.681818;
        assert!((result.speed_mph() - expected).abs() < 1e-9);
    }

    #[test]
    fn no_motion_means_zero_speed_and_unknown_direction() {
        let result = MotionResult::new(video(), None, summary(None, None, None, false));
        assert!(!result.has_motion());
        assert_eq!(result.direction(), Direction::Unknown);
        assert_eq!(result.speed_mph(), 0.0);
        assert_eq!(result.first_motion_time(), None);
    }

    #[test]
    fn degenerate_interval_means_zero_speed() {
        let result = MotionResult::new(
            video(),
            None,
            summary(Some(100), Some(100), Some(10.0), false),
        );
        assert!(result.has_motion());
        assert_eq!(result.speed_mph(), 0.0);
    }

    #[test]
    fn rejection_excludes_motion() {
        let result = MotionResult::new(video(), None, summary(None, None, None, true));
        assert!(result.is_rejected);
        assert!(!result.has_motion());
        assert_eq!(result.speed_mph(), 0.0);

        let wire = result.wire();
        assert_eq!(wire.first_motion_frame, -1);
        assert_eq!(wire.last_motion_frame, -1);
        assert_eq!(wire.first_motion_x, -1.0);
        assert!(wire.is_rejected);
    }

    #[test]
    fn direction_is_consistent_with_starting_centroid() {
        for (x, expected) in [
            (0.0, Direction::LeftToRight),
            (319.9, Direction::LeftToRight),
            (320.0, Direction::RightToLeft),
            (639.0, Direction::RightToLeft),
        ] {
            let result = MotionResult::new(
                video(),
                None,
                summary(Some(10), Some(50), Some(x), false),
            );
            assert_eq!(result.direction(), expected, "x = {}", x);
        }
    }

    #[test]
    fn wire_round_trips_through_json() {
        let result = MotionResult::new(
            video(),
            None,
            summary(Some(61), Some(178), Some(100.0), false),
        );
        let json = serde_json::to_string(&result.wire()).unwrap();
        let back: WireResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.first_motion_frame, 61);
        assert_eq!(back.direction, Direction::LeftToRight);
        assert!(back.has_motion);
    }

    #[test]
    fn summary_text_covers_all_outcomes() {
        let moving = MotionResult::new(
            video(),
            None,
            summary(Some(61), Some(178), Some(100.0), false),
        );
        assert!(moving.summary().contains("Calculated speed"));

        let quiet = MotionResult::new(video(), None, summary(None, None, None, false));
        assert!(quiet.summary().contains("No significant motion"));

        let rejected = MotionResult::new(video(), None, summary(None, None, None, true));
        assert!(rejected.summary().contains("rejected due to noise"));
    }
}
