//! The sustained-motion state machine and early-noise gate.
//!
//! One `MotionTracker` per video. Phases:
//!
//! ```text
//! Idle -> Accumulating -> Sustained -> Passed
//!   ^---------'              |
//!           (motion streak broke before it counted as sustained)
//! ```
//!
//! `Passed` is terminal: one vehicle is measured per video, and later motion
//! never re-enters `Sustained`. The first time `Sustained` is entered, the
//! first-motion frame is back-dated to the start of the qualifying streak,
//! the starting centroid is captured, and the direction classifier swaps the
//! active threshold profile exactly once.

use crate::motion::observation::MotionObservation;
use crate::motion::profile::{classify_direction, Direction, ProfileTable, ThresholdProfile};

/// Gating constants that sit outside the per-direction profiles.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GateSettings {
    /// Frames at the start of the stream that never count as motion, giving
    /// the background model time to settle.
    pub initial_frame_skip: u32,
    /// Frame index at which the noise gate fires.
    pub early_frame_cutoff: u32,
    /// Early-motion ratio above which the whole video is rejected.
    pub noise_threshold: f64,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            initial_frame_skip: 5,
            early_frame_cutoff: 80,
            noise_threshold: 0.55,
        }
    }
}

/// Tracking phase. See the module docs for the transition graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingPhase {
    Idle,
    Accumulating,
    Sustained,
    Passed,
}

/// Outcome of feeding one observation to the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerStep {
    Continue,
    /// The noise gate fired; the caller must stop feeding frames.
    Rejected,
}

/// Final tracker state, consumed to build a `MotionResult`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerSummary {
    pub frames_processed: u32,
    pub first_motion_frame: Option<u32>,
    pub last_motion_frame: Option<u32>,
    pub first_motion_x: Option<f64>,
    pub is_rejected: bool,
}

pub struct MotionTracker {
    gates: GateSettings,
    profiles: ProfileTable,
    /// Active profile; overwritten at most once, at direction detection.
    profile: ThresholdProfile,
    direction: Option<Direction>,
    frame_width: u32,

    phase: TrackingPhase,
    frame_index: u32,
    consecutive_motion_frames: u32,
    consecutive_no_motion_frames: u32,
    early_motion_frames: u32,
    first_motion_frame: Option<u32>,
    last_motion_frame: Option<u32>,
    first_motion_x: Option<f64>,
    rejected: bool,
}

impl MotionTracker {
    pub fn new(gates: GateSettings, profiles: ProfileTable, frame_width: u32) -> Self {
        Self {
            gates,
            profiles,
            profile: profiles.neutral,
            direction: None,
            frame_width,
            phase: TrackingPhase::Idle,
            frame_index: 0,
            consecutive_motion_frames: 0,
            consecutive_no_motion_frames: 0,
            early_motion_frames: 0,
            first_motion_frame: None,
            last_motion_frame: None,
            first_motion_x: None,
            rejected: false,
        }
    }

    /// Index of the frame the next `observe` call will consume.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Area threshold of the currently active profile; the extractor reads
    /// this per frame because the profile can be swapped mid-run.
    pub fn area_threshold(&self) -> f64 {
        self.profile.area_threshold
    }

    pub fn phase(&self) -> TrackingPhase {
        self.phase
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn consecutive_motion_frames(&self) -> u32 {
        self.consecutive_motion_frames
    }

    /// Consume one observation; the caller must present frames in order.
    pub fn observe(&mut self, obs: &MotionObservation) -> TrackerStep {
        let frame = self.frame_index;
        let has_motion = frame > self.gates.initial_frame_skip
            && obs.motion_percentage > self.profile.motion_threshold
            && obs.largest_blob_area > self.profile.area_threshold;

        if has_motion {
            if frame < self.gates.early_frame_cutoff {
                self.early_motion_frames += 1;
            }
            self.consecutive_motion_frames += 1;
            self.consecutive_no_motion_frames = 0;
            if self.phase == TrackingPhase::Idle {
                self.phase = TrackingPhase::Accumulating;
            }
            if self.consecutive_motion_frames >= self.profile.consecutive_frames_required
                && !matches!(self.phase, TrackingPhase::Sustained | TrackingPhase::Passed)
            {
                self.enter_sustained(frame, obs);
            }
        } else {
            self.consecutive_motion_frames = 0;
            self.consecutive_no_motion_frames += 1;
            match self.phase {
                TrackingPhase::Sustained => {
                    if obs.motion_percentage < self.profile.end_motion_threshold
                        || self.consecutive_no_motion_frames
                            >= self.profile.no_motion_frames_before_stop
                    {
                        self.phase = TrackingPhase::Passed;
                        log::info!("vehicle passed at frame {}", frame);
                    }
                }
                TrackingPhase::Accumulating => self.phase = TrackingPhase::Idle,
                _ => {}
            }
        }

        // High-water mark, not transition-time bookkeeping: every sustained
        // motion frame advances it.
        if self.phase == TrackingPhase::Sustained && has_motion {
            self.last_motion_frame = Some(frame);
        }

        if frame == self.gates.early_frame_cutoff && self.gates.early_frame_cutoff > 0 {
            let ratio =
                f64::from(self.early_motion_frames) / f64::from(self.gates.early_frame_cutoff);
            if ratio > self.gates.noise_threshold {
                log::warn!(
                    "video rejected: {:.1}% of early frames had motion (threshold {:.1}%)",
                    ratio * 100.0,
                    self.gates.noise_threshold * 100.0
                );
                self.rejected = true;
                return TrackerStep::Rejected;
            }
            log::debug!(
                "early motion check passed: {:.1}% of frames had motion",
                ratio * 100.0
            );
        }

        self.frame_index += 1;
        TrackerStep::Continue
    }

    fn enter_sustained(&mut self, frame: u32, obs: &MotionObservation) {
        self.phase = TrackingPhase::Sustained;
        if self.first_motion_frame.is_some() {
            return;
        }

        // Back-date to where the qualifying streak actually began, under the
        // profile that was active while the streak accumulated.
        let required = self.profile.consecutive_frames_required;
        self.first_motion_frame = Some(frame.saturating_sub(required.saturating_sub(1)));

        let center = f64::from(self.frame_width) / 2.0;
        let start_x = obs.largest_blob_centroid_x.unwrap_or(center);
        self.first_motion_x = Some(start_x);

        if self.direction.is_none() {
            let direction = classify_direction(start_x, self.frame_width);
            log::info!("detected direction: {}", direction);
            self.direction = Some(direction);
            self.profile = self.profiles.for_direction(direction);
        }
    }

    /// Consume the tracker into its final summary.
    pub fn finish(self) -> TrackerSummary {
        if self.rejected {
            return TrackerSummary {
                frames_processed: self.frame_index,
                first_motion_frame: None,
                last_motion_frame: None,
                first_motion_x: None,
                is_rejected: true,
            };
        }
        TrackerSummary {
            frames_processed: self.frame_index,
            first_motion_frame: self.first_motion_frame,
            last_motion_frame: self.last_motion_frame,
            first_motion_x: self.first_motion_x,
            is_rejected: false,
        }
    }
}
