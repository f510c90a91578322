//! Threshold profiles and direction classification.
//!
//! A run starts on the direction-neutral profile. The first time sustained
//! motion is confirmed, the starting centroid classifies the travel direction
//! and the active profile is swapped, once, to the direction-specific
//! variant. The two variants reflect asymmetric optics: a left-to-right
//! vehicle approaches from the far side and reads small, so its thresholds
//! are more permissive; a right-to-left vehicle shrinks into the distance
//! with intermittent detection, so its end-of-motion thresholds are more
//! tolerant.

use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Travel direction across the camera's field of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    Unknown,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::LeftToRight => "LeftToRight",
            Direction::RightToLeft => "RightToLeft",
            Direction::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Tunable constants driving the sustained-motion state machine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    /// Minimum total significant foreground area, as % of frame area.
    pub motion_threshold: f64,
    /// Minimum single-contour area, in pixels.
    pub area_threshold: f64,
    /// Consecutive motion frames before motion counts as sustained.
    pub consecutive_frames_required: u32,
    /// Motion percentage below which a tracked vehicle counts as gone.
    pub end_motion_threshold: f64,
    /// Consecutive no-motion frames before a tracked vehicle counts as gone.
    pub no_motion_frames_before_stop: u32,
}

impl ThresholdProfile {
    pub fn validate(&self) -> Result<()> {
        if self.consecutive_frames_required < 1 {
            return Err(anyhow!("consecutive_frames_required must be >= 1"));
        }
        if self.motion_threshold < 0.0
            || self.area_threshold < 0.0
            || self.end_motion_threshold < 0.0
        {
            return Err(anyhow!("thresholds must be non-negative"));
        }
        Ok(())
    }
}

/// The neutral profile plus both direction-specific variants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    pub neutral: ThresholdProfile,
    pub left_to_right: ThresholdProfile,
    pub right_to_left: ThresholdProfile,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            neutral: ThresholdProfile {
                motion_threshold: 0.01,
                area_threshold: 2000.0,
                consecutive_frames_required: 20,
                end_motion_threshold: 0.005,
                no_motion_frames_before_stop: 10,
            },
            left_to_right: ThresholdProfile {
                motion_threshold: 0.007,
                area_threshold: 1500.0,
                consecutive_frames_required: 8,
                end_motion_threshold: 0.005,
                no_motion_frames_before_stop: 10,
            },
            right_to_left: ThresholdProfile {
                motion_threshold: 0.005,
                area_threshold: 1000.0,
                consecutive_frames_required: 8,
                end_motion_threshold: 0.003,
                no_motion_frames_before_stop: 12,
            },
        }
    }
}

impl ProfileTable {
    pub fn for_direction(&self, direction: Direction) -> ThresholdProfile {
        match direction {
            Direction::LeftToRight => self.left_to_right,
            Direction::RightToLeft => self.right_to_left,
            Direction::Unknown => self.neutral,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.neutral.validate()?;
        self.left_to_right.validate()?;
        self.right_to_left.validate()?;
        Ok(())
    }
}

/// A vehicle first seen in the left half of the frame travels left-to-right.
pub fn classify_direction(first_motion_x: f64, frame_width: u32) -> Direction {
    if first_motion_x < f64::from(frame_width) / 2.0 {
        Direction::LeftToRight
    } else {
        Direction::RightToLeft
    }
}
