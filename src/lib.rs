//! speedcam
//!
//! Estimates the speed of a vehicle passing a fixed roadside camera. A video
//! is reduced to one `MotionResult` by a per-frame state machine:
//!
//! 1. The vision backend subtracts the background and the region-of-interest
//!    mask discards motion off the road.
//! 2. Each frame's contours collapse into a `MotionObservation`.
//! 3. The `MotionTracker` turns the observation stream into a sustained
//!    first/last motion interval, classifying travel direction once from the
//!    starting centroid and rejecting videos whose early frames are mostly
//!    noise.
//! 4. Elapsed frames across the calibrated field of view become a speed.
//!
//! # Module Structure
//!
//! - `ingest`: video sources (synthetic `stub://` scenes, OpenCV capture)
//! - `vision`: background model / morphology / contour backends
//! - `roi`: region-of-interest polygon rasterization
//! - `motion`: observations, threshold profiles, the tracker, results
//! - `pipeline`: per-video orchestration and batch mode
//! - `storage`: SQLite and in-memory result stores
//! - `config`: layered TOML + environment configuration

pub mod config;
pub mod debug;
pub mod frame;
pub mod ingest;
pub mod motion;
pub mod pipeline;
pub mod roi;
pub mod storage;
pub mod vision;

pub use config::{SpeedcamConfig, VisionSettings};
pub use frame::{Frame, VideoInfo};
pub use ingest::{SourceStats, VideoSource};
pub use motion::{
    classify_direction, Direction, FrameMotionExtractor, GateSettings, MotionObservation,
    MotionResult, MotionTracker, ProfileTable, ThresholdProfile, TrackerStep, TrackerSummary,
    TrackingPhase, WireResult,
};
pub use pipeline::{analyze_video, detection_time_from_path, process_videos};
pub use roi::{Mask, RegionMask};
pub use storage::{
    shared_memory_uri, InMemoryResultStore, ResultStore, SqliteResultStore, StoredResult,
};
#[cfg(feature = "backend-opencv")]
pub use vision::OpenCvBackend;
pub use vision::{BackgroundSettings, Contour, FrameDiffBackend, VisionBackend};
