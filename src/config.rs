use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::motion::{GateSettings, ProfileTable, ThresholdProfile};
use crate::vision::BackgroundSettings;

const DEFAULT_DB_PATH: &str = "speedcam.db";
const DEFAULT_DEBUG_DIR: &str = "target/speedcam-debug";
const DEFAULT_VISION_BACKEND: &str = "frame-diff";
const DEFAULT_KERNEL_SIZE: u32 = 2;

/// Road polygon from the deployed camera calibration, normalized to frame
/// dimensions: bottom left, bottom right, top right, top left.
const DEFAULT_REGION_POLYGON: [(f64, f64); 4] =
    [(0.0, 0.552), (1.0, 1.0), (1.0, 0.417), (0.0, 0.448)];

#[derive(Debug, Deserialize, Default)]
struct SpeedcamConfigFile {
    db_path: Option<String>,
    debug_dir: Option<PathBuf>,
    vision: Option<VisionConfigFile>,
    detector: Option<DetectorConfigFile>,
    profiles: Option<ProfilesConfigFile>,
    region: Option<RegionConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct VisionConfigFile {
    backend: Option<String>,
    kernel_size: Option<u32>,
    history: Option<i32>,
    var_threshold: Option<f64>,
    detect_shadows: Option<bool>,
    learning_rate: Option<f64>,
    diff_threshold: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    initial_frame_skip: Option<u32>,
    early_frame_cutoff: Option<u32>,
    noise_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ProfilesConfigFile {
    neutral: Option<ThresholdProfile>,
    left_to_right: Option<ThresholdProfile>,
    right_to_left: Option<ThresholdProfile>,
}

#[derive(Debug, Deserialize, Default)]
struct RegionConfigFile {
    polygon: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone)]
pub struct SpeedcamConfig {
    pub db_path: String,
    pub debug_dir: PathBuf,
    pub vision: VisionSettings,
    pub gates: GateSettings,
    pub profiles: ProfileTable,
    pub region_polygon: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct VisionSettings {
    /// "frame-diff" or "opencv".
    pub backend: String,
    /// Structuring element size for the morphological close.
    pub kernel_size: u32,
    pub background: BackgroundSettings,
}

impl Default for SpeedcamConfig {
    fn default() -> Self {
        Self::from_file(SpeedcamConfigFile::default()).expect("default config is valid")
    }
}

impl SpeedcamConfig {
    /// Load configuration: optional TOML file (explicit path, else the
    /// `SPEEDCAM_CONFIG` environment variable), then environment overrides,
    /// then validation.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("SPEEDCAM_CONFIG").ok().map(PathBuf::from);
        let path = config_path.map(Path::to_path_buf).or(env_path);
        let file_cfg = match path.as_deref() {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SpeedcamConfigFile) -> Result<Self> {
        let db_path = file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let debug_dir = file
            .debug_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEBUG_DIR));

        let defaults = BackgroundSettings::default();
        let vision_file = file.vision.unwrap_or_default();
        let vision = VisionSettings {
            backend: vision_file
                .backend
                .unwrap_or_else(|| DEFAULT_VISION_BACKEND.to_string()),
            kernel_size: vision_file.kernel_size.unwrap_or(DEFAULT_KERNEL_SIZE),
            background: BackgroundSettings {
                history: vision_file.history.unwrap_or(defaults.history),
                var_threshold: vision_file.var_threshold.unwrap_or(defaults.var_threshold),
                detect_shadows: vision_file
                    .detect_shadows
                    .unwrap_or(defaults.detect_shadows),
                learning_rate: vision_file.learning_rate.unwrap_or(defaults.learning_rate),
                diff_threshold: vision_file
                    .diff_threshold
                    .unwrap_or(defaults.diff_threshold),
            },
        };

        let gate_defaults = GateSettings::default();
        let detector = file.detector.unwrap_or_default();
        let gates = GateSettings {
            initial_frame_skip: detector
                .initial_frame_skip
                .unwrap_or(gate_defaults.initial_frame_skip),
            early_frame_cutoff: detector
                .early_frame_cutoff
                .unwrap_or(gate_defaults.early_frame_cutoff),
            noise_threshold: detector
                .noise_threshold
                .unwrap_or(gate_defaults.noise_threshold),
        };

        let profile_defaults = ProfileTable::default();
        let profiles_file = file.profiles.unwrap_or_default();
        let profiles = ProfileTable {
            neutral: profiles_file.neutral.unwrap_or(profile_defaults.neutral),
            left_to_right: profiles_file
                .left_to_right
                .unwrap_or(profile_defaults.left_to_right),
            right_to_left: profiles_file
                .right_to_left
                .unwrap_or(profile_defaults.right_to_left),
        };

        let region_polygon = file
            .region
            .and_then(|region| region.polygon)
            .map(|points| points.iter().map(|p| (p[0], p[1])).collect())
            .unwrap_or_else(|| DEFAULT_REGION_POLYGON.to_vec());

        Ok(Self {
            db_path,
            debug_dir,
            vision,
            gates,
            profiles,
            region_polygon,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("SPEEDCAM_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(backend) = std::env::var("SPEEDCAM_VISION_BACKEND") {
            if !backend.trim().is_empty() {
                self.vision.backend = backend;
            }
        }
        if let Ok(dir) = std::env::var("SPEEDCAM_DEBUG_DIR") {
            if !dir.trim().is_empty() {
                self.debug_dir = PathBuf::from(dir);
            }
        }
        if let Ok(threshold) = std::env::var("SPEEDCAM_NOISE_THRESHOLD") {
            let value: f64 = threshold
                .parse()
                .map_err(|_| anyhow!("SPEEDCAM_NOISE_THRESHOLD must be a ratio in 0..=1"))?;
            self.gates.noise_threshold = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        match self.vision.backend.as_str() {
            "frame-diff" | "opencv" => {}
            other => return Err(anyhow!("unknown vision backend '{}'", other)),
        }
        if self.vision.kernel_size == 0 {
            return Err(anyhow!("vision kernel_size must be >= 1"));
        }
        if self.gates.early_frame_cutoff == 0 {
            return Err(anyhow!("detector early_frame_cutoff must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.gates.noise_threshold) {
            return Err(anyhow!("detector noise_threshold must be within 0..=1"));
        }
        self.profiles.validate()?;
        if self.region_polygon.len() < 3 {
            return Err(anyhow!("region polygon needs at least 3 points"));
        }
        for &(x, y) in &self.region_polygon {
            if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
                return Err(anyhow!(
                    "region polygon point ({}, {}) outside normalized range",
                    x,
                    y
                ));
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SpeedcamConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_deployed_calibration() {
        let cfg = SpeedcamConfig::default();
        assert_eq!(cfg.db_path, "speedcam.db");
        assert_eq!(cfg.vision.backend, "frame-diff");
        assert_eq!(cfg.vision.kernel_size, 2);
        assert_eq!(cfg.gates.early_frame_cutoff, 80);
        assert_eq!(cfg.profiles.neutral.consecutive_frames_required, 20);
        assert_eq!(cfg.region_polygon.len(), 4);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let file: SpeedcamConfigFile = toml::from_str(
            r#"
            db_path = "other.db"

            [profiles.neutral]
            motion_threshold = 0.02
            area_threshold = 3000.0
            consecutive_frames_required = 30
            end_motion_threshold = 0.004
            no_motion_frames_before_stop = 8
            "#,
        )
        .unwrap();
        let cfg = SpeedcamConfig::from_file(file).unwrap();
        assert_eq!(cfg.db_path, "other.db");
        assert_eq!(cfg.profiles.neutral.consecutive_frames_required, 30);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.profiles.left_to_right.consecutive_frames_required, 8);
        assert_eq!(cfg.vision.kernel_size, 2);
    }

    #[test]
    fn invalid_backend_is_rejected() {
        let mut cfg = SpeedcamConfig::default();
        cfg.vision.backend = "cuda".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_noise_threshold_is_rejected() {
        let mut cfg = SpeedcamConfig::default();
        cfg.gates.noise_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }
}
