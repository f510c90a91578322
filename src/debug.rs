//! Debug imagery.
//!
//! In debug mode the pipeline dumps every frame, and the post-close
//! foreground mask for frames with motion, as JPEGs under the configured
//! debug directory. Useful for re-tuning thresholds against new footage.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ExtendedColorType, ImageFormat};

use crate::frame::Frame;
use crate::roi::Mask;

pub fn dump_frame(frame: &Frame, dir: &Path, frame_index: u32, sustained: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create debug directory {}", dir.display()))?;
    let suffix = if sustained { "_sustained" } else { "" };
    let path = dir.join(format!("frame_{}{}.jpg", frame_index, suffix));
    image::save_buffer_with_format(
        &path,
        frame.pixels(),
        frame.width,
        frame.height,
        ExtendedColorType::Rgb8,
        ImageFormat::Jpeg,
    )
    .with_context(|| format!("write debug frame {}", path.display()))?;
    Ok(path)
}

pub fn dump_mask(mask: &Mask, dir: &Path, frame_index: u32) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create debug directory {}", dir.display()))?;
    let path = dir.join(format!("mask_{}.jpg", frame_index));
    image::save_buffer_with_format(
        &path,
        mask.bytes(),
        mask.width,
        mask.height,
        ExtendedColorType::L8,
        ImageFormat::Jpeg,
    )
    .with_context(|| format!("write debug mask {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_land_in_the_debug_directory() {
        let dir = tempfile::tempdir().unwrap();

        let frame = Frame::new(vec![128; 8 * 8 * 3], 8, 8);
        let frame_path = dump_frame(&frame, dir.path(), 7, true).unwrap();
        assert!(frame_path.exists());
        assert!(frame_path.to_string_lossy().ends_with("frame_7_sustained.jpg"));

        let mask = Mask::zeros(8, 8);
        let mask_path = dump_mask(&mask, dir.path(), 7).unwrap();
        assert!(mask_path.exists());
    }
}
