//! Pure-Rust vision backend.
//!
//! Keeps a running-average grayscale background; pixels deviating from it by
//! more than a threshold are flagged as foreground. Closing is a square
//! dilate/erode pass and contours come from 8-connected component labeling.
//! Coarser than MOG2 but deterministic and dependency-free, which is what the
//! synthetic test scenes run against.

use anyhow::Result;

use crate::frame::Frame;
use crate::roi::Mask;
use crate::vision::{BackgroundSettings, Contour, VisionBackend};

pub struct FrameDiffBackend {
    settings: BackgroundSettings,
    background: Option<Vec<f32>>,
}

impl FrameDiffBackend {
    pub fn new(settings: BackgroundSettings) -> Self {
        Self {
            settings,
            background: None,
        }
    }

    fn luma_plane(frame: &Frame) -> Vec<f32> {
        let mut luma = Vec::with_capacity(frame.width as usize * frame.height as usize);
        for y in 0..frame.height {
            for x in 0..frame.width {
                luma.push(f32::from(frame.luma_at(x, y)));
            }
        }
        luma
    }
}

impl VisionBackend for FrameDiffBackend {
    fn name(&self) -> &'static str {
        "frame-diff"
    }

    fn apply_background_model(&mut self, frame: &Frame) -> Result<Mask> {
        let luma = Self::luma_plane(frame);
        let threshold = f32::from(self.settings.diff_threshold);
        let alpha = self.settings.learning_rate as f32;

        let Some(background) = self.background.as_mut() else {
            // First frame seeds the model; nothing is foreground yet.
            self.background = Some(luma);
            return Ok(Mask::zeros(frame.width, frame.height));
        };

        let mut data = vec![0u8; luma.len()];
        for ((bg, &lum), out) in background.iter_mut().zip(luma.iter()).zip(data.iter_mut()) {
            if (lum - *bg).abs() > threshold {
                *out = 255;
            }
            *bg += alpha * (lum - *bg);
        }

        Ok(Mask::from_raw(data, frame.width, frame.height))
    }

    fn morphological_close(&self, mask: &mut Mask, kernel_size: u32) -> Result<()> {
        if kernel_size < 2 {
            return Ok(());
        }
        // Anchor at the kernel center, trailing half rounds down for even
        // sizes, matching the structuring-element convention upstream.
        let before = ((kernel_size - 1) / 2) as i64;
        let after = (kernel_size / 2) as i64;

        let dilated = window_pass(mask, before, after, true);
        *mask = window_pass(&dilated, before, after, false);
        Ok(())
    }

    fn find_external_contours(&self, mask: &Mask) -> Result<Vec<Contour>> {
        let width = mask.width as i64;
        let height = mask.height as i64;
        let mut visited = vec![false; (width * height) as usize];
        let mut contours = Vec::new();
        let mut stack = Vec::new();

        for y in 0..mask.height {
            for x in 0..mask.width {
                let idx = (y as usize) * mask.width as usize + x as usize;
                if visited[idx] || !mask.get(x, y) {
                    continue;
                }

                let mut pixel_count = 0u64;
                let mut x_sum = 0f64;
                visited[idx] = true;
                stack.push((x as i64, y as i64));

                while let Some((cx, cy)) = stack.pop() {
                    pixel_count += 1;
                    x_sum += cx as f64;

                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            if dx == 0 && dy == 0 {
                                continue;
                            }
                            let nx = cx + dx;
                            let ny = cy + dy;
                            if nx < 0 || ny < 0 || nx >= width || ny >= height {
                                continue;
                            }
                            let nidx = (ny * width + nx) as usize;
                            if !visited[nidx] && mask.get(nx as u32, ny as u32) {
                                visited[nidx] = true;
                                stack.push((nx, ny));
                            }
                        }
                    }
                }

                contours.push(Contour {
                    area: pixel_count as f64,
                    m00: pixel_count as f64,
                    m10: x_sum,
                });
            }
        }

        Ok(contours)
    }
}

/// One dilate (`grow = true`) or erode (`grow = false`) pass over the mask.
fn window_pass(mask: &Mask, before: i64, after: i64, grow: bool) -> Mask {
    let width = mask.width as i64;
    let height = mask.height as i64;
    let mut out = Mask::zeros(mask.width, mask.height);

    for y in 0..height {
        for x in 0..width {
            let mut hit = !grow;
            'window: for dy in -before..=after {
                for dx in -before..=after {
                    let nx = x + dx;
                    let ny = y + dy;
                    let inside = nx >= 0 && ny >= 0 && nx < width && ny < height;
                    // Outside the frame counts as background for dilation and
                    // as foreground for erosion, so closing never shrinks
                    // blobs that touch the frame edge.
                    let set = if inside {
                        mask.get(nx as u32, ny as u32)
                    } else {
                        !grow
                    };
                    if grow && set {
                        hit = true;
                        break 'window;
                    }
                    if !grow && !set {
                        hit = false;
                        break 'window;
                    }
                }
            }
            out.set(x as u32, y as u32, hit);
        }
    }
    out
}
