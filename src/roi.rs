//! Region-of-interest masks.
//!
//! The road area is described as a polygon in normalized coordinates
//! (0.0..=1.0 in both axes) so one calibration carries across resolutions.
//! `RegionMask` rasterizes the polygon once per video; per-frame foreground
//! masks are intersected with it to discard motion outside the road.

use anyhow::{anyhow, Result};

/// Binary raster mask. 255 = set, 0 = clear.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Mask {
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize],
            width,
            height,
        }
    }

    pub(crate) fn from_raw(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            data,
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize] != 0
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.data[y as usize * self.width as usize + x as usize] = if on { 255 } else { 0 };
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// In-place bitwise AND with another mask of identical dimensions.
    pub fn intersect(&mut self, other: &Mask) {
        debug_assert_eq!(self.width, other.width);
        debug_assert_eq!(self.height, other.height);
        for (dst, src) in self.data.iter_mut().zip(other.data.iter()) {
            *dst &= *src;
        }
    }
}

/// Fixed road-area mask, built once per video before the frame loop.
#[derive(Clone, Debug)]
pub struct RegionMask {
    mask: Mask,
}

impl RegionMask {
    /// Rasterize a polygon given in normalized coordinates.
    ///
    /// Uses scanline even-odd filling against row centers, which matches the
    /// filled-polygon semantics of the calibration this replaces.
    pub fn from_normalized_polygon(points: &[(f64, f64)], width: u32, height: u32) -> Result<Self> {
        if points.len() < 3 {
            return Err(anyhow!("region polygon needs at least 3 points"));
        }
        for &(x, y) in points {
            if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
                return Err(anyhow!(
                    "region polygon point ({}, {}) outside normalized range",
                    x,
                    y
                ));
            }
        }

        let verts: Vec<(f64, f64)> = points
            .iter()
            .map(|&(x, y)| (x * f64::from(width), y * f64::from(height)))
            .collect();

        let mut mask = Mask::zeros(width, height);
        let mut crossings: Vec<f64> = Vec::with_capacity(verts.len());

        for row in 0..height {
            let scan_y = f64::from(row) + 0.5;
            crossings.clear();

            for i in 0..verts.len() {
                let (x0, y0) = verts[i];
                let (x1, y1) = verts[(i + 1) % verts.len()];
                if (y0 <= scan_y) == (y1 <= scan_y) {
                    continue;
                }
                let t = (scan_y - y0) / (y1 - y0);
                crossings.push(x0 + t * (x1 - x0));
            }

            crossings.sort_by(|a, b| a.partial_cmp(b).expect("finite crossing"));
            for pair in crossings.chunks_exact(2) {
                let start = pair[0].max(0.0).floor() as i64;
                let end = pair[1].min(f64::from(width)).ceil() as i64;
                for col in start..end {
                    let center = col as f64 + 0.5;
                    if center >= pair[0] && center < pair[1] {
                        mask.set(col as u32, row, true);
                    }
                }
            }
        }

        Ok(Self { mask })
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn width(&self) -> u32 {
        self.mask.width
    }

    pub fn height(&self) -> u32 {
        self.mask.height
    }
}
