//! Synthetic scripted scenes.
//!
//! Deterministic frame generators used by tests and demos. All scenes render
//! 640x480 at a nominal 30 fps for 400 frames:
//!
//! - `stub://empty`: static scene, no moving object
//! - `stub://car-ltr`: a bright vehicle-sized block crossing left to right
//! - `stub://car-rtl`: the same block crossing right to left
//! - `stub://noisy`: pervasive flicker from the first frame, the kind of
//!   input the noise-rejection gate exists for
//!
//! Pixel values are pure arithmetic in the frame index, so replaying a scene
//! yields byte-identical frames.

use anyhow::{anyhow, Result};

use super::SourceStats;
use crate::frame::{Frame, VideoInfo};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const FPS: f64 = 30.0;
const TOTAL_FRAMES: u64 = 400;

const CAR_WIDTH: i64 = 160;
const CAR_HEIGHT: i64 = 80;
const CAR_TOP: i64 = 200;
const CAR_ENTERS_AT: i64 = 60;
const CAR_SPEED_PX: i64 = 4;

const BASE_LEVEL: u8 = 40;
const CAR_LEVEL: u8 = 220;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scene {
    Empty,
    CarLeftToRight,
    CarRightToLeft,
    Noisy,
}

pub(crate) struct SyntheticSource {
    scene: Scene,
    path: String,
    frame_index: u64,
}

impl SyntheticSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        let scene = match path {
            "stub://empty" => Scene::Empty,
            "stub://car-ltr" => Scene::CarLeftToRight,
            "stub://car-rtl" => Scene::CarRightToLeft,
            "stub://noisy" => Scene::Noisy,
            other => return Err(anyhow!("unknown synthetic scene '{}'", other)),
        };
        log::info!("VideoSource: opened {} (synthetic)", path);
        Ok(Self {
            scene,
            path: path.to_string(),
            frame_index: 0,
        })
    }

    pub(crate) fn info(&self) -> VideoInfo {
        VideoInfo {
            fps: FPS,
            frame_width: WIDTH,
            frame_height: HEIGHT,
            total_frames: TOTAL_FRAMES,
        }
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_index >= TOTAL_FRAMES {
            return Ok(None);
        }
        let index = self.frame_index as i64;
        self.frame_index += 1;

        let mut luma = base_scene();
        match self.scene {
            Scene::Empty => {}
            Scene::CarLeftToRight => {
                let left = (index - CAR_ENTERS_AT) * CAR_SPEED_PX - CAR_WIDTH;
                paint_car(&mut luma, left);
            }
            Scene::CarRightToLeft => {
                let left = i64::from(WIDTH) - (index - CAR_ENTERS_AT) * CAR_SPEED_PX;
                paint_car(&mut luma, left);
            }
            Scene::Noisy => paint_flicker(&mut luma, index),
        }

        let mut data = Vec::with_capacity(luma.len() * 3);
        for level in luma {
            data.extend_from_slice(&[level, level, level]);
        }
        Ok(Some(Frame::new(data, WIDTH, HEIGHT)))
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frame_index,
            path: self.path.clone(),
        }
    }
}

/// Static backdrop: a gentle horizontal gradient so frames are not uniform.
fn base_scene() -> Vec<u8> {
    let mut luma = vec![0u8; WIDTH as usize * HEIGHT as usize];
    for y in 0..HEIGHT as usize {
        for x in 0..WIDTH as usize {
            luma[y * WIDTH as usize + x] = BASE_LEVEL + (x / 64) as u8;
        }
    }
    luma
}

fn paint_car(luma: &mut [u8], left: i64) {
    if left + CAR_WIDTH <= 0 || left >= i64::from(WIDTH) {
        return;
    }
    let x0 = left.max(0) as usize;
    let x1 = (left + CAR_WIDTH).min(i64::from(WIDTH)) as usize;
    for y in CAR_TOP..(CAR_TOP + CAR_HEIGHT) {
        let row = y as usize * WIDTH as usize;
        for x in x0..x1 {
            luma[row + x] = CAR_LEVEL;
        }
    }
}

/// A large block that jumps to a new position every frame, alternating
/// bright and dark. Models sensor flicker / rain rather than a vehicle.
fn paint_flicker(luma: &mut [u8], index: i64) {
    let block = 300i64;
    let x0 = (index * 37) % (i64::from(WIDTH) - block).max(1);
    let y0 = (index * 53) % (i64::from(HEIGHT) - block).max(1);
    let level = if index % 2 == 0 { 230 } else { 10 };
    for y in y0..(y0 + block) {
        let row = y as usize * WIDTH as usize;
        for x in x0..(x0 + block) {
            luma[row + x as usize] = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenes_are_deterministic() {
        let mut a = SyntheticSource::open("stub://car-ltr").unwrap();
        let mut b = SyntheticSource::open("stub://car-ltr").unwrap();
        for _ in 0..100 {
            let fa = a.next_frame().unwrap().unwrap();
            let fb = b.next_frame().unwrap().unwrap();
            assert_eq!(fa.pixels(), fb.pixels());
        }
    }

    #[test]
    fn car_is_absent_before_entry() {
        let mut source = SyntheticSource::open("stub://car-ltr").unwrap();
        let mut empty = SyntheticSource::open("stub://empty").unwrap();
        for _ in 0..CAR_ENTERS_AT {
            let car = source.next_frame().unwrap().unwrap();
            let base = empty.next_frame().unwrap().unwrap();
            assert_eq!(car.pixels(), base.pixels());
        }
        // Skip ahead until the block is well inside the frame.
        for _ in 0..40 {
            source.next_frame().unwrap().unwrap();
            empty.next_frame().unwrap().unwrap();
        }
        let car = source.next_frame().unwrap().unwrap();
        let base = empty.next_frame().unwrap().unwrap();
        assert_ne!(car.pixels(), base.pixels());
    }

    #[test]
    fn stream_ends_after_total_frames() {
        let mut source = SyntheticSource::open("stub://empty").unwrap();
        let mut count = 0u64;
        while source.next_frame().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, TOTAL_FRAMES);
        assert!(source.next_frame().unwrap().is_none());
    }
}
