//! End-to-end runs over the synthetic scenes: frames flow through the
//! frame-diff vision backend, the region mask, and the tracker exactly as
//! they do for real footage.

use speedcam::{
    analyze_video, process_videos, Direction, InMemoryResultStore, ResultStore, SpeedcamConfig,
    SqliteResultStore,
};

fn config() -> SpeedcamConfig {
    SpeedcamConfig::default()
}

#[test]
fn car_crossing_left_to_right_is_measured() {
    let result = analyze_video("stub://car-ltr", &config(), false).unwrap();

    assert!(result.has_motion());
    assert!(!result.is_rejected);
    assert_eq!(result.direction(), Direction::LeftToRight);

    // The block enters at frame 60 and needs to grow past the area
    // threshold before the streak starts counting.
    let first = result.first_motion_frame.unwrap();
    assert!((55..=110).contains(&first), "first motion at {}", first);

    let last = result.last_motion_frame.unwrap();
    assert!(last > first);

    let speed = result.speed_mph();
    assert!(speed > 5.0 && speed < 60.0, "speed {}", speed);
}

#[test]
fn car_crossing_right_to_left_is_measured() {
    let result = analyze_video("stub://car-rtl", &config(), false).unwrap();

    assert!(result.has_motion());
    assert_eq!(result.direction(), Direction::RightToLeft);
    assert!(result.first_motion_x.unwrap() > 320.0);
    assert!(result.speed_mph() > 0.0);
}

#[test]
fn quiet_scene_yields_a_neutral_result() {
    let result = analyze_video("stub://empty", &config(), false).unwrap();

    assert!(!result.has_motion());
    assert!(!result.is_rejected);
    assert_eq!(result.first_motion_frame, None);
    assert_eq!(result.direction(), Direction::Unknown);
    assert_eq!(result.speed_mph(), 0.0);
    assert_eq!(result.total_frames_processed, 400);
}

#[test]
fn flickering_scene_is_rejected_at_the_cutoff() {
    let result = analyze_video("stub://noisy", &config(), false).unwrap();

    assert!(result.is_rejected);
    assert!(!result.has_motion());
    assert_eq!(result.first_motion_frame, None);
    assert_eq!(result.first_motion_x, None);
    // Processing stops at the early-frame cutoff.
    assert_eq!(result.total_frames_processed, 80);
}

#[test]
fn replaying_a_video_yields_an_identical_result() {
    let a = analyze_video("stub://noisy", &config(), false).unwrap();
    let b = analyze_video("stub://noisy", &config(), false).unwrap();
    assert_eq!(a, b);

    let json_a = serde_json::to_string(&a.wire()).unwrap();
    let json_b = serde_json::to_string(&b.wire()).unwrap();
    assert_eq!(json_a, json_b);
}

#[test]
fn batch_mode_persists_each_result() {
    let mut store = SqliteResultStore::open(":memory:").unwrap();
    let results = process_videos(
        "stub://car-ltr",
        &config(),
        Some(&mut store as &mut dyn ResultStore),
        false,
    )
    .unwrap();

    assert_eq!(results.len(), 1);
    let rows = store.recent(10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].video_filename, "stub://car-ltr");
    assert!(rows[0].has_motion);
    assert_eq!(rows[0].direction, "LeftToRight");
    assert_eq!(
        rows[0].first_motion_frame,
        i64::from(results["stub://car-ltr"].first_motion_frame.unwrap())
    );
}

#[test]
fn store_failures_do_not_abort_the_batch() {
    struct FailingStore;
    impl ResultStore for FailingStore {
        fn insert(
            &mut self,
            _result: &speedcam::MotionResult,
            _video_filename: &str,
        ) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        fn recent(&self, _limit: usize) -> anyhow::Result<Vec<speedcam::StoredResult>> {
            Ok(Vec::new())
        }
    }

    let mut store = FailingStore;
    let results = process_videos(
        "stub://noisy",
        &config(),
        Some(&mut store as &mut dyn ResultStore),
        false,
    )
    .unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn in_memory_store_collects_batch_rows() {
    let mut store = InMemoryResultStore::new();
    process_videos(
        "stub://noisy",
        &config(),
        Some(&mut store as &mut dyn ResultStore),
        false,
    )
    .unwrap();
    assert_eq!(store.len(), 1);
    let row = &store.recent(1).unwrap()[0];
    assert!(!row.has_motion);
    assert!(row.is_rejected);
}
