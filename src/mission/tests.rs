use super::*;
use crate::testing::{ArrivalGate, StubAutopilot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

fn three_waypoints() -> Arc<MissionSegment> {
    MissionSegment::new(
        "seg-1",
        "mission-1",
        vec![
            Waypoint::new(47.3977, 8.5456, 30.0).unwrap(),
            Waypoint::new(47.3980, 8.5460, 30.0).unwrap(),
            Waypoint::new(47.3985, 8.5465, 35.0).unwrap(),
        ],
    )
}

fn executor_with(stub: StubAutopilot) -> (Arc<MissionExecutor<StubAutopilot>>, Arc<StubAutopilot>) {
    let autopilot = Arc::new(stub);
    (Arc::new(MissionExecutor::new(Arc::clone(&autopilot))), autopilot)
}

#[test]
fn test_haversine_properties() {
    assert!(haversine_distance(47.0, 8.0, 47.0, 8.0).abs() < f64::EPSILON);

    let there = haversine_distance(40.7128, -74.0060, 34.0522, -118.2437);
    let back = haversine_distance(34.0522, -118.2437, 40.7128, -74.0060);
    assert!((there - back).abs() < 1e-6);
    assert!((3_900_000.0..=4_000_000.0).contains(&there), "NYC-LA was {there}");

    let quarter = haversine_distance(0.0, 0.0, 90.0, 0.0);
    assert!((9_900_000.0..=10_100_000.0).contains(&quarter), "equator-pole was {quarter}");
}

#[test]
fn test_waypoint_validation() {
    assert!((Waypoint::new(1.0, 2.0, 0.0).unwrap().speed() - 5.0).abs() < f64::EPSILON);
    assert!(matches!(Waypoint::new(1.0, 2.0, -1.0), Err(WaypointError::NegativeAltitude(_))));
    assert!(matches!(
        Waypoint::with_options(1.0, 2.0, 10.0, 0.4, 0.0),
        Err(WaypointError::SpeedOutOfRange(_))
    ));
    assert!(matches!(
        Waypoint::with_options(1.0, 2.0, 10.0, 20.5, 0.0),
        Err(WaypointError::SpeedOutOfRange(_))
    ));
    assert!(Waypoint::with_options(1.0, 2.0, 10.0, 20.0, 3.0).is_ok());
    assert!(matches!(
        Waypoint::with_options(1.0, 2.0, 10.0, 5.0, -1.0),
        Err(WaypointError::NegativeLoiter(_))
    ));
}

#[test]
fn test_loiter_time_is_bounded() {
    let longest = Waypoint::with_options(1.0, 2.0, 10.0, 5.0, Waypoint::MAX_LOITER_SECONDS).unwrap();
    assert_eq!(longest.loiter_time(), Duration::from_secs(86_400));
    assert!(matches!(
        Waypoint::with_options(1.0, 2.0, 10.0, 5.0, 1e30),
        Err(WaypointError::LoiterOutOfRange(_))
    ));
    assert!(matches!(
        Waypoint::with_options(1.0, 2.0, 10.0, 5.0, f64::INFINITY),
        Err(WaypointError::LoiterOutOfRange(_))
    ));
    assert!(matches!(
        Waypoint::with_options(1.0, 2.0, 10.0, 5.0, f64::NAN),
        Err(WaypointError::NegativeLoiter(_))
    ));

    let endless = serde_json::from_str::<MissionSegment>(
        r#"{"segment_id": "s", "mission_id": "m", "waypoints": [
            {"latitude": 47.0, "longitude": 8.0, "altitude": 20.0, "loiter_time_seconds": 1e30}]}"#,
    );
    assert!(endless.is_err());
}

#[test]
fn test_segment_deserialization_validates_waypoints() {
    let segment: MissionSegment = serde_json::from_str(
        r#"{"segment_id": "s", "mission_id": "m",
            "waypoints": [{"latitude": 47.0, "longitude": 8.0, "altitude": 20.0}]}"#,
    )
    .unwrap();
    assert!(segment.capture_images);
    assert!((segment.waypoints[0].speed() - 5.0).abs() < f64::EPSILON);
    assert!(segment.waypoints[0].loiter_time().is_zero());

    let too_fast = serde_json::from_str::<MissionSegment>(
        r#"{"segment_id": "s", "mission_id": "m",
            "waypoints": [{"latitude": 47.0, "longitude": 8.0, "altitude": 20.0, "speed": 25.0}]}"#,
    );
    assert!(too_fast.is_err());
}

#[tokio::test]
async fn test_executes_three_waypoints_to_completion() {
    let (executor, autopilot) = executor_with(StubAutopilot::new());
    executor.load_segment(three_waypoints()).await.unwrap();
    assert_eq!(executor.state().await, ExecutorState::Executing);

    executor.execute().await.unwrap();
    assert_eq!(executor.state().await, ExecutorState::Completed);
    assert_eq!(autopilot.goto_count(), 3);
    assert_eq!(executor.current_index(), 3);

    let progress = executor.get_progress().await.unwrap();
    assert_eq!(progress.current_waypoint_index, 3);
    assert_eq!(progress.total_waypoints, 3);
    assert!(progress.distance_to_next_meters.abs() < f64::EPSILON);
    assert_eq!(progress.estimated_time_remaining, Duration::ZERO);
}

#[tokio::test]
async fn test_pause_after_first_arrival_keeps_index() {
    let (arrivals_tx, mut arrivals) = mpsc::unbounded_channel();
    let release = Arc::new(Notify::new());
    let (executor, autopilot) = executor_with(StubAutopilot::gated(ArrivalGate {
        arrivals: arrivals_tx,
        release: Arc::clone(&release),
    }));
    executor.load_segment(three_waypoints()).await.unwrap();

    let runner = Arc::clone(&executor);
    let handle = tokio::spawn(async move { runner.execute().await });

    // stub is about to report the first arrival
    assert_eq!(arrivals.recv().await, Some(1));
    executor.pause().await.unwrap();
    release.notify_one();

    handle.await.unwrap().unwrap();
    assert_eq!(executor.state().await, ExecutorState::Paused);
    assert_eq!(executor.current_index(), 1);
    assert_eq!(autopilot.goto_count(), 1);
    assert_eq!(autopilot.modes(), vec![String::from("LOITER")]);
}

#[tokio::test]
async fn test_resume_continues_from_current_index() {
    let (executor, autopilot) = executor_with(StubAutopilot::new());
    executor.load_segment(three_waypoints()).await.unwrap();
    executor.pause().await.unwrap();
    assert!(matches!(
        executor.execute().await,
        Err(ExecutorError::InvalidState { operation: "execute", state: ExecutorState::Paused })
    ));

    executor.resume().await.unwrap();
    executor.execute().await.unwrap();
    assert_eq!(executor.state().await, ExecutorState::Completed);
    assert_eq!(autopilot.goto_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_abort_stops_navigation() {
    let (executor, autopilot) = executor_with(StubAutopilot::stationary());
    executor.load_segment(three_waypoints()).await.unwrap();
    let runner = Arc::clone(&executor);
    let handle = tokio::spawn(async move { runner.execute().await });

    tokio::time::sleep(Duration::from_secs(3)).await;
    executor.abort().await.unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(executor.state().await, ExecutorState::Aborted);
    assert_eq!(executor.current_index(), 0);
    assert_eq!(autopilot.goto_count(), 1);
    assert_eq!(autopilot.modes(), vec![String::from("LOITER")]);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_survives_telemetry_errors() {
    let (executor, autopilot) = executor_with(StubAutopilot::new());
    autopilot.set_telemetry_fails(true);
    executor.load_segment(three_waypoints()).await.unwrap();
    let runner = Arc::clone(&executor);
    let handle = tokio::spawn(async move { runner.execute().await });

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(executor.state().await, ExecutorState::Executing);
    autopilot.set_telemetry_fails(false);

    handle.await.unwrap().unwrap();
    assert_eq!(executor.state().await, ExecutorState::Completed);
}

#[tokio::test]
async fn test_load_and_abort_legality() {
    let (executor, _) = executor_with(StubAutopilot::new());

    // Idle
    assert!(matches!(
        executor.abort().await,
        Err(ExecutorError::InvalidState { operation: "abort", state: ExecutorState::Idle })
    ));
    executor.load_segment(three_waypoints()).await.unwrap();

    // Executing
    assert!(matches!(
        executor.load_segment(three_waypoints()).await,
        Err(ExecutorError::InvalidState { state: ExecutorState::Executing, .. })
    ));

    // Paused
    executor.pause().await.unwrap();
    assert!(matches!(
        executor.load_segment(three_waypoints()).await,
        Err(ExecutorError::InvalidState { state: ExecutorState::Paused, .. })
    ));
    executor.abort().await.unwrap();

    // Aborted
    assert_eq!(executor.state().await, ExecutorState::Aborted);
    executor.abort().await.unwrap();
    executor.load_segment(three_waypoints()).await.unwrap();

    // Completed
    executor.execute().await.unwrap();
    assert_eq!(executor.state().await, ExecutorState::Completed);
    executor.load_segment(three_waypoints()).await.unwrap();
    assert_eq!(executor.current_index(), 0);
}

#[tokio::test]
async fn test_empty_segment_is_rejected_without_mutation() {
    let (executor, _) = executor_with(StubAutopilot::new());
    let empty = MissionSegment::new("empty", "mission-1", Vec::new());
    assert!(matches!(
        executor.load_segment(empty).await,
        Err(ExecutorError::EmptySegment(ref id)) if id == "empty"
    ));
    assert_eq!(executor.state().await, ExecutorState::Idle);
    assert!(executor.segment().await.is_none());
    assert!(matches!(executor.get_progress().await, Err(ExecutorError::NoSegment)));
}

#[tokio::test]
async fn test_progress_reports_distance_and_eta() {
    let (executor, autopilot) = executor_with(StubAutopilot::new());
    executor
        .load_segment(MissionSegment::new(
            "seg-2",
            "mission-1",
            vec![
                Waypoint::new(0.0, 0.001, 10.0).unwrap(),
                Waypoint::new(0.0, 0.002, 10.0).unwrap(),
            ],
        ))
        .await
        .unwrap();

    let progress = executor.get_progress().await.unwrap();
    assert_eq!(progress.current_waypoint_index, 0);
    assert_eq!(progress.remaining_waypoints(), 2);
    assert!((progress.distance_to_next_meters - 111.19).abs() < 0.1);
    assert_eq!(progress.estimated_time_remaining, Duration::from_secs(60));

    autopilot.set_telemetry_fails(true);
    let progress = executor.get_progress().await.unwrap();
    assert!(progress.distance_to_next_meters.abs() < f64::EPSILON);
}

fn loiter_then_land() -> Arc<MissionSegment> {
    MissionSegment::new(
        "seg-3",
        "mission-1",
        vec![
            Waypoint::with_options(47.3977, 8.5456, 30.0, 5.0, 10.0).unwrap(),
            Waypoint::new(47.3980, 8.5460, 30.0).unwrap(),
        ],
    )
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_within_one_poll_restarts_navigation() {
    let (executor, autopilot) = executor_with(StubAutopilot::stationary());
    executor.load_segment(three_waypoints()).await.unwrap();
    let first_run = Arc::clone(&executor);
    let first = tokio::spawn(async move { first_run.execute().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    executor.pause().await.unwrap();
    executor.resume().await.unwrap();
    let second_run = Arc::clone(&executor);
    let second = tokio::spawn(async move { second_run.execute().await });

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(first.is_finished());
    first.await.unwrap().unwrap();
    assert_eq!(autopilot.goto_count(), 2);
    assert_eq!(executor.state().await, ExecutorState::Executing);
    assert_eq!(executor.current_index(), 0);

    executor.abort().await.unwrap();
    second.await.unwrap().unwrap();
    assert_eq!(autopilot.modes(), ["LOITER", "LOITER"]);
}

#[tokio::test(start_paused = true)]
async fn test_loiter_holds_index_until_elapsed() {
    let (executor, autopilot) = executor_with(StubAutopilot::new());
    executor.load_segment(loiter_then_land()).await.unwrap();
    let runner = Arc::clone(&executor);
    let handle = tokio::spawn(async move { runner.execute().await });

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(executor.current_index(), 0);
    assert_eq!(autopilot.goto_count(), 1);
    assert_eq!(executor.state().await, ExecutorState::Executing);

    tokio::time::sleep(Duration::from_secs(2)).await;
    handle.await.unwrap().unwrap();
    assert_eq!(executor.current_index(), 2);
    assert_eq!(autopilot.goto_count(), 2);
    assert_eq!(executor.state().await, ExecutorState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_pause_during_loiter_keeps_index() {
    let (executor, autopilot) = executor_with(StubAutopilot::new());
    executor.load_segment(loiter_then_land()).await.unwrap();
    let runner = Arc::clone(&executor);
    let handle = tokio::spawn(async move { runner.execute().await });

    tokio::time::sleep(Duration::from_secs(3)).await;
    executor.pause().await.unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(executor.state().await, ExecutorState::Paused);
    assert_eq!(executor.current_index(), 0);
    assert_eq!(autopilot.goto_count(), 1);

    // the interrupted waypoint is flown and loitered again
    executor.resume().await.unwrap();
    executor.execute().await.unwrap();
    assert_eq!(executor.state().await, ExecutorState::Completed);
    assert_eq!(autopilot.goto_count(), 3);
}
