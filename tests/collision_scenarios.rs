//! End-to-end coordinator scenarios driven through the in-process bus

use collision_monitor::coordinator::{CollisionMonitor, MonitorConfig, UpdateOutcome};
use collision_monitor::domain::{command_queue_name, Command, CommandMessage, StateReport, Waypoint};
use collision_monitor::transport::{LocalBus, Transport};
use std::sync::Arc;

fn report(id: &str, points: &[(f64, f64)]) -> StateReport {
    StateReport::with_path(
        id,
        points
            .iter()
            .map(|&(x, y)| Waypoint::new(x, y, 0.0))
            .collect(),
    )
}

fn setup() -> (LocalBus, CollisionMonitor) {
    let bus = LocalBus::new("scenario", 64);
    let monitor = CollisionMonitor::new(MonitorConfig::default(), Arc::new(bus.clone()));
    (bus, monitor)
}

async fn commands_for(bus: &LocalBus, device_id: &str) -> Vec<Command> {
    let queue = command_queue_name(device_id);
    let mut sub = bus.subscribe(&queue).await.unwrap();
    let mut out = Vec::new();
    while bus.pending(&queue) > 0 {
        let payload = sub.next_message().await.unwrap();
        out.push(serde_json::from_slice::<CommandMessage>(&payload).unwrap().command);
    }
    out
}

#[tokio::test]
async fn test_no_conflict() {
    let (bus, mut monitor) = setup();

    monitor.handle_state_update(report("robot1", &[(0.0, 0.0), (1.0, 1.0)])).await;
    monitor.handle_state_update(report("robot2", &[(50.0, 50.0), (51.0, 51.0)])).await;
    monitor.handle_state_update(report("robot3", &[(100.0, 0.0), (101.0, 0.0)])).await;

    assert_eq!(monitor.registry().len(), 3);
    assert!(monitor.ledger().is_empty());
    assert_eq!(monitor.stats().pauses_issued, 0);
    assert!(bus.queue_names().iter().all(|q| !q.ends_with("_commands")));
}

#[tokio::test]
async fn test_three_way_conflict_pauses_hub_only() {
    let (bus, mut monitor) = setup();

    monitor.handle_state_update(report("robot2", &[(20.0, 20.0), (15.0, 15.0)])).await;
    monitor.handle_state_update(report("robot3", &[(0.0, 0.0), (1.0, 1.0)])).await;
    assert_eq!(monitor.stats().pauses_issued, 0);

    monitor.handle_state_update(report("robot1", &[(1.0, 1.0), (8.0, 8.0)])).await;

    assert_eq!(monitor.stats().pauses_issued, 1);
    assert_eq!(monitor.ledger().paused_ids(), vec!["robot1".to_string()]);
    let blockers: Vec<&str> = monitor
        .ledger()
        .blockers("robot1")
        .unwrap()
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(blockers, vec!["robot2", "robot3"]);
    assert_eq!(commands_for(&bus, "robot1").await, vec![Command::Pause]);
}

#[tokio::test]
async fn test_partial_conflict_then_resume() {
    let (bus, mut monitor) = setup();

    monitor.handle_state_update(report("robot3", &[(100.0, 100.0), (101.0, 101.0)])).await;
    monitor.handle_state_update(report("robot1", &[(0.0, 0.0), (5.0, 5.0)])).await;
    monitor.handle_state_update(report("robot2", &[(12.0, 12.0), (10.0, 10.0)])).await;

    assert_eq!(monitor.ledger().len(), 1);
    assert!(monitor.ledger().is_paused("robot1"));
    assert_eq!(monitor.ledger().blockers("robot1").unwrap().len(), 1);
    assert!(!monitor.ledger().is_paused("robot3"));

    // robot2 heads far away: its dependant is released
    monitor.handle_state_update(report("robot2", &[(12.0, 12.0), (60.0, 60.0)])).await;

    assert!(monitor.ledger().is_empty());
    assert_eq!(monitor.stats().resumes_issued, 1);
    assert_eq!(
        commands_for(&bus, "robot1").await,
        vec![Command::Pause, Command::Resume]
    );
    assert!(commands_for(&bus, "robot2").await.is_empty());
}

#[tokio::test]
async fn test_mutual_block_is_broken() {
    let (bus, mut monitor) = setup();

    // a is paused behind b
    monitor.handle_state_update(report("a", &[(0.0, 0.0), (0.0, 0.0)])).await;
    monitor.handle_state_update(report("b", &[(3.0, 0.0), (5.0, 0.0)])).await;
    assert!(monitor.ledger().is_paused("a"));

    // c makes b the hub: b is paused behind a and c, while a still waits on b
    monitor.handle_state_update(report("c", &[(20.0, 0.0), (18.0, 0.0)])).await;

    assert_eq!(monitor.stats().deadlocks_broken, 1);
    assert!(!monitor.ledger().is_paused("a"));
    assert!(monitor.ledger().is_paused("b"));
    assert_eq!(
        commands_for(&bus, "a").await,
        vec![Command::Pause, Command::Resume]
    );
    assert_eq!(commands_for(&bus, "b").await, vec![Command::Pause]);
}

#[tokio::test]
async fn test_arrived_agent_leaves_future_scans() {
    let (_bus, mut monitor) = setup();

    monitor.handle_state_update(report("robot1", &[(0.0, 0.0), (5.0, 5.0)])).await;
    let outcome = monitor.handle_state_update(report("robot2", &[(6.0, 6.0)])).await;
    assert_eq!(outcome, UpdateOutcome::Arrived("robot2".into()));

    // Would overlap robot2's last pose, but robot2 is gone
    monitor.handle_state_update(report("robot1", &[(5.0, 5.0), (6.0, 6.0)])).await;
    assert!(!monitor.registry().contains("robot2"));
    assert!(monitor.ledger().is_empty());
    assert_eq!(monitor.stats().arrivals, 1);
}

#[tokio::test]
async fn test_undecodable_message_dropped() {
    let (_bus, mut monitor) = setup();

    assert_eq!(monitor.handle_message(b"{not json").await, UpdateOutcome::Rejected);
    assert_eq!(
        monitor.handle_message(br#"{"path": [{"x": 1, "y": 2}]}"#).await,
        UpdateOutcome::Rejected
    );
    assert_eq!(monitor.stats().reports_rejected, 2);
    assert!(monitor.registry().is_empty());
}
