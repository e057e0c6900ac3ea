//! Integration tests for the monitoring loop

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fast_monitor_config, ScriptedProbe, UNREACHABLE};
use hadoop_ha_monitor::core::cluster::{
    ClusterMonitor, HealthCategory, LogLevel, MonitorConfig, MonitorState, ServiceKind,
};

async fn wait_for_cycles(monitor: &ClusterMonitor, cycles: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while monitor.cycles_completed() < cycles {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("monitor did not complete enough cycles");
}

#[tokio::test]
async fn test_first_cycle_records_snapshot_without_events() {
    let probe = Arc::new(ScriptedProbe::healthy());
    let monitor = ClusterMonitor::new(probe, fast_monitor_config());

    let outcome = monitor.run_cycle().await;

    assert!(outcome.error.is_none());
    assert!(outcome.events.is_empty());
    assert_eq!(outcome.snapshot.cluster_health.score, 100);
    assert_eq!(outcome.snapshot.cluster_health.status, HealthCategory::Excellent);
    assert!(outcome.snapshot.cluster_health.issues.is_empty());

    assert_eq!(monitor.history(50).await.len(), 1);
    assert!(monitor.recent_logs(50).await.is_empty());
    assert_eq!(
        monitor.current_snapshot().await.unwrap().timestamp,
        outcome.snapshot.timestamp
    );
    assert_eq!(monitor.cycles_completed(), 1);
}

#[tokio::test]
async fn test_state_change_between_cycles_is_logged() {
    let probe = Arc::new(ScriptedProbe::healthy().with_script(
        ServiceKind::NameNode,
        &[("active", "standby"), ("active", UNREACHABLE)],
    ));
    let monitor = ClusterMonitor::new(probe, fast_monitor_config());

    monitor.run_cycle().await;
    let outcome = monitor.run_cycle().await;

    let messages: Vec<_> = outcome.events.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "NameNode standby state changed: standby → unreachable",
            "New issue detected: Standby NameNode is unhealthy",
            "New issue detected: Standby NameNode is in 'unreachable' state",
        ]
    );
    assert_eq!(outcome.snapshot.cluster_health.score, 90);

    let logs = monitor.recent_logs(50).await;
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|entry| entry.level == LogLevel::Warning));
}

#[tokio::test]
async fn test_recovery_logs_resolved_issues() {
    let probe = Arc::new(ScriptedProbe::healthy());
    let monitor = ClusterMonitor::new(probe.clone(), fast_monitor_config());

    probe.set_auxiliary_healthy(false);
    monitor.run_cycle().await;
    probe.set_auxiliary_healthy(true);
    let outcome = monitor.run_cycle().await;

    let resolved: Vec<_> = outcome
        .events
        .iter()
        .filter(|e| e.message.starts_with("Issue resolved"))
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(
        resolved,
        vec![
            "Issue resolved: History Server is unhealthy",
            "Issue resolved: Hive WebUI is unhealthy",
        ]
    );
}

#[tokio::test]
async fn test_history_and_logs_stay_bounded() {
    let probe = Arc::new(ScriptedProbe::healthy());
    let monitor = ClusterMonitor::new(
        probe.clone(),
        MonitorConfig {
            max_history: 3,
            max_logs: 4,
            ..fast_monitor_config()
        },
    );

    for i in 0..8 {
        probe.set_auxiliary_healthy(i % 2 == 0);
        monitor.run_cycle().await;
    }

    let history = monitor.history(50).await;
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(monitor.recent_logs(50).await.len(), 4);
    assert_eq!(monitor.recent_logs(2).await.len(), 2);
}

#[tokio::test]
async fn test_collection_failure_still_produces_snapshot() {
    let probe = Arc::new(ScriptedProbe::healthy());
    let monitor = ClusterMonitor::new(probe.clone(), fast_monitor_config());

    monitor.run_cycle().await;
    probe.set_panic_on_probe(true);
    let outcome = monitor.run_cycle().await;

    assert!(outcome.error.is_some());
    assert_eq!(outcome.snapshot.error, outcome.error);
    assert_eq!(outcome.snapshot.cluster_health.score, 0);
    assert_eq!(outcome.snapshot.cluster_health.status, HealthCategory::Critical);
    assert!(outcome
        .events
        .iter()
        .any(|e| e.level == LogLevel::Error && e.message.starts_with("Cluster health status changed")));
    assert_eq!(monitor.history(50).await.len(), 2);
}

#[tokio::test]
async fn test_background_loop_starts_and_stops() {
    let probe = Arc::new(ScriptedProbe::healthy());
    let monitor = ClusterMonitor::new(probe, fast_monitor_config());
    assert_eq!(monitor.state().await, MonitorState::Idle);

    monitor.start().await.unwrap();
    monitor.start().await.unwrap();
    assert_eq!(monitor.state().await, MonitorState::Running);

    wait_for_cycles(&monitor, 3).await;
    monitor.stop().await.unwrap();
    assert_eq!(monitor.state().await, MonitorState::Idle);

    let stopped_at = monitor.cycles_completed();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(monitor.cycles_completed(), stopped_at);
}

#[tokio::test]
async fn test_stop_interrupts_long_interval() {
    let probe = Arc::new(ScriptedProbe::healthy());
    let monitor = ClusterMonitor::new(
        probe,
        MonitorConfig {
            interval_ms: 60_000,
            ..fast_monitor_config()
        },
    );

    monitor.start().await.unwrap();
    wait_for_cycles(&monitor, 1).await;

    tokio::time::timeout(Duration::from_secs(2), monitor.stop())
        .await
        .expect("stop should not wait out the interval")
        .unwrap();
    assert_eq!(monitor.cycles_completed(), 1);
}

#[tokio::test]
async fn test_loop_survives_failing_cycles() {
    let probe = Arc::new(ScriptedProbe::healthy());
    probe.set_panic_on_probe(true);
    let monitor = ClusterMonitor::new(probe.clone(), fast_monitor_config());

    monitor.start().await.unwrap();
    wait_for_cycles(&monitor, 2).await;
    assert_eq!(monitor.state().await, MonitorState::Running);

    probe.set_panic_on_probe(false);
    let target = monitor.cycles_completed() + 2;
    wait_for_cycles(&monitor, target).await;
    monitor.stop().await.unwrap();

    let current = monitor.current_snapshot().await.unwrap();
    assert!(current.error.is_none());
    assert_eq!(current.cluster_health.score, 100);
}

#[tokio::test]
async fn test_node_listing_panic_records_failed_snapshot() {
    let probe = Arc::new(ScriptedProbe::healthy());
    let monitor = ClusterMonitor::new(probe.clone(), fast_monitor_config());

    monitor.run_cycle().await;
    probe.set_panic_on_nodes(true);
    let outcome = monitor.run_cycle().await;

    let error = outcome.error.as_deref().unwrap();
    assert!(error.contains("Node probe task failed"), "unexpected error: {}", error);
    assert_eq!(outcome.snapshot.error, outcome.error);
    assert_eq!(outcome.snapshot.cluster_health.status, HealthCategory::Critical);
    assert!(!outcome.events.is_empty());
    assert_eq!(monitor.history(50).await.len(), 2);
    assert_eq!(monitor.cycles_completed(), 2);
}

#[tokio::test]
async fn test_loop_records_cycles_while_node_listing_panics() {
    let probe = Arc::new(ScriptedProbe::healthy());
    probe.set_panic_on_nodes(true);
    let monitor = ClusterMonitor::new(
        probe,
        MonitorConfig {
            interval_ms: 5,
            error_backoff_ms: 5,
            ..fast_monitor_config()
        },
    );

    monitor.start().await.unwrap();
    wait_for_cycles(&monitor, 2).await;
    monitor.stop().await.unwrap();

    let current = monitor.current_snapshot().await.unwrap();
    assert!(current.error.is_some());
    assert!(monitor.history(50).await.len() >= 2);
}

#[tokio::test]
async fn test_failing_cycle_waits_error_backoff() {
    let probe = Arc::new(ScriptedProbe::healthy());
    probe.set_panic_on_probe(true);
    let monitor = ClusterMonitor::new(
        probe,
        MonitorConfig {
            interval_ms: 5,
            error_backoff_ms: 400,
            ..fast_monitor_config()
        },
    );

    monitor.start().await.unwrap();
    wait_for_cycles(&monitor, 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let cycles = monitor.cycles_completed();
    monitor.stop().await.unwrap();

    assert_eq!(cycles, 1);
}
