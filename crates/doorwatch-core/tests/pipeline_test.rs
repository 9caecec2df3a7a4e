#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use doorwatch_api::{
    AccessEventPayload, AlertPayload, SimulatedTransport, SimulationConfig, UserActivityPayload,
};
use doorwatch_core::{
    ConnectionState, FeedEntry, MemoryStore, Message, MessageKind, Pipeline, StoreLimits, Stores,
    Transport,
};
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

fn pipeline(config: SimulationConfig) -> (Pipeline, SimulatedTransport) {
    let sim = SimulatedTransport::new(config);
    let transport: Arc<dyn Transport> = Arc::new(sim.clone());
    let stores = Arc::new(Stores::new(
        &StoreLimits::default(),
        Arc::new(MemoryStore::new()),
    ));
    (Pipeline::new(transport, stores), sim)
}

fn critical_alert(id: &str) -> AlertPayload {
    AlertPayload {
        id: id.into(),
        alert_type: "SECURITY".into(),
        severity: "CRITICAL".into(),
        title: "Door forced open".into(),
        message: "Server room door forced".into(),
        timestamp: Utc::now(),
        acknowledged: false,
        acknowledged_by: None,
        acknowledged_at: None,
        related_entity_id: Some("door-007".into()),
        related_entity_type: Some("DOOR".into()),
    }
}

#[tokio::test(start_paused = true)]
async fn alert_round_trip_through_simulated_transport() {
    let (pipeline, sim) = pipeline(SimulationConfig::manual());
    assert_ok!(pipeline.start().await);
    assert_eq!(pipeline.connection_state(), ConnectionState::Connected);

    assert!(sim.emit(Message::NewAlert(critical_alert("alert-1"))));

    let alerts = &pipeline.stores().alerts;
    assert_eq!(alerts.unacknowledged_count(), 1);
    assert!(alerts.get("alert-1").is_some());

    assert!(pipeline.acknowledge_alert("alert-1", "u1"));
    assert_eq!(alerts.unacknowledged_count(), 0);
    let acked = alerts.get("alert-1").unwrap();
    assert_eq!(acked.acknowledged_by.as_deref(), Some("u1"));

    // The acknowledgment went out as an ALERT_UPDATE.
    let sent = sim.sent();
    assert_eq!(sent.len(), 1);
    let Message::AlertUpdate(update) = &sent[0].message else {
        panic!("expected ALERT_UPDATE, got {:?}", sent[0].kind());
    };
    assert_eq!(update.id, "alert-1");
    assert!(update.acknowledged);
    assert_eq!(update.acknowledged_by.as_deref(), Some("u1"));

    // Second acknowledgment is a no-op and sends nothing.
    assert!(!pipeline.acknowledge_alert("alert-1", "u2"));
    assert_eq!(sim.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn store_subscribers_see_each_change() {
    let (pipeline, sim) = pipeline(SimulationConfig::manual());
    let mut alerts = pipeline.stores().alerts.subscribe();
    assert_ok!(pipeline.start().await);

    sim.emit(Message::NewAlert(critical_alert("a")));
    let snap = tokio::time::timeout(Duration::from_secs(1), alerts.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snap.alerts.len(), 1);
    assert!(Arc::ptr_eq(alerts.current(), &snap));
}

#[tokio::test(start_paused = true)]
async fn activity_feed_reports_applied_envelopes() {
    let (pipeline, sim) = pipeline(SimulationConfig::manual());
    let mut activity = pipeline.activity();
    assert_ok!(pipeline.start().await);

    sim.emit(Message::AccessEvent(AccessEventPayload {
        id: Some("evt-1".into()),
        user_id: "user-3".into(),
        user_name: "Jordan Lee".into(),
        door_id: Some("door-002".into()),
        door_name: "Lab".into(),
        result: "granted".into(),
        timestamp: Utc::now(),
        credential_type: Some("CARD".into()),
        denial_reason: None,
        anomaly_score: Some(0.1),
    }));
    sim.emit(Message::UserActivity(UserActivityPayload {
        user_id: "user-3".into(),
        activity: "logout".into(),
        details: None,
    }));

    let first = activity.recv().await.unwrap();
    assert_eq!(first.kind(), MessageKind::AccessEvent);
    assert_eq!(FeedEntry::from(first.as_ref()).summary, "Jordan Lee entered Lab");
    let second = activity.recv().await.unwrap();
    assert_eq!(second.kind(), MessageKind::UserActivity);

    assert_eq!(pipeline.stores().access_events.events_for_door("door-002").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_alert_is_dropped_and_later_traffic_flows() {
    let (pipeline, sim) = pipeline(SimulationConfig::manual());
    assert_ok!(pipeline.start().await);

    let mut bad = critical_alert("bad");
    bad.alert_type = "FIRE_DRILL".into();
    sim.emit(Message::NewAlert(bad));
    sim.emit(Message::NewAlert(critical_alert("good")));

    let state = pipeline.stores().alerts.snapshot();
    assert_eq!(state.alerts.len(), 1);
    assert_eq!(state.alerts[0].id, "good");
}

#[tokio::test(start_paused = true)]
async fn generated_traffic_reaches_stores_until_shutdown() {
    let (pipeline, _sim) = pipeline(SimulationConfig {
        door_status: Duration::from_millis(500),
        access_event: Duration::from_millis(250),
        ..SimulationConfig::manual()
    });
    assert_ok!(pipeline.start().await);

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    let stores = Arc::clone(pipeline.stores());
    assert!(!stores.doors.is_empty());
    assert_eq!(stores.access_events.snapshot().events.len(), 8);

    pipeline.shutdown();
    assert_eq!(pipeline.connection_state(), ConnectionState::Disconnected);

    let frozen = stores.access_events.snapshot();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(Arc::ptr_eq(&frozen, &stores.access_events.snapshot()));
}

#[tokio::test(start_paused = true)]
async fn restart_after_shutdown_resubscribes() {
    let (pipeline, sim) = pipeline(SimulationConfig::manual());
    assert_ok!(pipeline.start().await);
    pipeline.shutdown();
    assert!(!sim.emit(Message::NewAlert(critical_alert("lost"))));

    assert_ok!(pipeline.start().await);
    assert!(sim.emit(Message::NewAlert(critical_alert("kept"))));
    assert_eq!(pipeline.stores().alerts.unacknowledged_count(), 1);
}
