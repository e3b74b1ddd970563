use super::*;
use crate::autopilot::TelemetrySnapshot;
use crate::testing::RecordingLink;
use std::sync::Arc;

fn channel() -> (
    StoreAndForward<Arc<RecordingLink>>,
    tokio::sync::mpsc::Receiver<InboundCommand>,
    Arc<RecordingLink>,
) {
    let link = Arc::new(RecordingLink::new());
    let (channel, commands) = StoreAndForward::new(Arc::clone(&link), "drone-7");
    (channel, commands, link)
}

fn command_json(command_type: &str, payload: &str) -> Vec<u8> {
    format!(
        r#"{{"message_id": "cmd-1", "timestamp": "2026-03-01T12:00:00Z", "drone_id": "drone-7",
            "direction": "inbound", "command_type": "{command_type}", "payload": {payload}}}"#
    )
    .into_bytes()
}

#[tokio::test]
async fn test_buffer_drops_oldest_beyond_capacity() {
    let (mut channel, _commands, link) = channel();
    for i in 1..=1001 {
        channel.publish(&format!("t/{i}"), vec![0]).await;
    }
    assert_eq!(channel.buffered_len(), 1000);
    let topics = channel.buffered_topics();
    assert_eq!(topics[0], "t/2");
    assert_eq!(topics[998], "t/1000");
    assert_eq!(topics[999], "t/1001");
    assert!(link.topics().is_empty());

    channel.handle_event(LinkEvent::Connected).await;
    assert_eq!(channel.buffered_len(), 0);
    let replayed = link.topics();
    assert_eq!(replayed.len(), 1000);
    assert_eq!(replayed.first().map(String::as_str), Some("t/2"));
    assert_eq!(replayed.last().map(String::as_str), Some("t/1001"));
}

#[tokio::test]
async fn test_reconnect_subscribes_and_drains_once() {
    let (mut channel, _commands, link) = channel();
    channel.publish("a", b"1".to_vec()).await;
    channel.publish("b", b"2".to_vec()).await;

    channel.handle_event(LinkEvent::Connected).await;
    assert!(channel.is_connected());
    assert_eq!(link.topics(), ["a", "b"]);
    assert_eq!(*link.subscriptions.lock().unwrap(), ["drone/drone-7/command/#"]);

    // empty buffer, nothing replayed twice
    channel.handle_event(LinkEvent::Connected).await;
    assert_eq!(link.topics().len(), 2);

    channel.publish("c", b"3".to_vec()).await;
    assert_eq!(link.topics(), ["a", "b", "c"]);

    channel.handle_event(LinkEvent::Disconnected).await;
    assert!(!channel.is_connected());
    channel.publish("d", b"4".to_vec()).await;
    assert_eq!(channel.buffered_len(), 1);
}

#[tokio::test]
async fn test_failed_sends_are_kept_in_order() {
    let (mut channel, _commands, link) = channel();
    channel.handle_event(LinkEvent::Connected).await;

    link.set_failing(true);
    channel.publish("x", b"1".to_vec()).await;
    channel.publish("y", b"2".to_vec()).await;
    assert_eq!(channel.buffered_topics(), ["x", "y"]);

    // a drain that fails keeps the head of the queue
    channel.handle_event(LinkEvent::Connected).await;
    assert_eq!(channel.buffered_topics(), ["x", "y"]);

    link.set_failing(false);
    channel.handle_event(LinkEvent::Connected).await;
    assert_eq!(link.topics(), ["x", "y"]);
}

#[tokio::test]
async fn test_commands_are_routed_to_queue() {
    let (mut channel, mut commands, _link) = channel();
    channel
        .handle_event(LinkEvent::Message {
            topic: "drone/drone-7/command/mission".into(),
            payload: command_json(
                "mission_segment",
                r#"{"segment_id": "seg-9", "mission_id": "m-1", "capture_images": false,
                    "waypoints": [{"latitude": 47.0, "longitude": 8.0, "altitude": 25.0}]}"#,
            ),
        })
        .await;
    channel
        .handle_event(LinkEvent::Message {
            topic: "drone/drone-7/command/recall".into(),
            payload: command_json("recall", "{}"),
        })
        .await;

    match commands.try_recv().unwrap() {
        InboundCommand::MissionSegment(segment) => {
            assert_eq!(segment.segment_id, "seg-9");
            assert_eq!(segment.waypoints.len(), 1);
            assert!(!segment.capture_images);
        }
        other => panic!("unexpected command {other:?}"),
    }
    assert!(matches!(commands.try_recv().unwrap(), InboundCommand::Recall));
}

#[tokio::test]
async fn test_bad_inbound_messages_are_dropped() {
    let (mut channel, mut commands, _link) = channel();
    let bad = [
        ("drone/drone-7/command/x", b"not json".to_vec()),
        ("drone/drone-7/command/x", command_json("self_destruct", "{}")),
        ("drone/drone-7/command/x", command_json("mission_segment", r#"{"segment_id": "s"}"#)),
        ("drone/drone-8/command/x", command_json("abort", "{}")),
    ];
    for (topic, payload) in bad {
        channel.handle_event(LinkEvent::Message { topic: topic.into(), payload }).await;
    }
    assert!(commands.try_recv().is_err());

    channel
        .handle_event(LinkEvent::Message {
            topic: "drone/drone-7/command/abort".into(),
            payload: command_json("abort", "{}"),
        })
        .await;
    assert!(matches!(commands.try_recv().unwrap(), InboundCommand::Abort));
}

#[test]
fn test_topic_matching() {
    assert!(topic_matches("drone/a/command/#", "drone/a/command/abort"));
    assert!(topic_matches("drone/a/command/#", "drone/a/command/x/y"));
    assert!(topic_matches("drone/a/command/#", "drone/a/command"));
    assert!(!topic_matches("drone/a/command/#", "drone/b/command/abort"));
    assert!(topic_matches("drone/+/telemetry/position", "drone/a/telemetry/position"));
    assert!(!topic_matches("drone/+/telemetry", "drone/a/telemetry/position"));
    assert!(!topic_matches("drone/a", "drone"));
}

#[test]
fn test_telemetry_message_shape() {
    let now = chrono::DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z").unwrap().to_utc();
    let message = TelemetryMessage::position("drone-7", &TelemetrySnapshot::at(47.1, 8.2, 30.0), now);
    assert_eq!(message.message_id, format!("telem-drone-7-{}", now.timestamp()));
    assert_eq!(message.topic(), "drone/drone-7/telemetry/position");

    let json: serde_json::Value = serde_json::to_value(&message).unwrap();
    assert_eq!(json["direction"], "outbound");
    assert_eq!(json["report_type"], "position");
    assert!((json["latitude"].as_f64().unwrap() - 47.1).abs() < 1e-9);
}
