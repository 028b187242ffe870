use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, time};
use uuid::Uuid;

use crate::session::SessionConfig;

use super::{
    ReconnectPolicy, StreamEffect, StreamNotice, StreamNoticeKind, StreamPhase, StreamSupervisor,
    TransportEvent,
    error::StreamError,
    fakes::{FakeConnector, FakeStream, Sent},
};

const SIGNAL_FRAME: &str =
    r#"{"type":"signal","signal":"left","timestamp":"2025-01-01T00:00:00Z"}"#;

fn session_config() -> SessionConfig {
    SessionConfig::default()
        .with_heartbeat_interval(Duration::from_secs(3600))
        .with_stream_close_timeout(Duration::from_secs(2))
        .with_close_confirmation_timeout(Duration::from_millis(200))
        .with_reconnect_policy(
            ReconnectPolicy::default()
                .with_initial_delay(Duration::from_millis(10))
                .with_max_delay(Duration::from_millis(40)),
        )
}

fn supervisor(config: &SessionConfig, connector: FakeConnector) -> (StreamSupervisor, Arc<FakeConnector>) {
    let connector = Arc::new(connector);
    let supervisor = StreamSupervisor::new(config.into(), connector.clone());
    (supervisor, connector)
}

/// Receives notices until one matches `pred`, returning everything received.
async fn notices_until(
    notice_rx: &mut mpsc::UnboundedReceiver<StreamNotice>,
    pred: impl Fn(&StreamNoticeKind) -> bool,
) -> Vec<StreamNoticeKind> {
    let mut received = Vec::new();

    loop {
        let notice = time::timeout(Duration::from_secs(30), notice_rx.recv())
            .await
            .expect("notice timeout")
            .expect("notice channel closed");

        let matched = pred(&notice.kind);
        received.push(notice.kind);
        if matched {
            return received;
        }
    }
}

fn is_phase(kind: &StreamNoticeKind, expected: &StreamPhase) -> bool {
    matches!(kind, StreamNoticeKind::Effect(StreamEffect::PhaseChanged { phase, .. }) if phase == expected)
}

fn is_failed(kind: &StreamNoticeKind) -> bool {
    matches!(
        kind,
        StreamNoticeKind::Effect(StreamEffect::PhaseChanged {
            phase: StreamPhase::Failed(_),
            ..
        })
    )
}

fn is_notification(kind: &StreamNoticeKind, title: &str) -> bool {
    matches!(kind, StreamNoticeKind::Effect(StreamEffect::Notify(n)) if n.title() == title)
}

fn is_signal(kind: &StreamNoticeKind) -> bool {
    matches!(kind, StreamNoticeKind::Effect(StreamEffect::Signal(_)))
}

async fn open_stream(
    supervisor: &StreamSupervisor,
    streams_rx: &mut mpsc::UnboundedReceiver<FakeStream>,
) -> (mpsc::UnboundedReceiver<StreamNotice>, FakeStream, Uuid) {
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let session_id = Uuid::new_v4();

    supervisor.open(session_id, notice_tx).unwrap();

    notices_until(&mut notice_rx, |kind| {
        is_notification(kind, "Signal stream connected")
    })
    .await;
    let stream = streams_rx.recv().await.unwrap();

    (notice_rx, stream, session_id)
}

#[tokio::test]
async fn test_open_delivers_signals_tagged_with_session() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, _) = supervisor(&session_config(), connector);

    let (mut notice_rx, stream, session_id) = open_stream(&supervisor, &mut streams_rx).await;
    assert!(supervisor.is_open());

    stream.push_text(SIGNAL_FRAME);

    let notice = notice_rx.recv().await.unwrap();
    assert_eq!(notice.session_id, session_id);
    match notice.kind {
        StreamNoticeKind::Effect(StreamEffect::Signal(reading)) => {
            assert_eq!(reading.label(), "left");
            assert_eq!(reading.timestamp(), "2025-01-01T00:00:00Z");
        }
        other => panic!("unexpected notice: {other:?}"),
    }
}

#[tokio::test]
async fn test_open_while_open_is_rejected() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, connector) = supervisor(&session_config(), connector);

    let (_notice_rx, _stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    let (notice_tx, _) = mpsc::unbounded_channel();
    assert!(matches!(
        supervisor.open(Uuid::new_v4(), notice_tx),
        Err(StreamError::AlreadyOpen)
    ));
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_invalid_target_fails_synchronously() {
    let (connector, _streams_rx) = FakeConnector::new();
    let (supervisor, connector) = supervisor(&session_config(), connector.with_invalid_target());

    let (notice_tx, _notice_rx) = mpsc::unbounded_channel();

    assert!(supervisor.open(Uuid::new_v4(), notice_tx).is_err());
    assert!(!supervisor.is_open());
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_close_sends_normal_closure_and_is_idempotent() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, _) = supervisor(&session_config(), connector);

    let (mut notice_rx, stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    supervisor.close().await.unwrap();

    assert!(!supervisor.is_open());
    assert_eq!(stream.close_codes(), vec![1000]);

    // The final phase change is a silent normal closure
    let received = notices_until(&mut notice_rx, |kind| is_phase(kind, &StreamPhase::Closed)).await;
    assert!(
        !received
            .iter()
            .any(|kind| matches!(kind, StreamNoticeKind::Effect(StreamEffect::Notify(_))))
    );

    supervisor.close().await.unwrap();
    assert_eq!(stream.close_codes(), vec![1000]);
}

#[tokio::test]
async fn test_close_completes_without_peer_confirmation() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, _) = supervisor(&session_config(), connector.without_close_echo());

    let (_notice_rx, stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    supervisor.close().await.unwrap();

    assert!(!supervisor.is_open());
    assert_eq!(stream.close_codes(), vec![1000]);
}

#[tokio::test]
async fn test_close_without_stream_is_noop() {
    let (connector, _streams_rx) = FakeConnector::new();
    let (supervisor, _) = supervisor(&session_config(), connector);

    supervisor.close().await.unwrap();
    assert!(!supervisor.is_open());
}

#[tokio::test]
async fn test_malformed_frame_does_not_end_stream() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, connector) = supervisor(&session_config(), connector);

    let (mut notice_rx, stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    stream.push_text("\u{0}garbage{");
    stream.push_text(r#"{"type":"signal"}"#);
    stream.push_text(SIGNAL_FRAME);

    let received = notices_until(&mut notice_rx, is_signal).await;

    assert_eq!(received.len(), 1);
    assert!(supervisor.is_open());
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_undecodable_frame_is_dropped_silently() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, connector) = supervisor(&session_config(), connector);

    let (mut notice_rx, stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    stream.push(TransportEvent::Malformed("binary frame of 3 bytes".to_string()));
    stream.push(TransportEvent::Malformed("invalid UTF-8 in text frame".to_string()));
    stream.push_text(SIGNAL_FRAME);

    let received = notices_until(&mut notice_rx, is_signal).await;

    assert_eq!(received.len(), 1);
    assert!(supervisor.is_open());
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_ping_is_answered_with_pong() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, _) = supervisor(&session_config(), connector);

    let (mut notice_rx, stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    stream.push(TransportEvent::Ping(vec![1, 2, 3]));
    stream.push_text(SIGNAL_FRAME);
    notices_until(&mut notice_rx, is_signal).await;

    assert_eq!(stream.sent(), vec![Sent::Pong(vec![1, 2, 3])]);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_ping_then_timeout() {
    let config = session_config().with_heartbeat_interval(Duration::from_secs(15));
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, connector) = supervisor(&config, connector);

    let (mut notice_rx, stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    time::sleep(Duration::from_secs(16)).await;
    assert_eq!(stream.sent(), vec![Sent::Text("ping".to_string())]);

    // A second silent interval is a stream error, followed by a reconnection
    let received = notices_until(&mut notice_rx, |kind| {
        is_notification(kind, "Signal stream error")
    })
    .await;
    assert!(received.iter().any(is_failed));

    notices_until(&mut notice_rx, |kind| is_phase(kind, &StreamPhase::Open)).await;
    assert_eq!(connector.connects(), 2);
}

#[tokio::test]
async fn test_frames_reset_heartbeat() {
    let config = session_config().with_heartbeat_interval(Duration::from_millis(300));
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, _) = supervisor(&config, connector);

    let (mut notice_rx, stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    for _ in 0..4 {
        time::sleep(Duration::from_millis(100)).await;
        stream.push_text(SIGNAL_FRAME);
        notices_until(&mut notice_rx, is_signal).await;
    }

    assert!(stream.sent().is_empty());
}

#[tokio::test]
async fn test_abnormal_close_reconnects() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, connector) = supervisor(&session_config(), connector);

    let (mut notice_rx, stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    stream.push(TransportEvent::Closed { code: Some(1011) });

    let received = notices_until(&mut notice_rx, |kind| is_phase(kind, &StreamPhase::Open)).await;

    assert!(received.iter().any(|kind| matches!(
        kind,
        StreamNoticeKind::Effect(StreamEffect::Notify(n)) if n.description().contains("1011")
    )));
    assert!(
        received
            .iter()
            .any(|kind| is_notification(kind, "Reconnecting"))
    );
    assert_eq!(connector.connects(), 2);
    assert!(supervisor.is_open());
}

#[tokio::test]
async fn test_peer_close_is_not_answered_again() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, _) = supervisor(&session_config(), connector);

    let (mut notice_rx, stream, _) = open_stream(&supervisor, &mut streams_rx).await;

    stream.push(TransportEvent::Closed { code: Some(1001) });
    notices_until(&mut notice_rx, |kind| is_phase(kind, &StreamPhase::Open)).await;

    assert!(stream.close_codes().is_empty());

    let reconnected = streams_rx.recv().await.unwrap();
    supervisor.close().await.unwrap();

    assert_eq!(reconnected.close_codes(), vec![1000]);
}

#[tokio::test]
async fn test_exhausted_reconnects_terminate() {
    let config = session_config().with_reconnect_policy(
        ReconnectPolicy::default()
            .with_initial_delay(Duration::from_millis(5))
            .with_max_attempts(2),
    );
    let (connector, _streams_rx) = FakeConnector::new();
    let (supervisor, connector) = supervisor(&config, connector.refusing_all());

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    supervisor.open(Uuid::new_v4(), notice_tx).unwrap();

    let received = notices_until(&mut notice_rx, |kind| {
        matches!(kind, StreamNoticeKind::Terminated)
    })
    .await;

    let reconnecting = received
        .iter()
        .filter(|kind| is_notification(kind, "Reconnecting"))
        .count();

    assert_eq!(reconnecting, 2);
    assert_eq!(connector.connects(), 3);

    time::timeout(Duration::from_secs(1), async {
        while supervisor.is_open() {
            time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_attempts_reset_after_ready() {
    let config = session_config().with_reconnect_policy(
        ReconnectPolicy::default()
            .with_initial_delay(Duration::from_millis(5))
            .with_max_attempts(1),
    );
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, connector) = supervisor(&config, connector);

    let (mut notice_rx, first, _) = open_stream(&supervisor, &mut streams_rx).await;

    first.push(TransportEvent::Closed { code: Some(1006) });
    notices_until(&mut notice_rx, |kind| is_phase(kind, &StreamPhase::Open)).await;
    let second = streams_rx.recv().await.unwrap();

    second.push(TransportEvent::Closed { code: Some(1006) });
    notices_until(&mut notice_rx, |kind| is_phase(kind, &StreamPhase::Open)).await;

    assert_eq!(connector.connects(), 3);
    assert!(supervisor.is_open());
}

#[tokio::test]
async fn test_refused_connect_is_retried() {
    let (connector, mut streams_rx) = FakeConnector::new();
    let (supervisor, connector) = supervisor(&session_config(), connector.with_refusals(1));

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    supervisor.open(Uuid::new_v4(), notice_tx).unwrap();

    let received = notices_until(&mut notice_rx, |kind| is_phase(kind, &StreamPhase::Open)).await;

    assert!(received.iter().any(is_failed));
    assert!(
        received
            .iter()
            .any(|kind| is_notification(kind, "Signal stream error"))
    );
    assert!(streams_rx.recv().await.is_some());
    assert_eq!(connector.connects(), 2);
}
