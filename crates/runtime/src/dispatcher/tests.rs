use tokio::sync::broadcast::error::TryRecvError;
use wabridge_protocol::GroupRef;

use super::*;

fn drain(rx: &mut broadcast::Receiver<BridgeEvent>) -> Vec<BridgeEvent> {
	let mut events = Vec::new();
	loop {
		match rx.try_recv() {
			Ok(event) => events.push(event),
			Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
			Err(TryRecvError::Lagged(_)) => continue,
		}
	}
}

fn connected_dispatcher() -> Dispatcher {
	let dispatcher = Dispatcher::new(64);
	dispatcher.worker_started();
	dispatcher.handle_line(r#"{"type":"status","connected":true}"#);
	dispatcher
}

#[test]
fn test_status_sets_flag_and_emits_once() {
	let dispatcher = Dispatcher::new(16);
	let mut rx = dispatcher.subscribe();
	dispatcher.worker_started();

	dispatcher.handle_line(r#"{"type":"status","connected":true}"#);
	assert!(dispatcher.is_connected());
	assert_eq!(dispatcher.snapshot().phase, Phase::Connected);
	assert_eq!(drain(&mut rx), vec![BridgeEvent::ConnectionStatusChanged(true)]);

	dispatcher.handle_line(r#"{"type":"status","connected":false}"#);
	assert!(!dispatcher.is_connected());
	assert_eq!(dispatcher.snapshot().phase, Phase::Idle);
	assert_eq!(drain(&mut rx), vec![BridgeEvent::ConnectionStatusChanged(false)]);
}

#[test]
fn test_repeated_status_still_emits() {
	let dispatcher = connected_dispatcher();
	let mut rx = dispatcher.subscribe();

	dispatcher.handle_line(r#"{"type":"status","connected":true}"#);
	assert_eq!(drain(&mut rx), vec![BridgeEvent::ConnectionStatusChanged(true)]);
	assert_eq!(dispatcher.connect_count(), 2);
}

#[test]
fn test_status_precedes_groups() {
	let dispatcher = Dispatcher::new(16);
	let mut rx = dispatcher.subscribe();

	dispatcher.handle_line(r#"{"type":"status","connected":true}"#);
	dispatcher.handle_line(r#"{"type":"groups","groups":[{"id":"1","name":"A"}]}"#);

	assert_eq!(
		drain(&mut rx),
		vec![
			BridgeEvent::ConnectionStatusChanged(true),
			BridgeEvent::GroupsUpdated(vec![GroupRef::new("1", "A")]),
		]
	);
}

#[test]
fn test_groups_replace_previous_list() {
	let dispatcher = connected_dispatcher();

	dispatcher.handle_line(r#"{"type":"groups","groups":[{"id":"1","name":"A"},{"id":"2","name":"B"}]}"#);
	dispatcher.handle_line(r#"{"type":"groups","groups":[{"id":"3","name":"C"}]}"#);

	assert_eq!(dispatcher.snapshot().groups, vec![GroupRef::new("3", "C")]);
}

#[test]
fn test_disconnect_clears_groups() {
	let dispatcher = connected_dispatcher();
	dispatcher.handle_line(r#"{"type":"groups","groups":[{"id":"1","name":"A"}]}"#);

	dispatcher.handle_line(r#"{"type":"status","connected":false}"#);
	assert!(dispatcher.snapshot().groups.is_empty());
}

#[test]
fn test_monitoring_transitions() {
	let dispatcher = connected_dispatcher();
	let mut rx = dispatcher.subscribe();

	dispatcher.handle_line(r#"{"type":"monitoringStatus","monitoring":true}"#);
	assert!(dispatcher.is_monitoring());
	assert_eq!(dispatcher.snapshot().phase, Phase::Monitoring);

	dispatcher.handle_line(r#"{"type":"monitoringStatus","monitoring":false}"#);
	assert!(!dispatcher.is_monitoring());
	assert_eq!(dispatcher.snapshot().phase, Phase::Connected);

	assert_eq!(
		drain(&mut rx),
		vec![
			BridgeEvent::MonitoringStatusChanged(true),
			BridgeEvent::MonitoringStatusChanged(false),
		]
	);
}

#[test]
fn test_qr_is_forwarded_even_when_connected() {
	let dispatcher = connected_dispatcher();
	let mut rx = dispatcher.subscribe();

	dispatcher.handle_line(r#"{"type":"qr","qr":"2@abc"}"#);
	assert_eq!(drain(&mut rx), vec![BridgeEvent::QrCodeReceived("2@abc".into())]);
	assert!(dispatcher.is_connected());
}

#[test]
fn test_user_name_is_remembered() {
	let dispatcher = connected_dispatcher();
	dispatcher.handle_line(r#"{"type":"userName","name":"Ana"}"#);
	assert_eq!(dispatcher.snapshot().last_user_name, "Ana");
}

#[test]
fn test_error_notice_keeps_connection() {
	let dispatcher = connected_dispatcher();
	let mut rx = dispatcher.subscribe();

	dispatcher.handle_line(r#"{"type":"error","message":"chat fetch failed"}"#);
	assert!(dispatcher.is_connected());
	assert_eq!(drain(&mut rx), vec![BridgeEvent::Error("chat fetch failed".into())]);
}

#[test]
fn test_media_and_text_are_forwarded_without_state_change() {
	let dispatcher = connected_dispatcher();
	let before = dispatcher.snapshot();
	let mut rx = dispatcher.subscribe();

	dispatcher.handle_line(
		r#"{"type":"media","Media":{"Id":"m1","Type":"image/png","Data":"aGk=","Size":2}}"#,
	);
	dispatcher.handle_line(r#"{"type":"text","text":{"id":"t1","text":"hi"}}"#);

	let events = drain(&mut rx);
	assert_eq!(events.len(), 2);
	match &events[0] {
		BridgeEvent::MediaReceived(media) => {
			assert_eq!(media.id, "m1");
			assert_eq!(media.decode_data().unwrap(), b"hi");
		}
		other => panic!("Expected media, got {other:?}"),
	}
	assert!(matches!(&events[1], BridgeEvent::TextReceived(text) if text.text == "hi"));
	assert_eq!(dispatcher.snapshot(), before);
}

#[test]
fn test_media_without_payload_is_dropped() {
	let dispatcher = connected_dispatcher();
	let mut rx = dispatcher.subscribe();

	dispatcher.handle_line(r#"{"type":"media","Media":null}"#);
	dispatcher.handle_line(r#"{"type":"media"}"#);
	assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_noise_produces_no_events() {
	let dispatcher = connected_dispatcher();
	let before = dispatcher.snapshot();
	let mut rx = dispatcher.subscribe();

	for line in [
		"",
		"   ",
		"Client is ready!",
		"[debug] {\"type\":\"status\",\"connected\":false}",
		"{not json",
		"{\"connected\":false}",
		"{\"type\":\"somethingNew\",\"x\":1}",
		"{\"type\":\"status\",\"connected\":\"maybe\"}",
	] {
		dispatcher.handle_line(line);
	}

	assert!(drain(&mut rx).is_empty());
	assert_eq!(dispatcher.snapshot(), before);
}

#[test]
fn test_worker_exit_resets_and_announces() {
	let dispatcher = connected_dispatcher();
	dispatcher.handle_line(r#"{"type":"monitoringStatus","monitoring":true}"#);
	dispatcher.handle_line(r#"{"type":"userName","name":"Ana"}"#);
	let mut rx = dispatcher.subscribe();

	dispatcher.worker_exited(Some(1), false);

	assert!(!dispatcher.is_connected());
	assert!(!dispatcher.is_monitoring());
	assert_eq!(dispatcher.snapshot(), BridgeState::default());
	assert_eq!(
		drain(&mut rx),
		vec![
			BridgeEvent::ConnectionStatusChanged(false),
			BridgeEvent::MonitoringStatusChanged(false),
			BridgeEvent::WorkerExited {
				code: Some(1),
				expected: false
			},
		]
	);
}

#[test]
fn test_reset_only_announces_set_flags() {
	let dispatcher = connected_dispatcher();
	let mut rx = dispatcher.subscribe();

	dispatcher.reset();
	assert_eq!(drain(&mut rx), vec![BridgeEvent::ConnectionStatusChanged(false)]);

	dispatcher.reset();
	assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_preview_respects_char_boundaries() {
	let line = "é".repeat(LOG_PREVIEW_CHARS + 10);
	assert_eq!(preview(&line).chars().count(), LOG_PREVIEW_CHARS);
	assert_eq!(preview("short"), "short");
}
