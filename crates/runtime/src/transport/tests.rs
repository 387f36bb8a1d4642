use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::*;

#[tokio::test]
async fn test_send_writes_one_line_per_command() {
	let (stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, _stdout_write) = tokio::io::duplex(1024);

	let (transport, _rx) = LineTransport::new(stdin_write, stdout_read);
	let (mut sender, _receiver) = transport.into_parts();

	sender.send(&Command::GetGroups).await.unwrap();
	sender.send(&Command::monitor_group("g1")).await.unwrap();

	let mut lines = BufReader::new(stdin_read).lines();
	assert_eq!(
		lines.next_line().await.unwrap().unwrap(),
		r#"{"type":"get_groups"}"#
	);
	assert_eq!(
		lines.next_line().await.unwrap().unwrap(),
		r#"{"type":"monitor_group","groupId":"g1"}"#
	);
}

#[tokio::test]
async fn test_lines_arrive_in_order() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(4096);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(4096);

	let (transport, mut rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let read_task = tokio::spawn(receiver.run());

	stdout_write
		.write_all(b"{\"type\":\"status\",\"connected\":true}\n[log] hello\r\n{\"type\":\"groups\",\"groups\":[]}\n")
		.await
		.unwrap();
	stdout_write.flush().await.unwrap();

	assert_eq!(
		rx.recv().await.unwrap(),
		r#"{"type":"status","connected":true}"#
	);
	assert_eq!(rx.recv().await.unwrap(), "[log] hello");
	assert_eq!(
		rx.recv().await.unwrap(),
		r#"{"type":"groups","groups":[]}"#
	);

	drop(stdout_write);
	assert!(read_task.await.unwrap().is_ok());
	assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_partial_writes_are_joined() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (transport, mut rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let read_task = tokio::spawn(receiver.run());

	stdout_write.write_all(b"{\"type\":\"q").await.unwrap();
	stdout_write.flush().await.unwrap();
	tokio::task::yield_now().await;
	stdout_write.write_all(b"r\",\"qr\":\"abc\"}\n").await.unwrap();
	stdout_write.flush().await.unwrap();

	assert_eq!(rx.recv().await.unwrap(), r#"{"type":"qr","qr":"abc"}"#);

	drop(stdout_write);
	let _ = read_task.await;
}

#[tokio::test]
async fn test_trailing_line_without_newline_is_delivered_at_eof() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (transport, mut rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let read_task = tokio::spawn(receiver.run());

	stdout_write.write_all(b"last words").await.unwrap();
	drop(stdout_write);

	assert_eq!(rx.recv().await.unwrap(), "last words");
	assert!(rx.recv().await.is_none());
	assert!(read_task.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_invalid_utf8_is_replaced() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (transport, mut rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let read_task = tokio::spawn(receiver.run());

	stdout_write.write_all(b"bad \xff byte\n").await.unwrap();
	drop(stdout_write);

	let line = rx.recv().await.unwrap();
	assert!(line.starts_with("bad "));
	assert!(line.contains('\u{FFFD}'));
	assert!(read_task.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_large_line() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024 * 1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024 * 1024);

	let (transport, mut rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let read_task = tokio::spawn(receiver.run());

	let data = "A".repeat(200_000);
	let line = format!(r#"{{"type":"media","Media":{{"Data":"{data}"}}}}"#);
	let writer = tokio::spawn(async move {
		stdout_write.write_all(line.as_bytes()).await.unwrap();
		stdout_write.write_all(b"\n").await.unwrap();
		stdout_write.flush().await.unwrap();
		drop(stdout_write);
	});

	let received = rx.recv().await.unwrap();
	assert!(received.len() > 200_000);
	assert!(received.ends_with("\"}}"));

	writer.await.unwrap();
	let _ = read_task.await;
}

#[tokio::test]
async fn test_receiver_stops_when_consumer_is_gone() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (transport, rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	drop(rx);

	stdout_write.write_all(b"anything\n").await.unwrap();
	stdout_write.flush().await.unwrap();

	assert!(receiver.run().await.is_ok());
}

#[tokio::test]
async fn test_send_to_closed_pipe_is_a_transport_error() {
	let (stdin_read, stdin_write) = tokio::io::duplex(16);
	let (stdout_read, _stdout_write) = tokio::io::duplex(16);
	drop(stdin_read);

	let (transport, _rx) = LineTransport::new(stdin_write, stdout_read);
	let (mut sender, _receiver) = transport.into_parts();

	let err = sender.send(&Command::Logout).await.unwrap_err();
	assert!(matches!(err, Error::Transport(_)));
}
