//! Line-delimited stdio transport.
//!
//! The worker writes one JSON object per line to stdout and reads one command
//! per line from stdin. [`LineTransport`] splits the two directions:
//!
//! - [`LineSender`] serializes a [`Command`], appends `\n` and flushes, so the
//!   worker's line reader sees exactly one command per write
//! - [`LineReceiver`] frames the byte stream into lines and forwards them, in
//!   order, over an unbounded channel
//!
//! Framing is byte-oriented: invalid UTF-8 is replaced rather than treated as
//! a read error, and a trailing partial line is delivered at EOF.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::trace;
use wabridge_protocol::Command;

use crate::error::{Error, Result};

/// Bidirectional line transport over a pair of pipes.
pub struct LineTransport<W, R> {
	sender: LineSender<W>,
	receiver: LineReceiver<R>,
}

impl<W, R> LineTransport<W, R>
where
	W: AsyncWrite + Unpin + Send,
	R: AsyncRead + Unpin + Send,
{
	/// Creates a transport over `stdin` (worker input) and `stdout` (worker
	/// output). Returns the channel that received lines are delivered on.
	pub fn new(stdin: W, stdout: R) -> (Self, mpsc::UnboundedReceiver<String>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let transport = Self {
			sender: LineSender::new(stdin),
			receiver: LineReceiver::new(stdout, tx),
		};
		(transport, rx)
	}

	pub fn into_parts(self) -> (LineSender<W>, LineReceiver<R>) {
		(self.sender, self.receiver)
	}
}

/// Write half: one command per line.
pub struct LineSender<W> {
	writer: BufWriter<W>,
}

impl<W> LineSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	pub fn new(writer: W) -> Self {
		Self {
			writer: BufWriter::new(writer),
		}
	}

	/// Writes `command` as a single line and flushes.
	pub async fn send(&mut self, command: &Command) -> Result<()> {
		let line = command.to_line()?;
		trace!(target = "wabridge", command = command.name(), "writing command");
		self.writer
			.write_all(line.as_bytes())
			.await
			.map_err(|e| Error::Transport(format!("Failed to write command: {e}")))?;
		self.writer
			.flush()
			.await
			.map_err(|e| Error::Transport(format!("Failed to flush command: {e}")))?;
		Ok(())
	}
}

/// Read half: frames a byte stream into lines.
pub struct LineReceiver<R> {
	reader: BufReader<R>,
	tx: mpsc::UnboundedSender<String>,
}

impl<R> LineReceiver<R>
where
	R: AsyncRead + Unpin + Send,
{
	pub fn new(reader: R, tx: mpsc::UnboundedSender<String>) -> Self {
		Self {
			reader: BufReader::new(reader),
			tx,
		}
	}

	/// Reads until EOF, forwarding each line without its terminator.
	///
	/// Returns `Ok(())` on EOF or when the consumer has gone away, and an
	/// error if the underlying read fails.
	pub async fn run(mut self) -> Result<()> {
		let mut buf = Vec::with_capacity(4096);

		loop {
			buf.clear();
			let read = self
				.reader
				.read_until(b'\n', &mut buf)
				.await
				.map_err(|e| Error::Transport(format!("Failed to read line: {e}")))?;

			if read == 0 {
				return Ok(());
			}

			while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
				buf.pop();
			}

			let line = String::from_utf8_lossy(&buf).into_owned();
			if self.tx.send(line).is_err() {
				return Ok(());
			}
		}
	}
}

#[cfg(test)]
mod tests;
