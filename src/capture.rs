//! Output capture for a spawned runner.
//!
//! Each child stream gets a reader that forwards raw chunks over a channel; a single appender
//! drains the channel into one buffer. The appender is the only writer, so the combined text
//! follows the order in which chunks arrived, whichever stream they came from.
//!
//! Readers and appender are polled together on the caller's task; no threads are spawned.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

const CHUNK_SIZE: usize = 8 * 1024;

/// Which child stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

#[derive(Debug)]
struct Chunk {
    stream: StreamKind,
    bytes: Vec<u8>,
}

/// Accumulates the combined text of a child's stdout and stderr.
#[derive(Debug, Default)]
pub struct OutputCapture {
    echo: bool,
    text: String,
    // Incomplete UTF-8 sequences held back until the next chunk of the same stream.
    pending_stdout: Vec<u8>,
    pending_stderr: Vec<u8>,
}

impl OutputCapture {
    /// Create a capture; with `echo` set, every chunk is also written to this process's own
    /// stdout/stderr as it arrives.
    pub fn new(echo: bool) -> Self {
        Self {
            echo,
            ..Self::default()
        }
    }

    /// Read both streams to EOF and return the combined text.
    ///
    /// A missing stream (not piped) is treated as empty.
    pub async fn drain<O, E>(mut self, stdout: Option<O>, stderr: Option<E>) -> String
    where
        O: AsyncRead + Unpin,
        E: AsyncRead + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stdout_reader = pump(stdout, StreamKind::Stdout, tx.clone());
        let stderr_reader = pump(stderr, StreamKind::Stderr, tx);
        let appender = async {
            while let Some(chunk) = rx.recv().await {
                self.append(chunk).await;
            }
        };
        tokio::join!(stdout_reader, stderr_reader, appender);
        self.finish()
    }

    async fn append(&mut self, chunk: Chunk) {
        if self.echo {
            echo(chunk.stream, &chunk.bytes).await;
        }
        let pending = match chunk.stream {
            StreamKind::Stdout => &mut self.pending_stdout,
            StreamKind::Stderr => &mut self.pending_stderr,
        };
        let decoded = decode_utf8(pending, &chunk.bytes);
        self.text.push_str(&decoded);
    }

    fn finish(mut self) -> String {
        for pending in [&self.pending_stdout, &self.pending_stderr] {
            if !pending.is_empty() {
                self.text.push_str(&String::from_utf8_lossy(pending));
            }
        }
        self.text
    }
}

async fn pump<R>(reader: Option<R>, stream: StreamKind, tx: mpsc::UnboundedSender<Chunk>)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = Chunk {
                    stream,
                    bytes: buf[..n].to_vec(),
                };
                if tx.send(chunk).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(?stream, error = %e, "child stream read failed");
                break;
            }
        }
    }
}

async fn echo(stream: StreamKind, bytes: &[u8]) {
    // Echo is best effort; a closed parent stream must not affect capture.
    let _ = match stream {
        StreamKind::Stdout => {
            let mut out = tokio::io::stdout();
            match out.write_all(bytes).await {
                Ok(()) => out.flush().await,
                Err(e) => Err(e),
            }
        }
        StreamKind::Stderr => {
            let mut err = tokio::io::stderr();
            match err.write_all(bytes).await {
                Ok(()) => err.flush().await,
                Err(e) => Err(e),
            }
        }
    };
}

/// Decode `bytes` appended to `pending`, keeping a trailing incomplete sequence in `pending`.
fn decode_utf8(pending: &mut Vec<u8>, bytes: &[u8]) -> String {
    pending.extend_from_slice(bytes);
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}
