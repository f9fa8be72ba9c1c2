//! Source feeds: where compressed bytes come from.
//!
//! A feed produces raw byte chunks on its own schedule — a streaming HTTP
//! response, a local file, or nothing at all. The feed loop in the streamer
//! polls `next_bytes()`; network arrival is a channel notification from a
//! transport thread, so byte acquisition never happens on the render path.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// What to stream. `None` leaves the player idle and silent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceDescriptor {
    Url(String),
    File(PathBuf),
    None,
}

/// One poll of a feed.
pub enum FeedStatus {
    /// A chunk of compressed bytes is ready.
    Bytes(Vec<u8>),
    /// Nothing ready right now; poll again.
    Idle,
    /// The source is exhausted (EOF / remote end closed cleanly).
    Finished,
    /// The transport failed mid-stream. The feed is unusable afterwards.
    Failed(String),
}

/// Acquire-bytes capability shared by all feed variants.
///
/// `next_bytes` may block, but only for a short bounded time — the feed loop
/// re-checks its stop flag between polls, and source switching waits for that
/// loop to exit. Implementations with nothing ready should wait briefly and
/// report `Idle` rather than spin.
///
/// `close()` releases held OS resources and is idempotent; dropping a closed
/// feed is always safe.
pub trait SourceFeed: Send {
    fn next_bytes(&mut self) -> FeedStatus;
    fn close(&mut self);
}

/// Open the feed for a descriptor. `SourceDescriptor::None` has no feed.
pub fn open_feed(descriptor: &SourceDescriptor) -> Result<Option<Box<dyn SourceFeed>>, String> {
    match descriptor {
        SourceDescriptor::Url(url) => Ok(Some(Box::new(NetworkFeed::connect(url.clone())))),
        SourceDescriptor::File(path) => Ok(Some(Box::new(FileFeed::open(path)?))),
        SourceDescriptor::None => Ok(None),
    }
}

// ─── Network feed ───

/// Read size for the streaming response body.
const NETWORK_READ_CHUNK: usize = 8 * 1024;

/// How long one `next_bytes` poll waits for the transport before reporting
/// `Idle`. Bounds how long the feed loop can block, which in turn bounds how
/// long `set_source` waits when joining the feed thread.
const NETWORK_POLL_TIMEOUT: Duration = Duration::from_millis(100);

enum TransportEvent {
    Data(Vec<u8>),
    Eof,
    Error(String),
}

/// Streaming HTTP source.
///
/// The blocking GET and the body read loop run on a dedicated transport
/// thread; chunks arrive over a bounded channel, which doubles as
/// backpressure when the consumer is pacing itself. Connect failures arrive
/// through the same channel as a `Failed` status.
pub struct NetworkFeed {
    rx: Option<Receiver<TransportEvent>>,
}

impl NetworkFeed {
    pub fn connect(url: String) -> Self {
        let (tx, rx) = bounded::<TransportEvent>(16);

        thread::Builder::new()
            .name("net-transport".into())
            .spawn(move || transport_loop(url, tx))
            .expect("Failed to spawn transport thread");

        Self { rx: Some(rx) }
    }
}

fn transport_loop(url: String, tx: Sender<TransportEvent>) {
    let response = match reqwest::blocking::get(&url) {
        Ok(r) => r,
        Err(e) => {
            let _ = tx.send(TransportEvent::Error(format!("Connect failed: {}", e)));
            return;
        }
    };
    if !response.status().is_success() {
        let _ = tx.send(TransportEvent::Error(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
        return;
    }

    let mut body = response;
    let mut buf = vec![0u8; NETWORK_READ_CHUNK];
    loop {
        match body.read(&mut buf) {
            Ok(0) => {
                let _ = tx.send(TransportEvent::Eof);
                return;
            }
            Ok(n) => {
                // send() fails only when the feed was closed; exit quietly.
                if tx.send(TransportEvent::Data(buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(TransportEvent::Error(format!("Stream read failed: {}", e)));
                return;
            }
        }
    }
}

impl SourceFeed for NetworkFeed {
    fn next_bytes(&mut self) -> FeedStatus {
        let Some(rx) = &self.rx else {
            return FeedStatus::Finished;
        };
        match rx.recv_timeout(NETWORK_POLL_TIMEOUT) {
            Ok(TransportEvent::Data(bytes)) => FeedStatus::Bytes(bytes),
            Ok(TransportEvent::Eof) => FeedStatus::Finished,
            Ok(TransportEvent::Error(e)) => FeedStatus::Failed(e),
            Err(RecvTimeoutError::Timeout) => FeedStatus::Idle,
            Err(RecvTimeoutError::Disconnected) => FeedStatus::Finished,
        }
    }

    fn close(&mut self) {
        // Dropping the receiver makes the transport thread's next send fail,
        // which ends it and releases the connection.
        self.rx = None;
    }
}

// ─── File feed ───

/// Bytes pulled from a local file per feed tick. Matches the pace the decode
/// pipeline expects; the feed loop's backpressure handles the rest.
const FILE_READ_CHUNK: usize = 1024 + 256;

pub struct FileFeed {
    file: Option<File>,
}

impl FileFeed {
    pub fn open(path: &PathBuf) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
        Ok(Self { file: Some(file) })
    }
}

impl SourceFeed for FileFeed {
    fn next_bytes(&mut self) -> FeedStatus {
        let Some(file) = &mut self.file else {
            return FeedStatus::Finished;
        };
        let mut buf = vec![0u8; FILE_READ_CHUNK];
        match file.read(&mut buf) {
            Ok(0) => FeedStatus::Finished,
            Ok(n) => {
                buf.truncate(n);
                FeedStatus::Bytes(buf)
            }
            Err(e) => FeedStatus::Failed(format!("File read failed: {}", e)),
        }
    }

    fn close(&mut self) {
        self.file = None;
    }
}
