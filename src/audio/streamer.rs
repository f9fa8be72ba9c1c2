//! Stream player: decode-and-enqueue pipeline plus buffering state machine.
//!
//! One feed thread (I/O side) pulls compressed bytes from the source feed,
//! decodes them in bounded slices and pushes the PCM into the jitter buffer.
//! The render side pops at most one period of frames per call, mixes them
//! additively into the output bus and never blocks on I/O or decode work.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::buffer::FrameBuffer;
use super::decoder::{Codec, Decoder};
use super::feed::{open_feed, FeedStatus, SourceDescriptor, SourceFeed};
use super::jitter::JitterBuffer;
use super::{AudioNode, REFERENCE_SAMPLE_RATE};

// ─── Pipeline Constants ───

/// Largest byte range handed to the decoder in one call. A big read is sliced
/// into chunks of at most this size, each decoded and pushed separately, so a
/// burst never turns into one unbounded decode call or one long lock hold.
const MAX_BYTES_PER_DECODE: usize = 2048;

/// Feed backoff while the buffer is comfortably full.
const BACKPRESSURE_SLEEP: Duration = Duration::from_millis(5);

// ─── Player State ───

/// Lifecycle of a stream player.
///
/// `Buffering -> Playing` fires exactly once per activation, when the jitter
/// buffer first reaches the configured threshold. There is no automatic
/// transition back on underrun: an underrun just renders fewer (or zero)
/// frames. While `Buffering`, render writes nothing even though decoding is
/// already filling the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum PlayerState {
    Idle,
    Buffering,
    Playing,
    Stopped,
}

struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: PlayerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn load(&self) -> PlayerState {
        match self.0.load(Ordering::Acquire) {
            0 => PlayerState::Idle,
            1 => PlayerState::Buffering,
            2 => PlayerState::Playing,
            _ => PlayerState::Stopped,
        }
    }

    fn store(&self, state: PlayerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// ─── Atomic f32 helpers (lock-free peak meter) ───

#[inline]
fn f32_to_atomic(v: f32) -> u32 {
    v.to_bits()
}
#[inline]
fn atomic_to_f32(b: u32) -> f32 {
    f32::from_bits(b)
}

/// Last-rendered per-channel peak amplitude. Written by the consumer after
/// each render, read by any observer — best-effort, atomics only.
pub struct PeakMeter {
    left: AtomicU32,
    right: AtomicU32,
}

impl PeakMeter {
    fn new() -> Self {
        Self {
            left: AtomicU32::new(0),
            right: AtomicU32::new(0),
        }
    }

    fn store(&self, peaks: [f32; 2]) {
        self.left.store(f32_to_atomic(peaks[0]), Ordering::Relaxed);
        self.right.store(f32_to_atomic(peaks[1]), Ordering::Relaxed);
    }

    pub fn read(&self) -> [f32; 2] {
        [
            atomic_to_f32(self.left.load(Ordering::Relaxed)),
            atomic_to_f32(self.right.load(Ordering::Relaxed)),
        ]
    }
}

// ─── Configuration ───

/// Stream player configuration.
#[derive(Clone, Copy, Debug)]
pub struct PlayerConfig {
    /// Audible playback starts once this much audio is buffered, measured at
    /// the reference sample rate.
    pub buffer_secs: f32,
    /// Codec of the incoming byte stream.
    pub codec: Codec,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            buffer_secs: 3.0,
            codec: Codec::Mp3,
        }
    }
}

// ─── Diagnostics ───

/// Observer-facing snapshot of the player, for meters and debug UI.
#[derive(Clone, Debug, serde::Serialize)]
pub struct StreamDiagnostics {
    pub state: PlayerState,
    /// Frames currently buffered per channel.
    pub buffered_frames: usize,
    /// Frames needed before playback starts.
    pub threshold_frames: usize,
    /// Established channel count (0 until the first decoded chunk).
    pub channels: usize,
    /// Last-rendered per-channel peaks.
    pub peaks: [f32; 2],
}

// ─── Stream Player ───

struct FeedHandle {
    running: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

/// The composed streaming unit: one source feed, one decoder, one jitter
/// buffer and the buffering state machine.
///
/// All methods take `&self`; the player is shared between a control context
/// (`set_source` / `stop`) and the real-time render context.
pub struct StreamPlayer {
    jitter: Arc<JitterBuffer>,
    state: Arc<StateCell>,
    peaks: Arc<PeakMeter>,
    feed: Mutex<Option<FeedHandle>>,
    threshold_frames: usize,
    codec: Codec,
}

impl StreamPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            jitter: Arc::new(JitterBuffer::new()),
            state: Arc::new(StateCell::new(PlayerState::Idle)),
            peaks: Arc::new(PeakMeter::new()),
            feed: Mutex::new(None),
            threshold_frames: (config.buffer_secs * REFERENCE_SAMPLE_RATE as f32) as usize,
            codec: config.codec,
        }
    }

    /// Construct and immediately start acquiring a source.
    pub fn with_source(config: PlayerConfig, descriptor: SourceDescriptor) -> Self {
        let player = Self::new(config);
        player.set_source(descriptor);
        player
    }

    /// Switch to a new source.
    ///
    /// The current stream is torn down synchronously — feed thread stopped and
    /// joined, decoder discarded with it, jitter buffer cleared — before the
    /// new acquisition starts, so nothing of the previous stream is ever
    /// audible in the new one. Safe to call again before acquisition of the
    /// previous source completed.
    pub fn set_source(&self, descriptor: SourceDescriptor) {
        let mut slot = self.feed.lock();
        self.teardown_slot(&mut slot);

        if descriptor == SourceDescriptor::None {
            self.state.store(PlayerState::Idle);
            return;
        }

        self.spawn_slot(&mut slot, FeedInit::Descriptor(descriptor));
    }

    /// Switch to an already-constructed feed.
    ///
    /// Same teardown contract as `set_source`; the player is parametric over
    /// the feed variant, so any `SourceFeed` implementation can drive it.
    pub fn set_source_feed(&self, feed: Box<dyn SourceFeed>) {
        let mut slot = self.feed.lock();
        self.teardown_slot(&mut slot);
        self.spawn_slot(&mut slot, FeedInit::Ready(feed));
    }

    fn spawn_slot(&self, slot: &mut Option<FeedHandle>, init: FeedInit) {
        self.state.store(PlayerState::Buffering);

        let running = Arc::new(AtomicBool::new(true));
        let running_c = running.clone();
        let jitter = self.jitter.clone();
        let state = self.state.clone();
        let codec = self.codec;
        let threshold = self.threshold_frames;

        let thread = thread::Builder::new()
            .name("stream-feed".into())
            .spawn(move || {
                feed_loop(init, codec, jitter, state, threshold, running_c);
            })
            .expect("Failed to spawn feed thread");

        *slot = Some(FeedHandle { running, thread });
    }

    /// Stop playback: release the feed and decoder, discard buffered audio.
    pub fn stop(&self) {
        let mut slot = self.feed.lock();
        self.teardown_slot(&mut slot);
        self.state.store(PlayerState::Stopped);
    }

    pub fn state(&self) -> PlayerState {
        self.state.load()
    }

    /// Frames currently queued per channel.
    pub fn buffered_frames(&self) -> usize {
        self.jitter.available_frames()
    }

    /// Last-rendered per-channel peak amplitudes.
    pub fn peak_levels(&self) -> [f32; 2] {
        self.peaks.read()
    }

    pub fn diagnostics(&self) -> StreamDiagnostics {
        StreamDiagnostics {
            state: self.state.load(),
            buffered_frames: self.jitter.available_frames(),
            threshold_frames: self.threshold_frames,
            channels: self.jitter.channel_count(),
            peaks: self.peaks.read(),
        }
    }

    /// Stop and join the current feed thread, then clear the buffer and the
    /// peak meter.
    ///
    /// The caller holds the feed-slot lock across the teardown and any
    /// following spawn, so concurrent source switches serialize instead of
    /// one of them dropping the other's handle and leaving a detached feed
    /// thread behind. Join is bounded: the feed loop only ever blocks on
    /// timed receives and short file reads. Clearing after the join means no
    /// stale chunk can land once the buffer is empty.
    fn teardown_slot(&self, slot: &mut Option<FeedHandle>) {
        if let Some(handle) = slot.take() {
            handle.running.store(false, Ordering::SeqCst);
            let _ = handle.thread.join();
        }
        self.jitter.clear();
        self.peaks.store([0.0, 0.0]);
    }
}

impl AudioNode for StreamPlayer {
    /// Consumer side, called once per fixed audio period.
    ///
    /// While not `Playing` the output is left untouched (it is an additive mix
    /// bus). Otherwise pops up to one period of frames — fewer on underrun,
    /// never blocking — mixes them in and updates the peak meter from the
    /// popped chunk.
    fn render(&self, out: &mut FrameBuffer) {
        if self.state.load() != PlayerState::Playing {
            return;
        }

        let chunk = self.jitter.pop(out.frame_count());
        if chunk.is_empty() {
            return;
        }

        out.mix(&chunk);
        self.peaks.store(chunk.peaks());
    }
}

impl Drop for StreamPlayer {
    fn drop(&mut self) {
        let mut slot = self.feed.lock();
        self.teardown_slot(&mut slot);
    }
}

// ─── Feed Loop (I/O-notification context) ───

enum FeedInit {
    Descriptor(SourceDescriptor),
    Ready(Box<dyn SourceFeed>),
}

fn feed_loop(
    init: FeedInit,
    codec: Codec,
    jitter: Arc<JitterBuffer>,
    state: Arc<StateCell>,
    threshold: usize,
    running: Arc<AtomicBool>,
) {
    let mut decoder = match codec.create_decoder() {
        Ok(d) => d,
        Err(e) => {
            log::error!("{}", e);
            state.store(PlayerState::Idle);
            return;
        }
    };

    let mut feed = match init {
        FeedInit::Ready(feed) => feed,
        FeedInit::Descriptor(descriptor) => match open_feed(&descriptor) {
            Ok(Some(f)) => f,
            Ok(None) => return,
            Err(e) => {
                // Acquisition failure: log and leave the player silent.
                log::error!("{}", e);
                state.store(PlayerState::Idle);
                return;
            }
        },
    };

    let high_watermark = (REFERENCE_SAMPLE_RATE as usize).max(threshold * 2);

    while running.load(Ordering::SeqCst) {
        // Don't flood the buffer; consumption pace bounds it from here on.
        if jitter.available_frames() >= high_watermark {
            thread::sleep(BACKPRESSURE_SLEEP);
            continue;
        }

        match feed.next_bytes() {
            FeedStatus::Bytes(bytes) => {
                decode_and_enqueue(decoder.as_mut(), &bytes, &jitter, &state, threshold);
            }
            FeedStatus::Idle => {}
            FeedStatus::Finished => {
                // A source shorter than the threshold would otherwise sit in
                // Buffering forever; start playback with what there is.
                if state.load() == PlayerState::Buffering && !jitter.is_empty() {
                    state.store(PlayerState::Playing);
                }
                break;
            }
            FeedStatus::Failed(e) => {
                log::error!("{}", e);
                break;
            }
        }
    }

    feed.close();
}

/// Decode a byte range in bounded slices, pushing each slice's output before
/// decoding the next. Many short lock holds instead of one long one; a decode
/// failure costs only that slice's samples.
fn decode_and_enqueue(
    decoder: &mut dyn Decoder,
    bytes: &[u8],
    jitter: &JitterBuffer,
    state: &StateCell,
    threshold: usize,
) {
    for slice in bytes.chunks(MAX_BYTES_PER_DECODE) {
        match decoder.decode(slice) {
            Ok(chunk) => {
                if chunk.is_empty() {
                    continue;
                }
                let available = jitter.push(&chunk);
                if available >= threshold && state.load() == PlayerState::Buffering {
                    state.store(PlayerState::Playing);
                }
            }
            Err(e) => {
                log::warn!("Decode failed on chunk: {}", e);
            }
        }
    }
}
