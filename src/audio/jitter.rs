//! Sample jitter buffer.
//!
//! One FIFO queue of samples per audio channel, guarded by a single mutex
//! shared between the decode-and-enqueue thread (producer) and the render
//! path (consumer). Arrival jitter and decoder chunk-size mismatches are
//! absorbed here: the producer pushes variable-sized chunks, the consumer
//! pops exactly one period's worth of frames per call.
//!
//! Rules on both sides: critical sections stay short and bounded. No I/O and
//! no decode work ever runs while the lock is held.

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::buffer::PcmChunk;

struct Queues {
    channels: Vec<VecDeque<f32>>,
}

impl Queues {
    // Invariant: every channel queue has the same length.
    fn available_frames(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }
}

/// Per-channel FIFO queues of decoded samples.
///
/// The channel count is not known up front (the bitstream only reveals it once
/// decoding begins), so it is established from the first non-empty pushed
/// chunk and fixed until `clear()`.
pub struct JitterBuffer {
    queues: Mutex<Queues>,
}

impl JitterBuffer {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(Queues { channels: Vec::new() }),
        }
    }

    /// Append a decoded chunk, filling all channel queues in lock-step.
    ///
    /// The first non-empty chunk establishes the channel count. A later chunk
    /// with a different channel count is rejected whole and logged — a decoder
    /// reporting a changed channel layout mid-stream means the stream is not
    /// what we were playing.
    ///
    /// Returns the number of frames available after the push.
    pub fn push(&self, chunk: &PcmChunk) -> usize {
        let mut queues = self.queues.lock();

        if chunk.is_empty() {
            return queues.available_frames();
        }

        if queues.channels.is_empty() {
            for _ in 0..chunk.channel_count() {
                queues.channels.push(VecDeque::new());
            }
        } else if chunk.channel_count() != queues.channels.len() {
            log::warn!(
                "Rejecting chunk with {} channels (stream established {})",
                chunk.channel_count(),
                queues.channels.len()
            );
            return queues.available_frames();
        }

        for (ch, queue) in queues.channels.iter_mut().enumerate() {
            queue.extend(chunk.channel(ch).iter().copied());
        }

        queues.available_frames()
    }

    /// Dequeue up to `frame_count` frames per channel, FIFO order.
    ///
    /// Returns only what is available — possibly an empty chunk. Never blocks
    /// waiting for the producer; underrun is the caller's normal case, not an
    /// error.
    pub fn pop(&self, frame_count: usize) -> PcmChunk {
        let mut queues = self.queues.lock();

        let frames = frame_count.min(queues.available_frames());
        if frames == 0 {
            return PcmChunk::empty();
        }

        let mut planes = Vec::with_capacity(queues.channels.len());
        for queue in queues.channels.iter_mut() {
            planes.push(queue.drain(..frames).collect());
        }
        PcmChunk::from_planar(planes)
    }

    /// Discard all queued samples. The channel count is re-established from
    /// the next non-empty push, as if the buffer were newly constructed.
    pub fn clear(&self) {
        self.queues.lock().channels.clear();
    }

    pub fn available_frames(&self) -> usize {
        self.queues.lock().available_frames()
    }

    pub fn is_empty(&self) -> bool {
        self.available_frames() == 0
    }

    /// Established channel count; zero until the first non-empty push.
    pub fn channel_count(&self) -> usize {
        self.queues.lock().channels.len()
    }
}

impl Default for JitterBuffer {
    fn default() -> Self {
        Self::new()
    }
}
