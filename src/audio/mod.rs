//! Jitter-buffered streaming audio pipeline.
//!
//! Compressed bytes arrive on their own schedule (network, file), get decoded
//! into per-channel PCM and queue up in a jitter buffer; the audio driver
//! drains exactly one period of frames per render call. Two execution
//! contexts meet at the jitter buffer's mutex and nowhere else.

pub mod buffer;
pub mod decoder;
pub mod feed;
pub mod jitter;
pub mod oscillator;
pub mod output;
pub mod streamer;

pub use buffer::{FrameBuffer, PcmChunk};
pub use decoder::{Codec, Decoder, Mp3Decoder, PcmDecoder};
pub use feed::{SourceDescriptor, SourceFeed};
pub use jitter::JitterBuffer;
pub use oscillator::TestTonePlayer;
pub use streamer::{PlayerConfig, PlayerState, StreamDiagnostics, StreamPlayer};

/// Reference sample rate for buffering-duration math and the synthetic tone.
pub const REFERENCE_SAMPLE_RATE: u32 = 44_100;

/// A playback source the driver-facing side can drain.
///
/// `render` is invoked once per fixed audio period and must complete within
/// the period deadline: it additively mixes into `out` (an already-prepared
/// mix bus) and never blocks on I/O, decode work or an unbounded lock.
pub trait AudioNode: Send + Sync {
    fn render(&self, out: &mut FrameBuffer);
}
