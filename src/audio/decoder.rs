//! Push-style audio decoders.
//!
//! The pipeline hands decoders arbitrary byte chunks as they arrive from the
//! source feed; a decoder turns whatever whole frames it can out of them into
//! planar PCM and carries partial frames over to the next call. `reset()`
//! discards that carried state so a new stream is never interpreted through
//! leftover bytes of the old one.

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_MP3};
use symphonia::core::formats::Packet;

use super::buffer::PcmChunk;

/// Stateful bytes-to-PCM decoder.
///
/// `decode` never fails fatally on malformed input: corrupt sections yield
/// zero samples and decoding continues with later bytes. An `Err` is reserved
/// for misuse of the boundary itself (e.g. an unsupported configuration).
pub trait Decoder: Send {
    /// Decode as much of `bytes` as forms complete frames, returning the
    /// decoded samples. Leftover bytes are buffered for the next call.
    fn decode(&mut self, bytes: &[u8]) -> Result<PcmChunk, String>;

    /// Discard all partially-consumed bitstream state.
    fn reset(&mut self);
}

/// Codec selector for a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    Mp3,
    /// Raw interleaved signed 16-bit little-endian PCM.
    Pcm16 { channels: usize },
}

impl Codec {
    /// Construct the decoder for this codec.
    pub fn create_decoder(&self) -> Result<Box<dyn Decoder>, String> {
        match *self {
            Codec::Mp3 => Ok(Box::new(Mp3Decoder::new()?)),
            Codec::Pcm16 { channels } => {
                if channels == 0 {
                    return Err("PCM stream needs at least one channel".into());
                }
                Ok(Box::new(PcmDecoder::new(channels)))
            }
        }
    }
}

// ─── MPEG frame scanning ───
//
// Symphonia's MP3 codec decodes one whole MPEG frame per packet, so the byte
// stream has to be framed before it can be fed in. The header carries enough
// to compute the frame length; the bitstream itself stays opaque to us.

const BITRATES_V1_L3: [u32; 14] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const BITRATES_V2_L3: [u32; 14] = [
    8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];
const SAMPLE_RATES_V1: [u32; 3] = [44_100, 48_000, 32_000];

/// Byte length of the MPEG audio frame starting at `header`, or `None` if
/// these four bytes are not a valid Layer III frame header.
fn mp3_frame_len(header: &[u8]) -> Option<usize> {
    if header.len() < 4 || header[0] != 0xFF || header[1] & 0xE0 != 0xE0 {
        return None;
    }

    let version = (header[1] >> 3) & 0x03; // 0 = MPEG2.5, 2 = MPEG2, 3 = MPEG1
    let layer = (header[1] >> 1) & 0x03; // 1 = Layer III
    let bitrate_idx = (header[2] >> 4) & 0x0F;
    let rate_idx = ((header[2] >> 2) & 0x03) as usize;
    let padding = ((header[2] >> 1) & 0x01) as usize;

    if version == 1 || layer != 1 || rate_idx == 3 {
        return None;
    }
    // Free-format (0) and invalid (15) bitrates can't be framed from the header.
    if bitrate_idx == 0 || bitrate_idx == 15 {
        return None;
    }

    let bitrate_idx = (bitrate_idx - 1) as usize;
    let (bitrate_kbps, sample_rate, coefficient) = match version {
        3 => (BITRATES_V1_L3[bitrate_idx], SAMPLE_RATES_V1[rate_idx], 144),
        2 => (BITRATES_V2_L3[bitrate_idx], SAMPLE_RATES_V1[rate_idx] / 2, 72),
        _ => (BITRATES_V2_L3[bitrate_idx], SAMPLE_RATES_V1[rate_idx] / 4, 72),
    };

    Some(coefficient * (bitrate_kbps as usize * 1000) / sample_rate as usize + padding)
}

/// MP3 decoder: MPEG sync scanner in front of symphonia's MP3 codec.
///
/// Bytes accumulate in `pending`; every complete frame found is decoded as one
/// packet. A frame that fails to decode is skipped — it contributes zero
/// samples and scanning continues, so malformed input degrades to silence
/// instead of ending the stream.
pub struct Mp3Decoder {
    inner: Box<dyn symphonia::core::codecs::Decoder>,
    pending: Vec<u8>,
}

impl Mp3Decoder {
    pub fn new() -> Result<Self, String> {
        let mut params = CodecParameters::new();
        params.for_codec(CODEC_TYPE_MP3);

        let inner = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| format!("Failed to create MP3 decoder: {}", e))?;

        Ok(Self {
            inner,
            pending: Vec::new(),
        })
    }
}

impl Decoder for Mp3Decoder {
    fn decode(&mut self, bytes: &[u8]) -> Result<PcmChunk, String> {
        self.pending.extend_from_slice(bytes);

        let mut out = PcmChunk::empty();
        let mut pos = 0;

        while pos + 4 <= self.pending.len() {
            let Some(frame_len) = mp3_frame_len(&self.pending[pos..]) else {
                // Not a frame header here — resync one byte further on.
                pos += 1;
                continue;
            };
            if pos + frame_len > self.pending.len() {
                // Incomplete frame; wait for more bytes.
                break;
            }

            let packet = Packet::new_from_slice(0, 0, 0, &self.pending[pos..pos + frame_len]);
            pos += frame_len;

            match self.inner.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let frames = decoded.frames();
                    if frames > 0 {
                        let mut sample_buf = SampleBuffer::<f32>::new(frames as u64, spec);
                        sample_buf.copy_interleaved_ref(decoded);
                        out.append(&PcmChunk::from_interleaved(
                            sample_buf.samples(),
                            spec.channels.count(),
                        ));
                    }
                }
                Err(e) => {
                    // Bad frame, or a false sync that framed garbage. Skip it.
                    log::warn!("MP3 frame failed to decode: {}", e);
                }
            }
        }

        self.pending.drain(..pos);
        Ok(out)
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.inner.reset();
    }
}

/// Raw interleaved s16le decoder.
///
/// Used for uncompressed streams and as the deterministic decoder in tests.
/// A trailing partial frame carries across calls, so slicing the input at
/// arbitrary byte boundaries never changes the decoded output.
pub struct PcmDecoder {
    channels: usize,
    pending: Vec<u8>,
}

impl PcmDecoder {
    pub fn new(channels: usize) -> Self {
        debug_assert!(channels > 0);
        Self {
            channels,
            pending: Vec::new(),
        }
    }
}

impl Decoder for PcmDecoder {
    fn decode(&mut self, bytes: &[u8]) -> Result<PcmChunk, String> {
        self.pending.extend_from_slice(bytes);

        let frame_bytes = 2 * self.channels;
        let usable = self.pending.len() - self.pending.len() % frame_bytes;
        if usable == 0 {
            return Ok(PcmChunk::empty());
        }

        let samples: Vec<f32> = self.pending[..usable]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32_768.0)
            .collect();
        self.pending.drain(..usable);

        Ok(PcmChunk::from_interleaved(&samples, self.channels))
    }

    fn reset(&mut self) {
        self.pending.clear();
    }
}
