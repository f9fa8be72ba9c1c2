//! Multi-channel sample buffer types.
//!
//! `PcmChunk` is the transient output of one decode call: planar f32 samples,
//! consumed immediately by the jitter buffer or the render path. `FrameBuffer`
//! is the additive mix bus handed to `render()` once per audio period: sources
//! sum into it rather than overwrite it, so several players can share one
//! output.

/// A transient, planar chunk of decoded samples (one `Vec<f32>` per channel).
///
/// All channels always hold the same number of frames.
#[derive(Clone, Debug, Default)]
pub struct PcmChunk {
    channels: Vec<Vec<f32>>,
}

impl PcmChunk {
    /// An empty chunk (zero channels, zero frames).
    pub fn empty() -> Self {
        Self { channels: Vec::new() }
    }

    /// Build a chunk from planar channel data. All channels must have equal
    /// length; unequal input is a caller bug.
    pub fn from_planar(channels: Vec<Vec<f32>>) -> Self {
        if let Some(first) = channels.first() {
            debug_assert!(channels.iter().all(|c| c.len() == first.len()));
        }
        Self { channels }
    }

    /// De-interleave `samples` into `channel_count` planes.
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn from_interleaved(samples: &[f32], channel_count: usize) -> Self {
        if channel_count == 0 {
            return Self::empty();
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel. Zero for an empty chunk.
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Samples of one channel.
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch]
    }

    /// Append another chunk's samples, channel by channel. The other chunk
    /// must have the same channel count (or this chunk must still be empty).
    pub fn append(&mut self, other: &PcmChunk) {
        if other.is_empty() {
            return;
        }
        if self.channels.is_empty() {
            self.channels = vec![Vec::new(); other.channel_count()];
        }
        for (dst, src) in self.channels.iter_mut().zip(&other.channels) {
            dst.extend_from_slice(src);
        }
    }

    /// Peak absolute amplitude of the first two channels (mono peaks are
    /// mirrored to both sides). Used for level metering.
    pub fn peaks(&self) -> [f32; 2] {
        let mut peaks = [0.0f32; 2];
        for (i, ch) in self.channels.iter().take(2).enumerate() {
            peaks[i] = ch.iter().fold(0.0f32, |p, s| p.max(s.abs()));
        }
        if self.channels.len() == 1 {
            peaks[1] = peaks[0];
        }
        peaks
    }
}

/// Fixed-size multi-channel mix bus for one render period.
///
/// Stored planar. `mix()` adds into the existing contents; the driver-facing
/// side converts to interleaved with `write_interleaved()`.
pub struct FrameBuffer {
    data: Vec<f32>,
    channels: usize,
    frames: usize,
}

impl FrameBuffer {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels * frames],
            channels,
            frames,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Zero every sample. Called once per period before sources mix in.
    pub fn silence(&mut self) {
        for s in self.data.iter_mut() {
            *s = 0.0;
        }
    }

    #[inline]
    pub fn sample(&self, ch: usize, frame: usize) -> f32 {
        self.data[ch * self.frames + frame]
    }

    #[inline]
    pub fn set(&mut self, ch: usize, frame: usize, value: f32) {
        self.data[ch * self.frames + frame] = value;
    }

    #[inline]
    pub fn add(&mut self, ch: usize, frame: usize, value: f32) {
        self.data[ch * self.frames + frame] += value;
    }

    /// Additively mix a chunk into this buffer, starting at frame 0.
    ///
    /// Channels and frames beyond this buffer's dimensions are ignored; a
    /// short chunk simply contributes fewer frames.
    pub fn mix(&mut self, chunk: &PcmChunk) {
        let channels = chunk.channel_count().min(self.channels);
        for ch in 0..channels {
            let src = chunk.channel(ch);
            let frames = src.len().min(self.frames);
            let base = ch * self.frames;
            for (i, &s) in src[..frames].iter().enumerate() {
                self.data[base + i] += s;
            }
        }
    }

    /// Peak absolute amplitude of the first two channels of current contents.
    pub fn peaks(&self) -> [f32; 2] {
        let mut peaks = [0.0f32; 2];
        for (i, peak) in peaks.iter_mut().enumerate().take(self.channels.min(2)) {
            let base = i * self.frames;
            *peak = self.data[base..base + self.frames]
                .iter()
                .fold(0.0f32, |p, s| p.max(s.abs()));
        }
        if self.channels == 1 {
            peaks[1] = peaks[0];
        }
        peaks
    }

    /// Write the contents interleaved into a driver buffer.
    /// `out` must hold exactly `channels * frames` samples.
    pub fn write_interleaved(&self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.channels * self.frames);
        for frame in 0..self.frames {
            for ch in 0..self.channels {
                out[frame * self.channels + ch] = self.data[ch * self.frames + frame];
            }
        }
    }
}
