//! Synthetic source: diagnostic tone injection.
//!
//! Generates a sine wave straight into the render path, bypassing feed,
//! decode and jitter buffer entirely, while honoring the same render
//! contract as a real stream (additive mix, peak metering, never blocks).

use parking_lot::Mutex;
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::buffer::FrameBuffer;
use super::{AudioNode, REFERENCE_SAMPLE_RATE};

const DEFAULT_TONE_HZ: f32 = 440.0;
const DEFAULT_TONE_AMPLITUDE: f32 = 0.25;

/// Fixed-frequency sine generator. Every channel gets the same signal.
pub struct Oscillator {
    frequency_hz: f32,
    amplitude: f32,
    sample_rate: u32,
    phase: f32,
}

impl Oscillator {
    pub fn new(frequency_hz: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            frequency_hz,
            amplitude,
            sample_rate,
            phase: 0.0,
        }
    }

    /// Additively mix one period of the tone into the output.
    pub fn render(&mut self, out: &mut FrameBuffer) {
        let step = TAU * self.frequency_hz / self.sample_rate as f32;
        for frame in 0..out.frame_count() {
            let sample = self.phase.sin() * self.amplitude;
            for ch in 0..out.channel_count() {
                out.add(ch, frame, sample);
            }
            self.phase = (self.phase + step) % TAU;
        }
    }
}

/// Self-test tone player with the same render contract as `StreamPlayer`.
///
/// `set_source`-equivalent is just `start()`; there are no bytes, no decoder
/// and no buffering state.
pub struct TestTonePlayer {
    oscillator: Mutex<Oscillator>,
    playing: AtomicBool,
    peak_left: AtomicU32,
    peak_right: AtomicU32,
}

impl TestTonePlayer {
    pub fn new() -> Self {
        Self::with_tone(DEFAULT_TONE_HZ, DEFAULT_TONE_AMPLITUDE)
    }

    pub fn with_tone(frequency_hz: f32, amplitude: f32) -> Self {
        Self {
            oscillator: Mutex::new(Oscillator::new(
                frequency_hz,
                amplitude,
                REFERENCE_SAMPLE_RATE,
            )),
            playing: AtomicBool::new(false),
            peak_left: AtomicU32::new(0),
            peak_right: AtomicU32::new(0),
        }
    }

    pub fn start(&self) {
        self.playing.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn peak_levels(&self) -> [f32; 2] {
        [
            f32::from_bits(self.peak_left.load(Ordering::Relaxed)),
            f32::from_bits(self.peak_right.load(Ordering::Relaxed)),
        ]
    }
}

impl Default for TestTonePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for TestTonePlayer {
    fn render(&self, out: &mut FrameBuffer) {
        if self.playing.load(Ordering::Relaxed) {
            self.oscillator.lock().render(out);
        }
        // Peaks come from the mixed output, tone or not.
        let peaks = out.peaks();
        self.peak_left.store(peaks[0].to_bits(), Ordering::Relaxed);
        self.peak_right.store(peaks[1].to_bits(), Ordering::Relaxed);
    }
}
