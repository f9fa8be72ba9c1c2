//! Output device wiring.
//!
//! Builds a cpal output stream whose data callback drives one `AudioNode`
//! per period: silence the mix bus, render into it, write interleaved to the
//! device. The callback allocates nothing in steady state and holds no lock
//! beyond the node's own bounded render section.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use std::sync::Arc;

use super::buffer::FrameBuffer;
use super::{AudioNode, REFERENCE_SAMPLE_RATE};

/// Open the default output device and start rendering `node` into it.
///
/// The returned stream must be kept alive for playback to continue; dropping
/// it stops the device callback.
pub fn start_output(node: Arc<dyn AudioNode>, channels: usize) -> Result<cpal::Stream, String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or("No output device available")?;

    let config = StreamConfig {
        channels: channels as u16,
        sample_rate: SampleRate(REFERENCE_SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut bus = FrameBuffer::new(channels, 0);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                // Period size only changes on device reconfiguration.
                if bus.frame_count() != frames {
                    bus = FrameBuffer::new(channels, frames);
                }
                bus.silence();
                node.render(&mut bus);
                bus.write_interleaved(data);
            },
            move |err| {
                log::error!("Stream error: {}", err);
            },
            None,
        )
        .map_err(|e| format!("Failed to build output stream: {}", e))?;

    stream
        .play()
        .map_err(|e| format!("Failed to start stream: {}", e))?;

    Ok(stream)
}
