use roomstream::audio::{AudioNode, FrameBuffer, TestTonePlayer};

#[test]
fn silent_until_started() {
    let tone = TestTonePlayer::new();
    let mut bus = FrameBuffer::new(2, 512);

    tone.render(&mut bus);

    for frame in 0..bus.frame_count() {
        assert_eq!(bus.sample(0, frame), 0.0);
        assert_eq!(bus.sample(1, frame), 0.0);
    }
    assert_eq!(tone.peak_levels(), [0.0, 0.0]);
}

#[test]
fn renders_tone_on_all_channels_after_start() {
    let tone = TestTonePlayer::with_tone(440.0, 0.25);
    tone.start();
    assert!(tone.is_playing());

    let mut bus = FrameBuffer::new(2, 2048);
    bus.silence();
    tone.render(&mut bus);

    // A 440 Hz quarter-amplitude sine over ~46ms: clearly non-silent, bounded
    // by the amplitude, identical on both channels.
    let mut max = 0.0f32;
    for frame in 0..bus.frame_count() {
        let left = bus.sample(0, frame);
        assert_eq!(left, bus.sample(1, frame));
        assert!(left.abs() <= 0.25 + 1e-6);
        max = max.max(left.abs());
    }
    assert!(max > 0.2);

    let peaks = tone.peak_levels();
    assert!(peaks[0] > 0.2 && peaks[1] > 0.2);
}

#[test]
fn mixes_additively_into_existing_contents() {
    let tone = TestTonePlayer::with_tone(440.0, 0.25);
    tone.start();

    let mut bus = FrameBuffer::new(2, 256);
    for frame in 0..bus.frame_count() {
        bus.set(0, frame, 1.0);
        bus.set(1, frame, 1.0);
    }
    tone.render(&mut bus);

    // The tone sums onto the bias instead of overwriting it.
    for frame in 0..bus.frame_count() {
        assert!(bus.sample(0, frame) >= 1.0 - 0.25 - 1e-6);
        assert!(bus.sample(0, frame) <= 1.0 + 0.25 + 1e-6);
    }
}

#[test]
fn stop_silences_but_keeps_metering() {
    let tone = TestTonePlayer::new();
    tone.start();

    let mut bus = FrameBuffer::new(2, 1024);
    tone.render(&mut bus);

    tone.stop();
    assert!(!tone.is_playing());

    bus.silence();
    tone.render(&mut bus);
    for frame in 0..bus.frame_count() {
        assert_eq!(bus.sample(0, frame), 0.0);
    }
    // Peaks track the (now silent) output.
    assert_eq!(tone.peak_levels(), [0.0, 0.0]);
}
