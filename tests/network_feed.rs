//! Streams a raw PCM body from a local HTTP fixture server through the full
//! player pipeline.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use roomstream::audio::{
    AudioNode, Codec, FrameBuffer, PlayerConfig, PlayerState, SourceDescriptor, StreamPlayer,
};

fn stereo_pcm_bytes(frames: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frames * 4);
    for i in 0..frames {
        bytes.extend_from_slice(&(i as i16).to_le_bytes());
        bytes.extend_from_slice(&(-(i as i16)).to_le_bytes());
    }
    bytes
}

/// One-shot HTTP server: accepts a single connection and serves `body`.
fn serve_once(body: Vec<u8>, status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();

        // Drain the request head; the content doesn't matter.
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf);

        let head = format!(
            "{}\r\nContent-Length: {}\r\nContent-Type: audio/l16\r\n\r\n",
            status_line,
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
    });

    format!("http://{}/stream", addr)
}

fn wait_for_state(player: &StreamPlayer, state: PlayerState) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while player.state() != state {
        assert!(Instant::now() < deadline, "timed out waiting for {:?}", state);
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn plays_pcm_stream_over_http() {
    let frames = 2000;
    let url = serve_once(stereo_pcm_bytes(frames), "HTTP/1.1 200 OK");

    let config = PlayerConfig {
        buffer_secs: 0.01, // ~441 frames
        codec: Codec::Pcm16 { channels: 2 },
    };
    let player = StreamPlayer::with_source(config, SourceDescriptor::Url(url));

    wait_for_state(&player, PlayerState::Playing);

    // Wait until the whole body has been decoded and buffered.
    let deadline = Instant::now() + Duration::from_secs(10);
    while player.buffered_frames() < frames {
        assert!(Instant::now() < deadline, "body never fully buffered");
        thread::sleep(Duration::from_millis(10));
    }

    let mut bus = FrameBuffer::new(2, 64);
    player.render(&mut bus);
    assert_eq!(bus.sample(0, 1), 1.0 / 32_768.0);
    assert_eq!(bus.sample(1, 1), -1.0 / 32_768.0);
    assert_eq!(player.buffered_frames(), frames - 64);

    player.stop();
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.buffered_frames(), 0);
}

#[test]
fn http_error_status_leaves_player_silent() {
    let url = serve_once(Vec::new(), "HTTP/1.1 404 Not Found");

    let player = StreamPlayer::with_source(
        PlayerConfig {
            buffer_secs: 0.01,
            codec: Codec::Pcm16 { channels: 2 },
        },
        SourceDescriptor::Url(url),
    );

    // Transport failure is logged; the player just never leaves Buffering
    // with anything audible. Give it a moment, then check nothing arrived.
    thread::sleep(Duration::from_millis(300));
    assert_eq!(player.buffered_frames(), 0);

    let mut bus = FrameBuffer::new(2, 64);
    player.render(&mut bus);
    for frame in 0..bus.frame_count() {
        assert_eq!(bus.sample(0, frame), 0.0);
    }
}

#[test]
fn unreachable_host_fails_without_panic() {
    // Nothing listens here; connect fails, the player stays silent.
    let player = StreamPlayer::with_source(
        PlayerConfig {
            buffer_secs: 0.01,
            codec: Codec::Pcm16 { channels: 2 },
        },
        SourceDescriptor::Url("http://127.0.0.1:1/stream".into()),
    );

    thread::sleep(Duration::from_millis(300));
    assert_eq!(player.buffered_frames(), 0);
    assert_eq!(player.state(), PlayerState::Buffering);

    // Teardown after a failed acquisition is clean.
    player.stop();
    assert_eq!(player.state(), PlayerState::Stopped);
}
