//! Play a stream URL or a local file through the default output device.
//! With no argument, plays the diagnostic test tone.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use roomstream::audio::output;
use roomstream::{AudioNode, PlayerConfig, SourceDescriptor, StreamPlayer, TestTonePlayer};

fn main() {
    env_logger::init();

    let arg = std::env::args().nth(1);

    let node: Arc<dyn AudioNode> = match arg {
        Some(target) => {
            let descriptor = if target.starts_with("http://") || target.starts_with("https://") {
                SourceDescriptor::Url(target)
            } else {
                SourceDescriptor::File(PathBuf::from(target))
            };
            Arc::new(StreamPlayer::with_source(PlayerConfig::default(), descriptor))
        }
        None => {
            let tone = TestTonePlayer::new();
            tone.start();
            Arc::new(tone)
        }
    };

    let _stream = match output::start_output(node.clone(), 2) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    // Keep rendering until interrupted.
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
