pub mod audio;

pub use audio::{
    AudioNode, Codec, FrameBuffer, JitterBuffer, PcmChunk, PlayerConfig, PlayerState,
    SourceDescriptor, StreamPlayer, TestTonePlayer,
};
