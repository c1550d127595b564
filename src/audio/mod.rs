//! Audio module - decoding, the host capability interface and the output backend
//!
//! This module provides:
//! - The source blob and the decoded buffer
//! - Decoding via symphonia
//! - The `AudioContext` capability traits
//! - A render graph and its cpal-backed context

mod buffer;
mod context;
mod decode;
mod graph;
mod output;
mod source;

#[cfg(test)]
pub(crate) mod fake;

pub use buffer::AudioBuffer;
pub use context::{AudioContext, AudioNode, BufferSourceNode, GainNode, NodeId, Target};
pub use decode::decode_bytes;
pub use graph::{Graph, GraphCommand};
pub use output::{CpalBufferSource, CpalContext, CpalGain};
pub use source::AudioSource;

#[cfg(test)]
pub(crate) use decode::tests::wav_bytes;
