//! Host audio capabilities
//!
//! The driver only talks to the output device through these traits: decode,
//! node creation, resume/suspend and the device clock. [`CpalContext`] is the
//! real implementation; tests substitute a fake with a manual clock.
//!
//! [`CpalContext`]: super::CpalContext

use std::sync::Arc;

use super::buffer::AudioBuffer;
use crate::error::{DecodeError, DeviceError, GraphError};

/// Identifier of a node, unique within one context
pub type NodeId = u64;

/// Where a node's output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The output device
    Destination,
    /// Another node of the same context
    Node(NodeId),
}

impl Target {
    pub fn node(node: &impl AudioNode) -> Self {
        Self::Node(node.id())
    }
}

/// Common node behaviour
pub trait AudioNode {
    fn id(&self) -> NodeId;

    /// Route this node's output into `target`. A node may feed several targets.
    fn connect(&self, target: Target) -> Result<(), GraphError>;

    /// Drop every outgoing connection
    fn disconnect(&self) -> Result<(), GraphError>;
}

/// Volume stage
pub trait GainNode: AudioNode {
    fn gain(&self) -> f32;
    fn set_gain(&self, gain: f32);
}

/// Single-use playable handle over a decoded buffer
pub trait BufferSourceNode: AudioNode {
    /// Start now, `offset` seconds into the buffer. Only allowed once.
    fn start(&mut self, offset: f64) -> Result<(), GraphError>;

    /// Stop now. The node can not be started again afterwards.
    fn stop(&mut self) -> Result<(), GraphError>;
}

/// The output device plus its decoder and node factory
#[allow(async_fn_in_trait)]
pub trait AudioContext {
    type Gain: GainNode;
    type Source: BufferSourceNode;

    async fn decode_audio_data(&self, data: Vec<u8>) -> Result<AudioBuffer, DecodeError>;

    fn create_gain(&self) -> Result<Self::Gain, GraphError>;

    fn create_buffer_source(&self, buffer: Arc<AudioBuffer>) -> Result<Self::Source, GraphError>;

    async fn resume(&self) -> Result<(), DeviceError>;

    async fn suspend(&self) -> Result<(), DeviceError>;

    /// Device clock in seconds. Only advances while the context is running.
    fn current_time(&self) -> f64;

    fn destination(&self) -> Target {
        Target::Destination
    }
}
