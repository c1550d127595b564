//! In-memory `AudioContext` for tests
//!
//! Records every graph operation and keeps a manual clock that only moves
//! while the context is running, like a real device.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use super::buffer::AudioBuffer;
use super::context::{AudioContext, AudioNode, BufferSourceNode, GainNode, NodeId, Target};
use super::decode::decode_bytes;
use crate::error::{DecodeError, DeviceError, GraphError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    CreateGain(NodeId),
    CreateSource(NodeId),
    Connect(NodeId, Target),
    Disconnect(NodeId),
    SetGain(NodeId, f32),
    Start(NodeId, f64),
    Stop(NodeId),
    Resume,
    Suspend,
}

#[derive(Default)]
struct State {
    clock: f64,
    running: bool,
    next_id: NodeId,
    events: Vec<Event>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeContext {
    state: Rc<RefCell<State>>,
}

impl FakeContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Move the device clock forward; a suspended device does not tick
    pub(crate) fn advance(&self, seconds: f64) {
        let mut state = self.state.borrow_mut();
        if state.running {
            state.clock += seconds;
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub(crate) fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    fn record(&self, event: Event) {
        self.state.borrow_mut().events.push(event);
    }

    fn next_id(&self) -> NodeId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.next_id
    }
}

pub(crate) struct FakeGain {
    id: NodeId,
    gain: Cell<f32>,
    context: FakeContext,
}

impl AudioNode for FakeGain {
    fn id(&self) -> NodeId {
        self.id
    }

    fn connect(&self, target: Target) -> Result<(), GraphError> {
        self.context.record(Event::Connect(self.id, target));
        Ok(())
    }

    fn disconnect(&self) -> Result<(), GraphError> {
        self.context.record(Event::Disconnect(self.id));
        Ok(())
    }
}

impl GainNode for FakeGain {
    fn gain(&self) -> f32 {
        self.gain.get()
    }

    fn set_gain(&self, gain: f32) {
        self.gain.set(gain);
        self.context.record(Event::SetGain(self.id, gain));
    }
}

pub(crate) struct FakeSource {
    id: NodeId,
    started: bool,
    context: FakeContext,
}

impl AudioNode for FakeSource {
    fn id(&self) -> NodeId {
        self.id
    }

    fn connect(&self, target: Target) -> Result<(), GraphError> {
        self.context.record(Event::Connect(self.id, target));
        Ok(())
    }

    fn disconnect(&self) -> Result<(), GraphError> {
        self.context.record(Event::Disconnect(self.id));
        Ok(())
    }
}

impl BufferSourceNode for FakeSource {
    fn start(&mut self, offset: f64) -> Result<(), GraphError> {
        if self.started {
            return Err(GraphError::AlreadyStarted);
        }
        self.started = true;
        self.context.record(Event::Start(self.id, offset));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), GraphError> {
        if !self.started {
            return Err(GraphError::NotStarted);
        }
        self.context.record(Event::Stop(self.id));
        Ok(())
    }
}

impl AudioContext for FakeContext {
    type Gain = FakeGain;
    type Source = FakeSource;

    async fn decode_audio_data(&self, data: Vec<u8>) -> Result<AudioBuffer, DecodeError> {
        decode_bytes(data)
    }

    fn create_gain(&self) -> Result<FakeGain, GraphError> {
        let id = self.next_id();
        self.record(Event::CreateGain(id));
        Ok(FakeGain {
            id,
            gain: Cell::new(1.0),
            context: self.clone(),
        })
    }

    fn create_buffer_source(&self, _buffer: Arc<AudioBuffer>) -> Result<FakeSource, GraphError> {
        let id = self.next_id();
        self.record(Event::CreateSource(id));
        Ok(FakeSource {
            id,
            started: false,
            context: self.clone(),
        })
    }

    async fn resume(&self) -> Result<(), DeviceError> {
        self.state.borrow_mut().running = true;
        self.record(Event::Resume);
        Ok(())
    }

    async fn suspend(&self) -> Result<(), DeviceError> {
        self.state.borrow_mut().running = false;
        self.record(Event::Suspend);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().clock
    }
}
