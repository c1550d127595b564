//! Audio output through cpal
//!
//! [`CpalContext`] owns the output stream. The render [`Graph`] lives inside
//! the stream callback; node handles reach it through a lock-free command ring
//! so the callback never waits on the UI thread. The only lock is on the
//! producer side, shared between the handles of this context.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};

use super::buffer::AudioBuffer;
use super::context::{AudioContext, AudioNode, BufferSourceNode, GainNode, NodeId, Target};
use super::decode::decode_bytes;
use super::graph::{Graph, GraphCommand};
use crate::error::{DecodeError, DeviceError, GraphError};

/// Pending graph commands between two callbacks
const COMMAND_QUEUE_SIZE: usize = 1024;

type CommandProducer = Arc<Mutex<ringbuf::HeapProd<GraphCommand>>>;

fn send(commands: &CommandProducer, command: GraphCommand) -> Result<(), GraphError> {
    commands
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .try_push(command)
        .map_err(|_| GraphError::QueueFull)
}

/// Audio context backed by the default cpal output device
pub struct CpalContext {
    stream: cpal::Stream,
    commands: CommandProducer,
    /// Frames rendered while running
    clock: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
    next_id: AtomicU64,
}

impl CpalContext {
    /// Open the default output device. The context starts suspended.
    pub fn new() -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceError::NoOutputDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| DeviceError::Config(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();
        log::info!(
            "Output device: {} ({} ch @ {} Hz, {:?})",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            channels,
            sample_rate,
            config.sample_format()
        );

        let rb = HeapRb::<GraphCommand>::new(COMMAND_QUEUE_SIZE);
        let (prod, cons) = rb.split();

        let clock = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(false));
        let graph = Graph::new(sample_rate, Arc::clone(&clock));

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(
                &device,
                &config.into(),
                graph,
                cons,
                Arc::clone(&running),
            )?,
            cpal::SampleFormat::I16 => build_stream::<i16>(
                &device,
                &config.into(),
                graph,
                cons,
                Arc::clone(&running),
            )?,
            cpal::SampleFormat::U16 => build_stream::<u16>(
                &device,
                &config.into(),
                graph,
                cons,
                Arc::clone(&running),
            )?,
            format => return Err(DeviceError::UnsupportedFormat(format!("{:?}", format))),
        };

        Ok(Self {
            stream,
            commands: Arc::new(Mutex::new(prod)),
            clock,
            running,
            sample_rate,
            channels,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn next_id(&self) -> NodeId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut graph: Graph,
    mut commands: ringbuf::HeapCons<GraphCommand>,
    running: Arc<AtomicBool>,
) -> Result<cpal::Stream, DeviceError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                while let Some(command) = commands.try_pop() {
                    graph.apply(command);
                }

                // Suspended: silence, and the clock stands still
                if !running.load(Ordering::Relaxed) {
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0_f32);
                    }
                    return;
                }

                scratch.resize(data.len(), 0.0);
                graph.render(&mut scratch, channels);
                for (out, &value) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(value.clamp(-1.0, 1.0));
                }
            },
            |err| log::error!("Audio output error: {}", err),
            None,
        )
        .map_err(|e| DeviceError::Build(e.to_string()))
}

impl AudioContext for CpalContext {
    type Gain = CpalGain;
    type Source = CpalBufferSource;

    async fn decode_audio_data(&self, data: Vec<u8>) -> Result<AudioBuffer, DecodeError> {
        tokio::task::spawn_blocking(move || decode_bytes(data))
            .await
            .map_err(|e| DecodeError::Worker(e.to_string()))?
    }

    fn create_gain(&self) -> Result<CpalGain, GraphError> {
        let id = self.next_id();
        let gain = Arc::new(AtomicU32::new(1.0_f32.to_bits()));
        send(
            &self.commands,
            GraphCommand::AddGain {
                id,
                gain: Arc::clone(&gain),
            },
        )?;
        Ok(CpalGain {
            id,
            gain,
            commands: Arc::clone(&self.commands),
        })
    }

    fn create_buffer_source(&self, buffer: Arc<AudioBuffer>) -> Result<CpalBufferSource, GraphError> {
        let id = self.next_id();
        send(&self.commands, GraphCommand::AddSource { id, buffer })?;
        Ok(CpalBufferSource {
            id,
            started: false,
            stopped: false,
            commands: Arc::clone(&self.commands),
        })
    }

    async fn resume(&self) -> Result<(), DeviceError> {
        self.stream
            .play()
            .map_err(|e| DeviceError::Play(e.to_string()))?;
        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn suspend(&self) -> Result<(), DeviceError> {
        self.running.store(false, Ordering::Relaxed);
        // Some hosts can't pause a stream; the callback already outputs
        // silence with a frozen clock, so that is not fatal
        if let Err(e) = self.stream.pause() {
            log::warn!("{}", DeviceError::Pause(e.to_string()));
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }
}

/// Gain node handle. The value is shared with the callback atomically.
pub struct CpalGain {
    id: NodeId,
    gain: Arc<AtomicU32>,
    commands: CommandProducer,
}

impl AudioNode for CpalGain {
    fn id(&self) -> NodeId {
        self.id
    }

    fn connect(&self, target: Target) -> Result<(), GraphError> {
        send(&self.commands, GraphCommand::Connect { from: self.id, to: target })
    }

    fn disconnect(&self) -> Result<(), GraphError> {
        send(&self.commands, GraphCommand::Disconnect { id: self.id })
    }
}

impl GainNode for CpalGain {
    fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    fn set_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }
}

impl Drop for CpalGain {
    fn drop(&mut self) {
        let _ = send(&self.commands, GraphCommand::Remove { id: self.id });
    }
}

/// Buffer source node handle
pub struct CpalBufferSource {
    id: NodeId,
    started: bool,
    stopped: bool,
    commands: CommandProducer,
}

impl AudioNode for CpalBufferSource {
    fn id(&self) -> NodeId {
        self.id
    }

    fn connect(&self, target: Target) -> Result<(), GraphError> {
        send(&self.commands, GraphCommand::Connect { from: self.id, to: target })
    }

    fn disconnect(&self) -> Result<(), GraphError> {
        send(&self.commands, GraphCommand::Disconnect { id: self.id })
    }
}

impl BufferSourceNode for CpalBufferSource {
    fn start(&mut self, offset: f64) -> Result<(), GraphError> {
        if self.started {
            return Err(GraphError::AlreadyStarted);
        }
        send(&self.commands, GraphCommand::Start { id: self.id, offset })?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), GraphError> {
        if !self.started {
            return Err(GraphError::NotStarted);
        }
        if self.stopped {
            return Ok(());
        }
        send(&self.commands, GraphCommand::Stop { id: self.id })?;
        self.stopped = true;
        Ok(())
    }
}

impl Drop for CpalBufferSource {
    fn drop(&mut self) {
        let _ = send(&self.commands, GraphCommand::Remove { id: self.id });
    }
}
