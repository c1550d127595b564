//! Render graph
//!
//! The part of the output backend that runs inside the device callback. Node
//! handles on the control thread never touch it directly; they push
//! [`GraphCommand`]s through a ring buffer and the callback applies them at
//! the start of every block before mixing.
//!
//! The graph is device independent so it can be driven from tests with a
//! plain `Vec<f32>` as the "device".

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use super::buffer::AudioBuffer;
use super::context::{NodeId, Target};

/// Longest gain chain followed when resolving a source's output level.
/// Also guards against connection cycles.
const MAX_CHAIN_DEPTH: usize = 8;

/// Mutation requested by a node handle
#[derive(Debug)]
pub enum GraphCommand {
    AddGain { id: NodeId, gain: Arc<AtomicU32> },
    AddSource { id: NodeId, buffer: Arc<AudioBuffer> },
    Connect { from: NodeId, to: Target },
    Disconnect { id: NodeId },
    Start { id: NodeId, offset: f64 },
    Stop { id: NodeId },
    Remove { id: NodeId },
}

struct GainStage {
    /// f32 bits, written by the control thread
    gain: Arc<AtomicU32>,
    outputs: Vec<Target>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum VoiceState {
    Pending,
    Playing,
    Done,
}

struct Voice {
    buffer: Arc<AudioBuffer>,
    outputs: Vec<Target>,
    state: VoiceState,
    /// Read position in buffer frames
    position: f64,
}

/// Mixer for buffer sources routed through gain stages
pub struct Graph {
    sample_rate: u32,
    /// Frames rendered so far, shared with the control thread as the clock
    clock: Arc<AtomicU64>,
    gains: HashMap<NodeId, GainStage>,
    voices: HashMap<NodeId, Voice>,
    /// Per-block (voice, level) scratch, reused so render doesn't allocate
    levels: Vec<(NodeId, f32)>,
}

impl Graph {
    pub fn new(sample_rate: u32, clock: Arc<AtomicU64>) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            clock,
            gains: HashMap::new(),
            voices: HashMap::new(),
            levels: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds rendered so far
    pub fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    pub fn apply(&mut self, command: GraphCommand) {
        match command {
            GraphCommand::AddGain { id, gain } => {
                self.gains.insert(
                    id,
                    GainStage {
                        gain,
                        outputs: Vec::new(),
                    },
                );
            }
            GraphCommand::AddSource { id, buffer } => {
                self.voices.insert(
                    id,
                    Voice {
                        buffer,
                        outputs: Vec::new(),
                        state: VoiceState::Pending,
                        position: 0.0,
                    },
                );
            }
            GraphCommand::Connect { from, to } => {
                if let Some(outputs) = self.outputs_mut(from) {
                    if !outputs.contains(&to) {
                        outputs.push(to);
                    }
                }
            }
            GraphCommand::Disconnect { id } => {
                if let Some(outputs) = self.outputs_mut(id) {
                    outputs.clear();
                }
            }
            GraphCommand::Start { id, offset } => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    if voice.state == VoiceState::Pending {
                        voice.position = offset.max(0.0) * voice.buffer.sample_rate() as f64;
                        voice.state = VoiceState::Playing;
                    }
                }
            }
            GraphCommand::Stop { id } => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.state = VoiceState::Done;
                }
            }
            GraphCommand::Remove { id } => {
                self.voices.remove(&id);
                self.gains.remove(&id);
            }
        }
    }

    fn outputs_mut(&mut self, id: NodeId) -> Option<&mut Vec<Target>> {
        if let Some(voice) = self.voices.get_mut(&id) {
            return Some(&mut voice.outputs);
        }
        self.gains.get_mut(&id).map(|g| &mut g.outputs)
    }

    /// Total linear level at which a signal entering `target` reaches the output
    fn level(&self, target: Target, depth: usize) -> f32 {
        match target {
            Target::Destination => 1.0,
            Target::Node(_) if depth >= MAX_CHAIN_DEPTH => 0.0,
            Target::Node(id) => match self.gains.get(&id) {
                Some(stage) => {
                    let gain = f32::from_bits(stage.gain.load(Ordering::Relaxed));
                    let downstream: f32 = stage
                        .outputs
                        .iter()
                        .map(|t| self.level(*t, depth + 1))
                        .sum();
                    gain * downstream
                }
                None => 0.0,
            },
        }
    }

    /// Mix one block of interleaved frames into `out` and advance the clock
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        let channels = channels.max(1);
        let frames = out.len() / channels;

        let mut levels = std::mem::take(&mut self.levels);
        levels.clear();
        levels.extend(
            self.voices
                .iter()
                .filter(|(_, v)| v.state == VoiceState::Playing)
                .map(|(id, v)| (*id, v.outputs.iter().map(|t| self.level(*t, 0)).sum())),
        );

        let device_rate = self.sample_rate as f64;
        for &(id, level) in &levels {
            let Some(voice) = self.voices.get_mut(&id) else {
                continue;
            };
            let buffer_channels = voice.buffer.number_of_channels();
            let step = voice.buffer.sample_rate() as f64 / device_rate;

            for frame in out.chunks_mut(channels).take(frames) {
                if voice.position >= voice.buffer.length() as f64 {
                    voice.state = VoiceState::Done;
                    break;
                }
                for (ch, slot) in frame.iter_mut().enumerate() {
                    let source_ch = if buffer_channels == 1 {
                        0
                    } else if ch < buffer_channels {
                        ch
                    } else {
                        continue;
                    };
                    if let Some(sample) = voice.buffer.sample_at(source_ch, voice.position) {
                        *slot += sample * level;
                    }
                }
                voice.position += step;
            }
        }
        self.levels = levels;

        self.clock.fetch_add(frames as u64, Ordering::Relaxed);
    }
}
