//! Error kinds for the driver and its collaborators

use thiserror::Error;

/// Errors raised by [`SoundDriver`](crate::SoundDriver) operations
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Parent element not found")]
    MissingMount,

    #[error("Can not read audio file: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("Failed to decode audio data: {0}")]
    Decode(#[from] DecodeError),

    #[error("Play error. Audio buffer does not exist, call init before play")]
    NoBuffer,

    #[error("Pause error. Buffer source does not exist, call play before pause")]
    NoBufferSource,

    #[error("Audio graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Audio device error: {0}")]
    Device(#[from] DeviceError),
}

impl DriverError {
    /// Short message suitable for showing to the user.
    ///
    /// Presentation is left to the caller; the driver never touches the UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingMount => "Nowhere to draw the waveform".to_string(),
            Self::Unreadable(_) => {
                "Can not read audio file. Check that it exists and is readable".to_string()
            }
            Self::Decode(_) => "This file could not be decoded as audio".to_string(),
            Self::NoBuffer => "Load a file before playing".to_string(),
            Self::NoBufferSource => "Nothing is playing".to_string(),
            Self::Graph(e) => format!("Playback failed: {}", e),
            Self::Device(e) => format!("Audio output unavailable: {}", e),
        }
    }
}

/// Errors that can occur while turning raw bytes into an [`AudioBuffer`](crate::AudioBuffer)
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to probe audio format: {0}")]
    Probe(String),

    #[error("No audio tracks found")]
    NoTracks,

    #[error("Unsupported codec")]
    UnsupportedCodec,

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Stream contained no audio frames")]
    Empty,

    #[error("Invalid buffer: {0}")]
    InvalidBuffer(&'static str),

    #[error("Decode worker failed: {0}")]
    Worker(String),
}

/// Errors from node operations on the audio graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Buffer source node was already started")]
    AlreadyStarted,

    #[error("Buffer source node was never started")]
    NotStarted,

    #[error("Graph command queue is full")]
    QueueFull,
}

/// Errors from the output device
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Failed to get output config: {0}")]
    Config(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to build output stream: {0}")]
    Build(String),

    #[error("Failed to start output stream: {0}")]
    Play(String),

    #[error("Failed to pause output stream: {0}")]
    Pause(String),
}
