//! wavedriver - audio playback driver for a waveform editor
//!
//! Loads a user supplied audio file, decodes it, plays and pauses it with
//! position tracking, adjusts gain, and hands the decoded signal to a
//! waveform renderer.
//!
//! ```no_run
//! # async fn demo() -> Result<(), wavedriver::DriverError> {
//! use wavedriver::{AudioSource, ChartMount, CpalContext, SoundDriver};
//!
//! let context = CpalContext::new()?;
//! let mut driver: SoundDriver<CpalContext> =
//!     SoundDriver::new(AudioSource::from_path("take1.wav"), context);
//! let mount = ChartMount::new();
//!
//! driver.init(Some(mount.clone())).await?;
//! driver.draw_chart();
//! driver.play().await?;
//! driver.change_volume(0.5);
//! driver.pause(false).await?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod driver;
pub mod error;
pub mod render;

pub use audio::{AudioBuffer, AudioContext, AudioSource, CpalContext};
pub use driver::{DriverConfig, Routing, SoundDriver};
pub use error::{DecodeError, DeviceError, DriverError, GraphError};
pub use render::{Chart, ChartMount, Drawer, WaveformRenderer};
