//! Render module - waveform renderer collaborator and its egui view

mod drawer;
mod waveform;

pub use drawer::{Chart, ChartMount, Drawer, Peak, WaveformRenderer, DEFAULT_RESOLUTION};
pub use waveform::{WaveformSettings, WaveformView};
