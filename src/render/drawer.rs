//! Waveform renderer collaborator
//!
//! The driver hands the decoded buffer and a mount point to a
//! [`WaveformRenderer`] and later asks it to draw. [`Drawer`] reduces the
//! buffer to per-column peaks and publishes them as a [`Chart`] into its
//! [`ChartMount`]; whatever UI owns the mount paints from there.

use std::sync::{Arc, Mutex, PoisonError};

use crate::audio::AudioBuffer;

/// Columns computed when no resolution is given
pub const DEFAULT_RESOLUTION: usize = 1000;

/// Something that can visualise a decoded buffer at a mount point
pub trait WaveformRenderer {
    type Mount;

    fn new(buffer: Arc<AudioBuffer>, mount: Self::Mount) -> Self;

    /// Draw the visualisation into the mount
    fn init(&mut self);
}

/// Lowest and highest sample within one column, across all channels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Peak {
    pub min: f32,
    pub max: f32,
}

/// Drawable summary of a buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub peaks: Vec<Peak>,
    pub duration: f64,
    pub channels: usize,
    pub sample_rate: u32,
}

impl Chart {
    pub fn from_buffer(buffer: &AudioBuffer, resolution: usize) -> Self {
        let frames = buffer.length();
        let columns = resolution.max(1).min(frames.max(1));
        let mut peaks = Vec::with_capacity(columns);

        if frames > 0 {
            for column in 0..columns {
                let start = column * frames / columns;
                let end = ((column + 1) * frames / columns).max(start + 1);
                let mut peak = Peak {
                    min: f32::MAX,
                    max: f32::MIN,
                };
                for ch in 0..buffer.number_of_channels() {
                    let Some(data) = buffer.channel_data(ch) else {
                        continue;
                    };
                    for &s in &data[start..end] {
                        peak.min = peak.min.min(s);
                        peak.max = peak.max.max(s);
                    }
                }
                peaks.push(peak);
            }
        }

        Self {
            peaks,
            duration: buffer.duration(),
            channels: buffer.number_of_channels(),
            sample_rate: buffer.sample_rate(),
        }
    }
}

/// Shareable slot a chart is drawn into
#[derive(Clone, Default)]
pub struct ChartMount {
    chart: Arc<Mutex<Option<Chart>>>,
    resolution: Option<usize>,
}

impl ChartMount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount that asks for `columns` peaks instead of the default
    pub fn with_resolution(columns: usize) -> Self {
        Self {
            chart: Arc::default(),
            resolution: Some(columns),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution.unwrap_or(DEFAULT_RESOLUTION)
    }

    /// The chart currently mounted, if anything was drawn
    pub fn chart(&self) -> Option<Chart> {
        self.chart
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_drawn(&self) -> bool {
        self.chart
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn set(&self, chart: Chart) {
        *self.chart.lock().unwrap_or_else(PoisonError::into_inner) = Some(chart);
    }

    pub fn clear(&self) {
        *self.chart.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Peak-chart renderer
pub struct Drawer {
    buffer: Arc<AudioBuffer>,
    mount: ChartMount,
}

impl WaveformRenderer for Drawer {
    type Mount = ChartMount;

    fn new(buffer: Arc<AudioBuffer>, mount: ChartMount) -> Self {
        Self { buffer, mount }
    }

    fn init(&mut self) {
        let chart = Chart::from_buffer(&self.buffer, self.mount.resolution());
        log::debug!("Drawing chart with {} columns", chart.peaks.len());
        self.mount.set(chart);
    }
}
