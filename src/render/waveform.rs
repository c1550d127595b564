//! Waveform chart widget
//!
//! Paints a mounted [`Chart`] with a playhead into an egui `Ui`.

use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};

use super::drawer::Chart;

/// Display settings for the waveform view
#[derive(Clone)]
pub struct WaveformSettings {
    pub color: Color32,
    pub background: Color32,
    pub playhead: Color32,
    pub show_graticule: bool,
    pub height: f32,
}

impl Default for WaveformSettings {
    fn default() -> Self {
        Self {
            color: Color32::from_rgb(80, 160, 80),
            background: Color32::from_gray(30),
            playhead: Color32::WHITE,
            show_graticule: true,
            height: 160.0,
        }
    }
}

#[derive(Default)]
pub struct WaveformView {
    pub settings: WaveformSettings,
}

impl WaveformView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `chart` with the playhead at `position` (0.0 - 1.0)
    pub fn show(&self, ui: &mut egui::Ui, chart: Option<&Chart>, position: f32) -> egui::Response {
        let size = Vec2::new(ui.available_width(), self.settings.height);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let rect = response.rect;

        painter.rect_filled(rect, 4.0, self.settings.background);

        if self.settings.show_graticule {
            self.draw_graticule(&painter, rect);
        }

        let Some(chart) = chart else {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No waveform",
                egui::FontId::proportional(14.0),
                Color32::GRAY,
            );
            return response;
        };

        self.draw_peaks(&painter, rect, chart);

        let playhead_x = rect.left() + position.clamp(0.0, 1.0) * rect.width();
        painter.line_segment(
            [
                Pos2::new(playhead_x, rect.top()),
                Pos2::new(playhead_x, rect.bottom()),
            ],
            Stroke::new(2.0, self.settings.playhead),
        );

        response
    }

    fn draw_graticule(&self, painter: &egui::Painter, rect: Rect) {
        let grid = Stroke::new(0.5, Color32::from_rgba_unmultiplied(60, 80, 60, 100));
        let axis = Stroke::new(1.0, Color32::from_rgba_unmultiplied(80, 100, 80, 150));

        for i in 0..=10 {
            let x = rect.left() + i as f32 / 10.0 * rect.width();
            painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], grid);
        }
        let center_y = rect.center().y;
        painter.line_segment(
            [Pos2::new(rect.left(), center_y), Pos2::new(rect.right(), center_y)],
            axis,
        );
    }

    fn draw_peaks(&self, painter: &egui::Painter, rect: Rect, chart: &Chart) {
        if chart.peaks.is_empty() {
            return;
        }

        let center_y = rect.center().y;
        let half = rect.height() * 0.45;
        let stroke = Stroke::new(1.0, self.settings.color);
        let count = chart.peaks.len() as f32;

        for (i, peak) in chart.peaks.iter().enumerate() {
            let x = rect.left() + (i as f32 + 0.5) / count * rect.width();
            let top = center_y - peak.max.clamp(-1.0, 1.0) * half;
            let bottom = center_y - peak.min.clamp(-1.0, 1.0) * half;
            painter.line_segment([Pos2::new(x, top), Pos2::new(x, bottom.max(top + 1.0))], stroke);
        }
    }
}
