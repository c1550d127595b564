//! wavedriver - waveform editor shell
//!
//! Small egui front end over [`SoundDriver`]: open a file, see its waveform,
//! play/pause/stop it and set the volume.

use eframe::egui;
use std::time::Duration;

mod settings;

use settings::AppSettings;
use wavedriver::render::WaveformView;
use wavedriver::{AudioSource, ChartMount, CpalContext, DriverError, Routing, SoundDriver};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    log::info!("Starting wavedriver");

    // Driver calls are awaited on the UI thread; decoding runs on the
    // runtime's blocking pool
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 320.0])
            .with_title("wavedriver"),
        ..Default::default()
    };

    eframe::run_native(
        "wavedriver",
        options,
        Box::new(move |cc| Ok(Box::new(EditorApp::new(cc, runtime)))),
    )?;
    Ok(())
}

struct EditorApp {
    runtime: tokio::runtime::Runtime,
    driver: Option<SoundDriver<CpalContext>>,
    mount: ChartMount,
    view: WaveformView,
    settings: AppSettings,
    status: String,
}

impl EditorApp {
    fn new(_cc: &eframe::CreationContext<'_>, runtime: tokio::runtime::Runtime) -> Self {
        let settings = AppSettings::load();
        Self {
            runtime,
            driver: None,
            mount: ChartMount::with_resolution(settings.chart_resolution),
            view: WaveformView::new(),
            settings,
            status: "No file loaded".to_string(),
        }
    }

    fn open(&mut self, source: AudioSource) {
        // Silence whatever was playing before swapping drivers
        if let Some(mut old) = self.driver.take() {
            if old.is_running() {
                if let Err(e) = self.runtime.block_on(old.pause(true)) {
                    log::warn!("Failed to stop previous file: {}", e);
                }
            }
        }
        self.mount.clear();

        let context = match CpalContext::new() {
            Ok(c) => c,
            Err(e) => {
                self.report(&e.into());
                return;
            }
        };

        let label = source.label();
        let mut driver: SoundDriver<CpalContext> =
            SoundDriver::with_config(source, context, self.settings.driver_config());
        self.mount = ChartMount::with_resolution(self.settings.chart_resolution);

        match self.runtime.block_on(driver.init(Some(self.mount.clone()))) {
            Ok(()) => {
                driver.draw_chart();
                self.status = format!("Loaded: {}", label);
                self.driver = Some(driver);
            }
            Err(e) => self.report(&e),
        }
    }

    fn toggle(&mut self) {
        let Some(driver) = self.driver.as_mut() else {
            return;
        };
        let (result, done) = if driver.is_running() {
            (self.runtime.block_on(driver.pause(false)), "Paused")
        } else {
            let result = self.runtime.block_on(driver.play());
            // The driver ignores volume changes made before its first play
            if result.is_ok() {
                driver.change_volume(self.settings.volume);
            }
            (result, "Playing")
        };
        match result {
            Ok(()) => self.status = done.to_string(),
            Err(e) => self.report(&e),
        }
    }

    fn stop(&mut self) {
        let Some(driver) = self.driver.as_mut() else {
            return;
        };
        match self.runtime.block_on(driver.pause(true)) {
            Ok(()) => self.status = "Stopped".to_string(),
            // Stopping something that never played is fine
            Err(DriverError::NoBufferSource) => {}
            Err(e) => self.report(&e),
        }
    }

    fn report(&mut self, error: &DriverError) {
        log::error!("{}", error);
        self.status = format!("Error: {}", error.user_message());
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.driver.as_ref().is_some_and(|d| d.is_running()) {
            ctx.request_repaint_after(Duration::from_millis(30));
        }

        // Top panel
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("wavedriver");
                ui.separator();

                if ui.button("📂 Open").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter(
                            "Audio",
                            &["wav", "mp3", "flac", "ogg", "m4a", "aac", "aiff"],
                        )
                        .pick_file()
                    {
                        self.open(AudioSource::from_path(path));
                    }
                }

                ui.separator();
                ui.label(&self.status);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.toggle_value(&mut self.settings.show_settings, "⚙ Settings");
                });
            });
        });

        // Bottom panel for transport controls
        egui::TopBottomPanel::bottom("transport_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let loaded = self.driver.is_some();
                let running = self.driver.as_ref().is_some_and(|d| d.is_running());

                let play_text = if running { "⏸" } else { "▶" };
                if ui.add_enabled(loaded, egui::Button::new(play_text)).clicked() {
                    self.toggle();
                }
                if ui.add_enabled(loaded, egui::Button::new("⏹")).clicked() {
                    self.stop();
                }

                ui.separator();

                let (current, total) = self
                    .driver
                    .as_ref()
                    .map(|d| (d.position(), d.duration().unwrap_or(0.0)))
                    .unwrap_or((0.0, 0.0));
                ui.label(format!(
                    "{} / {}",
                    format_duration(current),
                    format_duration(total)
                ));

                ui.separator();

                ui.label("Vol:");
                let mut volume = self.settings.volume;
                let response = ui.add(egui::Slider::new(&mut volume, 0.0..=2.0).show_value(false));
                if response.changed() {
                    if let Some(driver) = self.driver.as_mut() {
                        driver.change_volume(volume);
                    }
                    self.settings.volume = volume;
                }
                if response.drag_stopped() {
                    self.settings.save();
                }
            });
            ui.add_space(4.0);
        });

        // Settings panel
        if self.settings.show_settings {
            egui::SidePanel::right("settings_panel")
                .min_width(200.0)
                .show(ctx, |ui| {
                    ui.heading("Settings");
                    ui.separator();

                    let mut changed = false;

                    ui.collapsing("Playback", |ui| {
                        ui.horizontal(|ui| {
                            ui.label("Routing:");
                            egui::ComboBox::from_id_salt("routing")
                                .selected_text(self.settings.routing.name())
                                .show_ui(ui, |ui| {
                                    for routing in Routing::ALL {
                                        changed |= ui
                                            .selectable_value(
                                                &mut self.settings.routing,
                                                *routing,
                                                routing.name(),
                                            )
                                            .changed();
                                    }
                                });
                        });
                        ui.small("Applies to the next file opened");
                    });

                    ui.separator();

                    ui.collapsing("Chart", |ui| {
                        ui.horizontal(|ui| {
                            ui.label("Columns:");
                            changed |= ui
                                .add(egui::Slider::new(
                                    &mut self.settings.chart_resolution,
                                    100..=4000,
                                ))
                                .drag_stopped();
                        });
                        ui.checkbox(&mut self.view.settings.show_graticule, "Show grid");
                    });

                    if changed {
                        self.settings.save();
                    }
                });
        }

        // Waveform
        egui::CentralPanel::default().show(ctx, |ui| {
            let chart = self.mount.chart();
            let position = match self.driver.as_ref() {
                Some(d) => match d.duration() {
                    Some(total) if total > 0.0 => (d.position() / total) as f32,
                    _ => 0.0,
                },
                None => 0.0,
            };
            self.view.show(ui, chart.as_ref(), position);
        });
    }
}

/// Format seconds as MM:SS
fn format_duration(seconds: f64) -> String {
    let secs = seconds.max(0.0) as u64;
    let mins = secs / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}", mins, secs)
}
