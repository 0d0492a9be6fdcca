pub(crate) mod config;
mod dashboard;

use std::{
    path::PathBuf,
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
    time::Instant,
};

use config::AppConfig;
use egui::{Color32, Visuals, style::Widgets};
use log::error;

use crate::PitwallError;
use crate::replay::SyncEngine;
use crate::session::{self, SessionData, SessionPreset};
use crate::writer;

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(10, 10, 12);
pub(crate) const PALETTE_GRAPHITE: Color32 = Color32::from_rgb(38, 40, 46);
pub(crate) const PALETTE_RED: Color32 = Color32::from_rgb(225, 6, 0);
pub(crate) const PALETTE_SILVER: Color32 = Color32::from_rgb(201, 203, 207);

/// Where the replay session is loaded from. Cloned into the background load
/// thread on every (re)load.
#[derive(Clone)]
pub enum LoadSource {
    Api {
        preset: SessionPreset,
        output: Option<PathBuf>,
    },
    Archive {
        path: PathBuf,
    },
}

#[derive(Clone)]
enum UiState {
    Loading,
    Error { message: String },
    Display,
}

/// The replay dashboard application.
///
/// Session loading happens on a background thread; the UI keeps painting and
/// drains the result channel in `update`. Once a session lands, the frame
/// loop ticks the engine and renders its snapshot. Selecting another driver
/// tears the engine down and reloads, resuming at the current offset.
pub struct ReplayApp {
    source: LoadSource,
    state: UiState,
    engine: Option<SyncEngine>,
    pending_load: Option<Receiver<Result<SessionData, PitwallError>>>,
    resume_offset_s: Option<f64>,
    selected_driver: i32,
    app_config: AppConfig,
}

impl ReplayApp {
    pub fn new(
        source: LoadSource,
        driver_number: i32,
        rate: Option<f64>,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        let default_visuals = Visuals {
            dark_mode: true,
            hyperlink_color: PALETTE_RED,
            faint_bg_color: PALETTE_BLACK,
            extreme_bg_color: PALETTE_GRAPHITE,
            panel_fill: PALETTE_BLACK,
            button_frame: true,
            window_fill: PALETTE_BLACK,
            widgets: Widgets::dark(),
            striped: false,
            ..Default::default()
        };
        cc.egui_ctx.set_visuals(default_visuals);

        let mut app_config = AppConfig::from_local_file().unwrap_or_default();
        if let Some(rate) = rate {
            app_config.playback_rate = rate;
        }

        let mut app = Self {
            source,
            state: UiState::Loading,
            engine: None,
            pending_load: None,
            resume_offset_s: None,
            selected_driver: driver_number,
            app_config,
        };
        app.begin_load(None);
        app
    }

    /// Kick off a session load on a background thread.
    fn begin_load(&mut self, resume_offset_s: Option<f64>) {
        let (load_tx, load_rx) = mpsc::channel();
        let source = self.source.clone();
        let driver_number = self.selected_driver;
        thread::spawn(move || {
            let result = match source {
                LoadSource::Api { preset, output } => {
                    session::fetch_raw(&preset, driver_number).map(|raw| {
                        if let Some(path) = &output {
                            if let Err(e) = writer::write_archive(path, &raw) {
                                error!("Could not archive session: {e}");
                            }
                        }
                        session::assemble(raw)
                    })
                }
                LoadSource::Archive { path } => session::load_archive(&path),
            };
            // a send failure means the app already closed
            let _ = load_tx.send(result);
        });
        self.pending_load = Some(load_rx);
        self.resume_offset_s = resume_offset_s;
        self.engine = None;
        self.state = UiState::Loading;
    }

    fn poll_pending_load(&mut self) {
        let Some(load_rx) = self.pending_load.as_ref() else {
            return;
        };
        let received = match load_rx.try_recv() {
            Ok(received) => received,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                self.state = UiState::Error {
                    message: "Session load thread exited unexpectedly".to_string(),
                };
                self.pending_load = None;
                return;
            }
        };
        self.pending_load = None;

        let resume_offset_s = self.resume_offset_s.take().unwrap_or(0.);
        match received.and_then(|data| SyncEngine::new(data, resume_offset_s)) {
            Ok(mut engine) => {
                engine.set_rate(self.app_config.playback_rate);
                if let Some(driver) = engine.driver() {
                    self.selected_driver = driver.driver_number;
                }
                self.engine = Some(engine);
                self.state = UiState::Display;
            }
            Err(e) => {
                error!("Session load failed: {e}");
                self.state = UiState::Error {
                    message: e.to_string(),
                };
            }
        }
    }

    fn select_driver(&mut self, driver_number: i32) {
        if driver_number == self.selected_driver {
            return;
        }
        // the reload resumes from the position the user was watching
        let resume_offset_s = self
            .engine
            .as_ref()
            .map(|engine| engine.snapshot().offset_s);
        self.selected_driver = driver_number;
        self.begin_load(resume_offset_s);
    }
}

impl eframe::App for ReplayApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(engine) = &self.engine {
            self.app_config.playback_rate = engine.snapshot().rate;
        }
        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_pending_load();

        if let Some(engine) = self.engine.as_mut() {
            engine.tick(Instant::now());
        }

        let cur_state = self.state.clone();
        match cur_state {
            UiState::Loading => self.loading_view(ctx),
            UiState::Error { message } => self.error_view(ctx, &message),
            UiState::Display => self.dashboard(ctx),
        }

        // keep ticking even when no input arrives
        ctx.request_repaint();
    }
}
