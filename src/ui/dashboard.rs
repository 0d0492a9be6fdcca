use egui::{Color32, ComboBox, Direction, Frame, Layout, Margin, RichText, Slider, Stroke, Ui, Vec2, Vec2b};
use egui_plot::{Line, PlotPoints};

use crate::replay::{SPEED_TRACE_CAPACITY, Snapshot};
use crate::session::{TrackBounds, TrackPoint, WeatherSample};

use super::{LoadSource, PALETTE_GRAPHITE, PALETTE_RED, PALETTE_SILVER, ReplayApp};

const RATE_PRESETS: [f64; 4] = [1., 1.35, 2., 4.];
const TRACK_MAP_HEIGHT: f32 = 300.;
const TRACK_MAP_MARGIN: f32 = 16.;
// DRS codes of 10 and above mean the flap is open
const DRS_OPEN_MIN: i32 = 10;

impl ReplayApp {
    pub(crate) fn loading_view(&self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.4);
                ui.spinner();
                ui.label(RichText::new("Fetching session data...").color(Color32::WHITE));
            });
        });
    }

    pub(crate) fn error_view(&self, ctx: &egui::Context, message: &str) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(Layout::centered_and_justified(Direction::TopDown), |ui| {
                ui.heading(RichText::new(message).color(Color32::RED).strong());
            });
        });
    }

    pub(crate) fn dashboard(&mut self, ctx: &egui::Context) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let snapshot = engine.snapshot().clone();
        let driver_picker_enabled = matches!(self.source, LoadSource::Api { .. });
        let selected_driver = self.selected_driver;
        let mut driver_change: Option<i32> = None;

        egui::TopBottomPanel::top("SessionHeader")
            .frame(
                Frame::default()
                    .fill(Color32::TRANSPARENT)
                    .inner_margin(Margin::same(8)),
            )
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(egui::Align::Center), |ui| {
                    let (title, subtitle) = match engine.session() {
                        Some(session) => (
                            format!(
                                "{} {} - {}",
                                session.country_name, session.year, session.session_name
                            ),
                            session.circuit_short_name.clone(),
                        ),
                        None => (
                            engine.preset().label.clone(),
                            engine.preset().subtitle.clone(),
                        ),
                    };
                    ui.label(RichText::new(title).color(Color32::WHITE).strong().size(18.));
                    ui.label(RichText::new(subtitle).color(PALETTE_SILVER));
                    ui.separator();

                    ui.label(RichText::new("Driver: ").color(Color32::WHITE));
                    let mut picked = selected_driver;
                    let selected_label = engine
                        .drivers()
                        .iter()
                        .find(|d| d.driver_number == picked)
                        .map(|d| format!("{} {}", d.driver_number, d.name_acronym))
                        .unwrap_or_else(|| picked.to_string());
                    ui.add_enabled_ui(driver_picker_enabled, |ui| {
                        ComboBox::from_id_salt("driver_picker")
                            .selected_text(selected_label)
                            .show_ui(ui, |ui| {
                                for driver in engine.drivers() {
                                    ui.selectable_value(
                                        &mut picked,
                                        driver.driver_number,
                                        format!(
                                            "{} {} - {}",
                                            driver.driver_number, driver.full_name, driver.team_name
                                        ),
                                    );
                                }
                            });
                    });
                    if picked != selected_driver {
                        driver_change = Some(picked);
                    }

                    ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.checkbox(&mut self.app_config.show_track_map, "Map");
                        ui.checkbox(&mut self.app_config.show_race_control, "Race control");
                    });
                });
            });

        egui::TopBottomPanel::bottom("Transport")
            .frame(
                Frame::default()
                    .fill(Color32::TRANSPARENT)
                    .inner_margin(Margin::same(8)),
            )
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(egui::Align::Center), |ui| {
                    let play_label = if snapshot.is_playing { "⏸" } else { "▶" };
                    if ui.button(play_label).clicked() {
                        engine.toggle_play();
                    }
                    if ui.button("⏮").clicked() {
                        engine.restart();
                    }
                    ui.separator();
                    for rate in RATE_PRESETS {
                        let active = (snapshot.rate - rate).abs() < f64::EPSILON;
                        if ui.selectable_label(active, format!("{rate}x")).clicked() {
                            engine.set_rate(rate);
                        }
                    }
                    ui.separator();
                    ui.label(
                        RichText::new(format!(
                            "{} / {}",
                            format_clock(snapshot.offset_s),
                            format_clock(snapshot.duration_s)
                        ))
                        .color(PALETTE_SILVER),
                    );

                    ui.spacing_mut().slider_width = (ui.available_width() - 16.).max(80.);
                    let mut progress = snapshot.progress;
                    let slider = ui.add(Slider::new(&mut progress, 0.0..=1.0).show_value(false));
                    if slider.changed() {
                        engine.seek(progress);
                    }
                });
            });

        let show_track_map = self.app_config.show_track_map;
        let show_race_control = self.app_config.show_race_control;
        egui::CentralPanel::default()
            .frame(
                Frame::default()
                    .fill(Color32::TRANSPARENT)
                    .inner_margin(Margin::same(8)),
            )
            .show(ctx, |ui| {
                ui.columns(2, |columns| {
                    telemetry_column(&mut columns[0], &snapshot);
                    let status_ui = &mut columns[1];
                    if show_track_map {
                        track_map(
                            status_ui,
                            engine.track_bounds(),
                            engine.track_outline(),
                            &snapshot,
                        );
                    }
                    status_column(status_ui, &snapshot, show_race_control);
                });
            });

        if let Some(driver_number) = driver_change {
            self.select_driver(driver_number);
        }
    }
}

fn telemetry_column(ui: &mut Ui, snapshot: &Snapshot) {
    ui.label(RichText::new("Telemetry").color(PALETTE_SILVER).strong());
    match &snapshot.car {
        Some(car) => {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!("{:.0} km/h", car.speed))
                        .color(Color32::WHITE)
                        .size(28.)
                        .strong(),
                );
                ui.label(
                    RichText::new(format!("Gear {}", gear_label(car.gear))).color(PALETTE_SILVER),
                );
                ui.label(RichText::new(format!("{:.0} rpm", car.rpm)).color(PALETTE_SILVER));
                if car.drs >= DRS_OPEN_MIN {
                    ui.label(RichText::new("DRS").color(PALETTE_RED).strong());
                }
            });
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!("Throttle {:.0}%", car.throttle)).color(Color32::GREEN),
                );
                ui.label(RichText::new(format!("Brake {:.0}%", car.brake)).color(Color32::RED));
            });
        }
        None => {
            ui.label(RichText::new("No car data").color(PALETTE_SILVER));
        }
    }
    ui.add_space(8.);
    speed_plot(ui, snapshot);
}

fn speed_plot(ui: &mut Ui, snapshot: &Snapshot) {
    let mut speed_vec = Vec::<[f64; 2]>::new();
    snapshot.speed_trace.iter().enumerate().all(|p| {
        speed_vec.push([p.0 as f64, *p.1]);
        true
    });
    let speed_points = PlotPoints::new(speed_vec);

    egui_plot::Plot::new("speed_trace")
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .include_x(0.)
        .include_x(SPEED_TRACE_CAPACITY as f64)
        .include_y(0.)
        .include_y(350.)
        .auto_bounds(Vec2b::new(false, false))
        .show_grid(false)
        .show_background(false)
        .height(200.)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new("Speed", speed_points)
                    .color(PALETTE_RED)
                    .fill(0.)
                    .name("Speed"),
            );
        });
}

fn track_map(ui: &mut Ui, bounds: TrackBounds, outline: &[TrackPoint], snapshot: &Snapshot) {
    let size = Vec2::new(ui.available_width(), TRACK_MAP_HEIGHT);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect;

    let scale_x = (rect.width() - 2. * TRACK_MAP_MARGIN) as f64 / bounds.width().max(1.);
    let scale_y = (rect.height() - 2. * TRACK_MAP_MARGIN) as f64 / bounds.height().max(1.);
    let scale = scale_x.min(scale_y);
    let center_x = (bounds.min_x + bounds.max_x) / 2.;
    let center_y = (bounds.min_y + bounds.max_y) / 2.;
    let center = rect.center();
    let project = |point: &TrackPoint| -> egui::Pos2 {
        egui::Pos2::new(
            center.x + ((point.x - center_x) * scale) as f32,
            // screen y grows downward
            center.y - ((point.y - center_y) * scale) as f32,
        )
    };

    let outline_points: Vec<egui::Pos2> = outline.iter().map(project).collect();
    painter.add(egui::Shape::line(
        outline_points,
        Stroke::new(1., PALETTE_GRAPHITE),
    ));

    let trail_points: Vec<egui::Pos2> = snapshot.trail.iter().map(project).collect();
    painter.add(egui::Shape::line(trail_points, Stroke::new(2., PALETTE_RED)));

    if let Some(location) = &snapshot.location {
        let dot = project(&TrackPoint {
            x: location.x,
            y: location.y,
        });
        painter.circle_filled(dot, 4., Color32::WHITE);
    }
}

fn status_column(ui: &mut Ui, snapshot: &Snapshot, show_race_control: bool) {
    ui.label(RichText::new("Race status").color(PALETTE_SILVER).strong());
    egui::Grid::new("race_status")
        .num_columns(2)
        .spacing([12., 4.])
        .show(ui, |ui| {
            status_row(
                ui,
                "Position",
                snapshot.position.as_ref().map(|p| format!("P{}", p.position)),
            );
            status_row(
                ui,
                "Lap",
                snapshot.lap.as_ref().map(|l| l.lap_number.to_string()),
            );
            status_row(
                ui,
                "Last lap",
                snapshot.last_completed_lap_s.map(format_lap_time),
            );
            status_row(ui, "Best lap", snapshot.best_lap_time_s.map(format_lap_time));
            status_row(
                ui,
                "Interval",
                snapshot
                    .interval
                    .as_ref()
                    .and_then(|i| i.interval)
                    .map(|gap| format!("+{gap:.3}s")),
            );
            status_row(
                ui,
                "Tyres",
                snapshot.stint.as_ref().map(|s| match s.tyre_age_at_start {
                    Some(age) => format!("{} (age {age})", s.compound),
                    None => s.compound.clone(),
                }),
            );
            status_row(
                ui,
                "Last pit",
                snapshot.pit.as_ref().map(|p| match p.pit_duration {
                    Some(duration) => format!("lap {} - {duration:.1}s", p.lap_number),
                    None => format!("lap {}", p.lap_number),
                }),
            );
            status_row(
                ui,
                "Weather",
                snapshot.weather.as_ref().map(weather_label),
            );
        });

    if show_race_control {
        if let Some(race_control) = &snapshot.race_control {
            ui.add_space(6.);
            ui.label(
                RichText::new(format!("Race control: {}", race_control.message))
                    .color(PALETTE_SILVER),
            );
        }
    }
    if let Some(radio) = &snapshot.team_radio {
        ui.add_space(6.);
        ui.hyperlink_to("Latest team radio", &radio.recording_url);
    }
}

fn status_row(ui: &mut Ui, name: &str, value: Option<String>) {
    ui.label(RichText::new(name).color(PALETTE_SILVER));
    ui.label(RichText::new(value.unwrap_or_else(|| "-".to_string())).color(Color32::WHITE));
    ui.end_row();
}

fn weather_label(weather: &WeatherSample) -> String {
    let mut parts = Vec::new();
    if let Some(air) = weather.air_temperature {
        parts.push(format!("air {air:.0}°C"));
    }
    if let Some(track) = weather.track_temperature {
        parts.push(format!("track {track:.0}°C"));
    }
    if weather.rainfall.unwrap_or(0.) > 0. {
        parts.push("rain".to_string());
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

fn gear_label(gear: i32) -> String {
    if gear == 0 {
        "N".to_string()
    } else {
        gear.to_string()
    }
}

/// "m:ss" below one hour, "h:mm:ss" above.
fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.) as i64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// "m:ss.mmm", the usual lap time rendering.
fn format_lap_time(seconds: f64) -> String {
    let minutes = (seconds / 60.) as i64;
    let rest = seconds - minutes as f64 * 60.;
    format!("{minutes}:{rest:06.3}")
}
