//! Viewer application
//!
//! The egui frame loop doubles as the polling timer: each update runs one
//! session tick, then schedules a repaint at the configured interval.
//! Rendering is a full clear-and-redraw of both plots from the latest
//! completed frame, so a repaint with no new sweep draws the same picture.

use crate::sweep::frame::{peak_sample, SweepFrame};
use crate::sweep::protocol::Sample;
use crate::sweep::session::SweepSession;
use anyhow::Result;
use eframe::egui::{self, Align2, Color32, RichText};
use egui_plot::{
    HLine, Line, LineStyle, MarkerShape, Plot, PlotPoint, PlotPoints, PlotUi, Points, Text, VLine,
};
use std::time::Duration;

const COARSE_TRACE: Color32 = Color32::YELLOW;
const FINE_TRACE: Color32 = Color32::from_rgb(0, 255, 255);
const PEAK_RAW: Color32 = Color32::RED;
const PEAK_SMOOTHED: Color32 = Color32::from_rgb(255, 0, 255);
const AMPLITUDE_LINE: Color32 = Color32::WHITE;

/// Live viewer window driven by a sweep session.
pub struct ViewerApp {
    session: SweepSession,
    tick_interval: Duration,
}

impl ViewerApp {
    pub fn new(session: SweepSession, tick_interval: Duration) -> Self {
        Self {
            session,
            tick_interval,
        }
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        let stats = self.session.stats();
        let peaks = self.session.frame().peaks;

        ui.horizontal(|ui| {
            ui.label(self.session.source_description());
            ui.separator();
            ui.label(format!("sweeps: {}", stats.sweeps_completed));
            ui.separator();
            ui.label(format!("buffered: {}", self.session.buffered_lines()));
            ui.separator();
            if self.session.frame().is_empty() && stats.sweeps_completed == 0 {
                ui.label("waiting for first sweep...");
            } else {
                ui.label(format!(
                    "peaks: coarse {} kHz, fine raw {} kHz, fine SMA {} kHz",
                    peaks.coarse_max_khz, peaks.fine_max_raw_khz, peaks.fine_max_smoothed_khz
                ));
            }
            if stats.malformed_lines > 0 {
                ui.separator();
                ui.colored_label(
                    Color32::LIGHT_RED,
                    format!("malformed: {}", stats.malformed_lines),
                );
            }
        });
    }

    fn coarse_plot(&self, ui: &mut egui::Ui, frame: &SweepFrame, height: f32) {
        ui.heading("Coarse Sweep");
        Plot::new("coarse_sweep")
            .height(height)
            .x_axis_label("kHz")
            .y_axis_label("ADC")
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                if frame.coarse.is_empty() {
                    return;
                }
                plot_ui.line(Line::new(sample_points(&frame.coarse)).color(COARSE_TRACE));
                plot_ui.points(
                    Points::new(sample_points(&frame.coarse))
                        .shape(MarkerShape::Circle)
                        .radius(2.5)
                        .color(COARSE_TRACE),
                );
                let label_y = top_amplitude(&frame.coarse);
                peak_marker(plot_ui, frame.peaks.coarse_max_khz, "Max Raw", PEAK_RAW, label_y);
                amplitude_marker(plot_ui, &frame.coarse);
            });
    }

    fn fine_plot(&self, ui: &mut egui::Ui, frame: &SweepFrame, height: f32) {
        ui.heading("Fine Sweep");
        Plot::new("fine_sweep")
            .height(height)
            .x_axis_label("kHz")
            .y_axis_label("ADC")
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                if frame.fine.is_empty() {
                    return;
                }
                plot_ui.line(Line::new(sample_points(&frame.fine)).color(FINE_TRACE));
                let label_y = top_amplitude(&frame.fine);
                peak_marker(plot_ui, frame.peaks.fine_max_raw_khz, "Raw", PEAK_RAW, label_y);
                peak_marker(
                    plot_ui,
                    frame.peaks.fine_max_smoothed_khz,
                    "SMA",
                    PEAK_SMOOTHED,
                    label_y,
                );
                amplitude_marker(plot_ui, &frame.fine);
            });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.session.tick();

        egui::TopBottomPanel::top("status").show(ctx, |ui| self.status_bar(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            let plot_height = (ui.available_height() / 2.0 - 28.0).max(64.0);
            let frame = self.session.frame().clone();
            self.coarse_plot(ui, &frame, plot_height);
            self.fine_plot(ui, &frame, plot_height);
        });

        ctx.request_repaint_after(self.tick_interval);
    }
}

fn sample_points(samples: &[Sample]) -> PlotPoints {
    samples
        .iter()
        .map(|s| [f64::from(s.freq_khz), f64::from(s.adc)])
        .collect()
}

/// Highest amplitude in the pass; anchors the peak label near the top of
/// the data.
fn top_amplitude(samples: &[Sample]) -> f64 {
    peak_sample(samples).map_or(0.0, |s| f64::from(s.adc))
}

/// Vertical marker at a peak frequency with a colored label.
fn peak_marker(plot_ui: &mut PlotUi, freq_khz: u32, label: &str, color: Color32, label_y: f64) {
    let x = f64::from(freq_khz);
    plot_ui.vline(VLine::new(x).color(color).width(2.0));
    plot_ui.text(
        Text::new(
            PlotPoint::new(x, label_y),
            RichText::new(format!("{}: {} kHz", label, freq_khz)).color(color),
        )
        .anchor(Align2::LEFT_BOTTOM),
    );
}

/// Thin dashed horizontal line at the maximum observed amplitude.
fn amplitude_marker(plot_ui: &mut PlotUi, samples: &[Sample]) {
    if let Some(peak) = peak_sample(samples) {
        plot_ui.hline(
            HLine::new(f64::from(peak.adc))
                .color(AMPLITUDE_LINE)
                .width(1.0)
                .style(LineStyle::dashed_loose()),
        );
    }
}

/// Open the viewer window and run until it is closed.
pub fn run_viewer(session: SweepSession, tick_interval: Duration) -> Result<()> {
    let title = format!("Sweep Scope - {}", session.source_description());
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(ViewerApp::new(session, tick_interval)))),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {}", e))
}
