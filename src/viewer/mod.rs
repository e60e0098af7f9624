//! Live sweep viewer
//!
//! eframe/egui application that renders the coarse and fine passes as two
//! stacked plots with peak markers.

pub mod app;

pub use app::{run_viewer, ViewerApp};
