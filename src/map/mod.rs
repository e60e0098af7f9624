//! Equirectangular map utilities
//!
//! Crops a latitude/longitude window out of an equirectangular world map
//! and resizes it for small displays.

pub mod crop;

pub use crop::{crop_equirectangular, pixel_rect, GeoBounds, PixelRect, DEFAULT_OUTPUT_SIZE};
