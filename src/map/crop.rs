//! Equirectangular map cropping
//!
//! In an equirectangular projection pixel x/y vary linearly with longitude
//! and latitude, so a lat/lon rectangle maps to a pixel rectangle with one
//! multiply per edge. Fractional pixel positions truncate toward zero.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::GenericImageView;
use log::info;
use std::path::Path;
use thiserror::Error;

/// Default output dimensions for cropped maps.
pub const DEFAULT_OUTPUT_SIZE: (u32, u32) = (320, 240);

/// Invalid latitude/longitude bounds.
#[derive(Debug, Error, PartialEq)]
pub enum BoundsError {
    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),
    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),
    #[error("west bound {west} must be less than east bound {east}")]
    LongitudeOrder { west: f64, east: f64 },
    #[error("south bound {south} must be less than north bound {north}")]
    LatitudeOrder { south: f64, north: f64 },
}

/// A lat/lon crop window. West/east are longitudes, north/south latitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub east: f64,
    pub north: f64,
    pub south: f64,
}

impl GeoBounds {
    /// Validate and construct a crop window.
    pub fn new(west: f64, east: f64, north: f64, south: f64) -> Result<Self, BoundsError> {
        for lon in [west, east] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(BoundsError::Longitude(lon));
            }
        }
        for lat in [north, south] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(BoundsError::Latitude(lat));
            }
        }
        if west >= east {
            return Err(BoundsError::LongitudeOrder { west, east });
        }
        if south >= north {
            return Err(BoundsError::LatitudeOrder { south, north });
        }
        Ok(Self {
            west,
            east,
            north,
            south,
        })
    }
}

/// Pixel-space crop rectangle; `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

/// Map the crop window onto an image of the given dimensions.
///
/// Longitude [-180, 180] maps linearly to x in [0, width]; latitude
/// [-90, 90] maps inverted to y in [0, height].
pub fn pixel_rect(bounds: &GeoBounds, img_width: u32, img_height: u32) -> PixelRect {
    let lon_ratio = f64::from(img_width) / 360.0;
    let lat_ratio = f64::from(img_height) / 180.0;

    PixelRect {
        left: ((bounds.west + 180.0) * lon_ratio) as u32,
        right: ((bounds.east + 180.0) * lon_ratio) as u32,
        top: ((90.0 - bounds.north) * lat_ratio) as u32,
        bottom: ((90.0 - bounds.south) * lat_ratio) as u32,
    }
}

/// Crop a lat/lon window out of an equirectangular map and write it,
/// resized to `output_size`, to `output`.
pub fn crop_equirectangular(
    input: &Path,
    bounds: &GeoBounds,
    output: &Path,
    output_size: (u32, u32),
) -> Result<()> {
    let img = image::open(input)
        .with_context(|| format!("Failed to open map image: {}", input.display()))?;
    let (img_width, img_height) = img.dimensions();

    let rect = pixel_rect(bounds, img_width, img_height);
    anyhow::ensure!(
        rect.width() > 0 && rect.height() > 0,
        "crop window {:?} collapses to an empty pixel rect on a {}x{} image",
        bounds,
        img_width,
        img_height
    );

    let cropped = img.crop_imm(rect.left, rect.top, rect.width(), rect.height());
    let resized = cropped.resize_exact(output_size.0, output_size.1, FilterType::CatmullRom);
    resized
        .save(output)
        .with_context(|| format!("Failed to write cropped map: {}", output.display()))?;

    info!(
        "cropped {}x{} region, resized to {}x{}: {}",
        rect.width(),
        rect.height(),
        output_size.0,
        output_size.1,
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_pixel_rect_europe_window() {
        // 0.1 degrees per pixel on a 3600x1800 map.
        let bounds = GeoBounds::new(-12.71, 52.8, 71.7, 34.8).unwrap();
        let rect = pixel_rect(&bounds, 3600, 1800);

        assert_eq!(
            rect,
            PixelRect {
                left: 1672,
                top: 182,
                right: 2327,
                bottom: 552,
            }
        );
    }

    #[test]
    fn test_pixel_rect_full_globe() {
        let bounds = GeoBounds::new(-180.0, 180.0, 90.0, -90.0).unwrap();
        let rect = pixel_rect(&bounds, 360, 180);

        assert_eq!(rect.left, 0);
        assert_eq!(rect.top, 0);
        assert_eq!(rect.right, 360);
        assert_eq!(rect.bottom, 180);
    }

    #[test]
    fn test_bounds_validation() {
        assert_eq!(
            GeoBounds::new(-200.0, 0.0, 10.0, 0.0),
            Err(BoundsError::Longitude(-200.0))
        );
        assert_eq!(
            GeoBounds::new(0.0, 10.0, 95.0, 0.0),
            Err(BoundsError::Latitude(95.0))
        );
        assert_eq!(
            GeoBounds::new(10.0, -10.0, 10.0, 0.0),
            Err(BoundsError::LongitudeOrder {
                west: 10.0,
                east: -10.0
            })
        );
        assert_eq!(
            GeoBounds::new(-10.0, 10.0, 0.0, 10.0),
            Err(BoundsError::LatitudeOrder {
                south: 10.0,
                north: 0.0
            })
        );
    }

    #[test]
    fn test_crop_writes_resized_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("map.png");
        let output = dir.path().join("crop.png");

        RgbImage::from_fn(360, 180, |x, y| image::Rgb([x as u8, y as u8, 0]))
            .save(&input)
            .unwrap();

        let bounds = GeoBounds::new(-12.71, 52.8, 71.7, 34.8).unwrap();
        crop_equirectangular(&input, &bounds, &output, (64, 48)).unwrap();

        let result = image::open(&output).unwrap();
        assert_eq!(result.dimensions(), (64, 48));
    }

    #[test]
    fn test_crop_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bounds = GeoBounds::new(-10.0, 10.0, 10.0, -10.0).unwrap();
        let result = crop_equirectangular(
            &dir.path().join("missing.png"),
            &bounds,
            &dir.path().join("out.png"),
            DEFAULT_OUTPUT_SIZE,
        );
        assert!(result.is_err());
    }
}
