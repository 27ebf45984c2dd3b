//! PNG export functionality for heightmaps and water maps.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Luma};
use thiserror::Error;

use crate::terrain::Grid;

/// Errors that can occur during PNG export.
#[derive(Error, Debug)]
pub enum PngExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f32, f32),
}

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Value written as black.
    pub min_height: f32,
    /// Value written as white.
    pub max_height: f32,
    pub compression: CompressionType,
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            max_height: 1.0,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Creates options spanning the grid's own value range.
    ///
    /// A constant grid gets a unit-wide range so the export still succeeds.
    pub fn auto_range(grid: &Grid) -> Self {
        let (min, max) = grid.value_range();
        let max = if max > min { max } else { min + 1.0 };
        Self {
            min_height: min,
            max_height: max,
            ..Default::default()
        }
    }
}

/// Exports `grid` as a 16-bit grayscale PNG, one pixel per cell.
///
/// Rows of the grid become image rows, so the image is `width` pixels wide.
pub fn export_grid_png(
    grid: &Grid,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    let min = options.min_height;
    let max = options.max_height;

    if min >= max {
        return Err(PngExportError::InvalidHeightRange(min, max));
    }

    let (width, height) = grid.dimensions();
    let (img_w, img_h) = (width as u32, height as u32);
    let range = max - min;

    let mut img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(img_w, img_h);
    for row in 0..height {
        for col in 0..width {
            let normalized = ((grid.get(row, col) - min) / range).clamp(0.0, 1.0);
            let value = (normalized * 65535.0) as u16;
            img.put_pixel(col as u32, row as u32, Luma([value]));
        }
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);

    // Convert u16 slice to bytes for the encoder
    let byte_slice: &[u8] = bytemuck::cast_slice(img.as_raw());

    encoder.write_image(byte_slice, img_w, img_h, image::ExtendedColorType::L16)?;

    log::debug!("wrote {}x{} png to {}", width, height, path.display());
    Ok(())
}
