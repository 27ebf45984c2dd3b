//! RAW format export for game engine compatibility.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::terrain::Grid;

/// Errors that can occur during RAW export.
#[derive(Error, Debug)]
pub enum RawExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f32, f32),
}

/// RAW export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    /// 16-bit unsigned integer, little-endian (Unity default).
    #[default]
    R16LittleEndian,
    /// 16-bit unsigned integer, big-endian.
    R16BigEndian,
    /// 32-bit float, little-endian (high precision).
    R32Float,
}

/// Options for RAW export.
#[derive(Debug, Clone)]
pub struct RawExportOptions {
    pub format: RawFormat,
    /// Value written as 0 (R16 only).
    pub min_height: f32,
    /// Value written as 65535 (R16 only).
    pub max_height: f32,
}

impl Default for RawExportOptions {
    fn default() -> Self {
        Self {
            format: RawFormat::R16LittleEndian,
            min_height: 0.0,
            max_height: 1.0,
        }
    }
}

/// Writes `grid` row by row with no header.
///
/// R16 formats map `[min_height, max_height]` onto `0..=65535`, clamping values outside
/// the range. R32Float writes the raw values.
pub fn export_grid_raw(
    grid: &Grid,
    path: &Path,
    options: &RawExportOptions,
) -> Result<(), RawExportError> {
    let (min_height, max_height) = (options.min_height, options.max_height);
    if options.format != RawFormat::R32Float && min_height >= max_height {
        return Err(RawExportError::InvalidHeightRange(min_height, max_height));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let range = max_height - min_height;
    let to_u16 = |h: f32| (((h - min_height) / range).clamp(0.0, 1.0) * 65535.0) as u16;

    match options.format {
        RawFormat::R16LittleEndian => {
            for &h in grid.as_slice() {
                writer.write_all(&to_u16(h).to_le_bytes())?;
            }
        }
        RawFormat::R16BigEndian => {
            for &h in grid.as_slice() {
                writer.write_all(&to_u16(h).to_be_bytes())?;
            }
        }
        RawFormat::R32Float => {
            for &h in grid.as_slice() {
                writer.write_all(&h.to_le_bytes())?;
            }
        }
    }

    writer.flush()?;
    log::debug!("wrote {:?} raw grid to {}", options.format, path.display());
    Ok(())
}

/// Returns the expected file size for a RAW export.
pub fn expected_file_size(width: usize, height: usize, format: RawFormat) -> u64 {
    let pixels = (width as u64) * (height as u64);
    match format {
        RawFormat::R16LittleEndian | RawFormat::R16BigEndian => pixels * 2,
        RawFormat::R32Float => pixels * 4,
    }
}
