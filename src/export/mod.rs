//! Export module for saving grids to disk.
//!
//! Supports 16-bit PNG for quick inspection and RAW formats for game engine
//! imports. Both work on any `Grid`, so water maps export the same way as
//! heightmaps.

mod png;
mod raw;

pub use png::{export_grid_png, PngExportError, PngExportOptions};
pub use raw::{export_grid_raw, expected_file_size, RawExportError, RawExportOptions, RawFormat};
