//! Binary PPM (P6) image encoding.
//!
//! The core hands the CLI `[0, 1]` float tensors; this is the only place
//! pixels get quantized and touch the filesystem.

use crate::error::{ImaginarError, Result};
use crate::Image;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write an image as a binary PPM file.
///
/// Pixels are clamped into `[0, 1]` and quantized to 8 bits per channel.
pub fn write_ppm(path: &Path, image: &Image) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| ImaginarError::io(format!("creating {}", path.display()), e))?;
    let mut out = BufWriter::new(file);
    let size = image.size();

    let io_ctx = |e| ImaginarError::io(format!("writing {}", path.display()), e);
    write!(out, "P6\n{size} {size}\n255\n").map_err(io_ctx)?;

    let mut row = Vec::with_capacity(size * 3);
    for y in 0..size {
        row.clear();
        for x in 0..size {
            for c in 0..3 {
                let v = image.data()[[c, y, x]].clamp(0.0, 1.0);
                row.push((v * 255.0).round() as u8);
            }
        }
        out.write_all(&row).map_err(io_ctx)?;
    }
    out.flush().map_err(io_ctx)
}
