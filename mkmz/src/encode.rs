use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use common::progress::{ProgressFn, ProgressMonitor};
use common::raster::{ColorMode, RasterBuffer};
use png::{BitDepth, ColorType, Encoder};
use thiserror::Error;

use crate::cli::Compression;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("A {width}x{height} image cannot be stored as PNG.")]
    TooLarge { width: usize, height: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Png(#[from] png::EncodingError),
}

/// Writes `buffer` to `path` as a PNG with `metadata` as text chunks,
/// reporting one progress step per row.
pub fn write_png(
    path: &Path,
    buffer: RasterBuffer,
    metadata: &[(String, String)],
    compression: Compression,
    progress: Option<&ProgressFn<'_>>,
) -> Result<(), EncodeError> {
    let too_large = || EncodeError::TooLarge {
        width: buffer.width(),
        height: buffer.height(),
    };
    let width = u32::try_from(buffer.width()).map_err(|_| too_large())?;
    let height = u32::try_from(buffer.height()).map_err(|_| too_large())?;

    let file = File::create(path)?;
    let mut encoder = Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(color_type(buffer.mode()));
    encoder.set_depth(match buffer.depth() {
        1 => BitDepth::One,
        _ => BitDepth::Eight,
    });
    encoder.set_compression(compression.into());
    for (keyword, text) in metadata {
        encoder.add_text_chunk(keyword.clone(), text.clone())?;
    }

    let mut writer = encoder.write_header()?;
    ProgressMonitor::new(progress, u64::from(height)).watch(1, |counters| -> Result<(), EncodeError> {
        let mut stream = writer.stream_writer()?;
        for row in buffer.into_rows() {
            stream.write_all(&row)?;
            counters[0].add(1);
        }
        stream.finish()?;
        Ok(())
    })?;
    writer.finish()?;

    Ok(())
}

fn color_type(mode: ColorMode) -> ColorType {
    match mode {
        ColorMode::Gray => ColorType::Grayscale,
        ColorMode::GrayAlpha => ColorType::GrayscaleAlpha,
        ColorMode::Rgb => ColorType::Rgb,
        ColorMode::Rgba => ColorType::Rgba,
    }
}
