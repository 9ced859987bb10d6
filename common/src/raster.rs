//! Bit-packed pixel rows with one lock per row.
//!
//! Samples are packed into `u64` words, lowest bit first. Depth 1 stores one
//! bit per pixel and is only allowed for grayscale; depth 8 stores one byte
//! per channel. [`RasterBuffer::into_rows`] repacks rows into the byte layout
//! image encoders expect, with depth-1 pixels most significant bit first.

use std::ops::Range;
use std::sync::{Mutex, PoisonError};

use log::debug;
use strum::Display;
use thiserror::Error;

/// Largest image width or height that can be encoded.
pub const MAX_DIMENSION: usize = (1 << 31) - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum ColorMode {
    #[strum(serialize = "gray")]
    Gray,
    #[strum(serialize = "gray+alpha")]
    GrayAlpha,
    #[strum(serialize = "rgb")]
    Rgb,
    #[strum(serialize = "rgba")]
    Rgba,
}

impl ColorMode {
    pub fn channels(self) -> usize {
        match self {
            ColorMode::Gray => 1,
            ColorMode::GrayAlpha => 2,
            ColorMode::Rgb => 3,
            ColorMode::Rgba => 4,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RasterError {
    #[error("{depth}-bit {mode} images are not supported.")]
    UnsupportedFormat { depth: u8, mode: ColorMode },
    #[error("Drawing at ({x}, {y}) falls outside the {width}x{height} image.")]
    OutOfRange {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("A {width}x{height} image is too large to allocate.")]
    TooLarge { width: usize, height: usize },
}

impl RasterError {
    pub fn is_allocation(&self) -> bool {
        matches!(self, RasterError::TooLarge { .. })
    }
}

type Row = Mutex<Vec<u64>>;

/// How pixels of one row map onto its words.
#[derive(Clone, Copy, Debug)]
struct RowFormat {
    width: usize,
    depth: u8,
    channels: usize,
}

impl RowFormat {
    fn bits(&self) -> Option<usize> {
        self.width
            .checked_mul(usize::from(self.depth))?
            .checked_mul(self.channels)
    }

    fn bytes(&self) -> usize {
        (self.width * usize::from(self.depth) * self.channels).div_ceil(8)
    }

    fn write(&self, words: &mut [u64], x: usize, len: usize, color: &[u8]) {
        if self.depth == 1 {
            let set = color.first().is_some_and(|value| value & 1 == 1);
            fill_bits(words, x, x + len, set);
            return;
        }

        for px in x..x + len {
            for (channel, &value) in color.iter().take(self.channels).enumerate() {
                let byte = px * self.channels + channel;
                let shift = (byte % 8) * 8;
                let word = &mut words[byte / 8];
                *word = (*word & !(0xff << shift)) | (u64::from(value) << shift);
            }
        }
    }

    fn read(&self, words: &[u64], x: usize) -> Vec<u8> {
        if self.depth == 1 {
            return vec![((words[x / 64] >> (x % 64)) & 1) as u8];
        }

        (0..self.channels)
            .map(|channel| {
                let byte = x * self.channels + channel;
                (words[byte / 8] >> ((byte % 8) * 8)) as u8
            })
            .collect()
    }

    fn pack(&self, words: &[u64]) -> Vec<u8> {
        let mut bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        bytes.truncate(self.bytes());
        if self.depth == 1 {
            for byte in &mut bytes {
                *byte = byte.reverse_bits();
            }
        }
        bytes
    }
}

/// Sets or clears bits `start..end`, a whole word at a time where possible.
fn fill_bits(words: &mut [u64], start: usize, end: usize, set: bool) {
    let mut bit = start;
    while bit < end {
        let offset = bit % 64;
        let run = (64 - offset).min(end - bit);
        let mask = if run == 64 {
            u64::MAX
        } else {
            ((1 << run) - 1) << offset
        };

        let word = &mut words[bit / 64];
        if set {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        bit += run;
    }
}

pub struct RasterBuffer {
    width: usize,
    height: usize,
    mode: ColorMode,
    format: RowFormat,
    rows: Vec<Row>,
}

impl RasterBuffer {
    /// Allocates a blank image. Only grayscale may use depth 1; every mode
    /// supports depth 8.
    pub fn new(
        width: usize,
        height: usize,
        depth: u8,
        mode: ColorMode,
    ) -> Result<Self, RasterError> {
        match (mode, depth) {
            (ColorMode::Gray, 1) | (_, 8) => {}
            _ => return Err(RasterError::UnsupportedFormat { depth, mode }),
        }

        let too_large = RasterError::TooLarge { width, height };
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(too_large);
        }

        let format = RowFormat {
            width,
            depth,
            channels: mode.channels(),
        };
        let words = format.bits().ok_or(too_large.clone())?.div_ceil(64);

        let mut rows = Vec::new();
        rows.try_reserve_exact(height)
            .map_err(|_| too_large.clone())?;
        for _ in 0..height {
            let mut row = Vec::new();
            row.try_reserve_exact(words)
                .map_err(|_| too_large.clone())?;
            row.resize(words, 0);
            rows.push(Mutex::new(row));
        }

        debug!("Allocated {width}x{height} {depth}-bit {mode} image ({words} words per row).");

        Ok(Self {
            width,
            height,
            mode,
            format,
            rows,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> u8 {
        self.format.depth
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Length of one packed row as handed to an encoder.
    pub fn bytes_per_row(&self) -> usize {
        self.format.bytes()
    }

    pub fn set_pixel(&self, x: usize, y: usize, color: &[u8]) -> Result<(), RasterError> {
        self.draw_horizontal_line(x, y, 1, color)
    }

    /// Fills `len` pixels of row `y` starting at column `x`.
    pub fn draw_horizontal_line(
        &self,
        x: usize,
        y: usize,
        len: usize,
        color: &[u8],
    ) -> Result<(), RasterError> {
        self.check(x, y, len, 1)?;
        let mut row = self.rows[y].lock().unwrap_or_else(PoisonError::into_inner);
        self.format.write(&mut row, x, len, color);
        Ok(())
    }

    /// Fills `len` pixels of column `x` starting at row `y`, locking one row
    /// at a time.
    pub fn draw_vertical_line(
        &self,
        x: usize,
        y: usize,
        len: usize,
        color: &[u8],
    ) -> Result<(), RasterError> {
        self.check(x, y, 1, len)?;
        for row in &self.rows[y..y + len] {
            let mut row = row.lock().unwrap_or_else(PoisonError::into_inner);
            self.format.write(&mut row, x, 1, color);
        }
        Ok(())
    }

    /// Channel values of one pixel.
    pub fn pixel(&self, x: usize, y: usize) -> Result<Vec<u8>, RasterError> {
        self.check(x, y, 1, 1)?;
        let row = self.rows[y].lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.format.read(&row, x))
    }

    /// Packed bytes of row `y`.
    pub fn row_bytes(&self, y: usize) -> Result<Vec<u8>, RasterError> {
        self.check(0, y, 0, 1)?;
        let row = self.rows[y].lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.format.pack(&row))
    }

    /// Splits the buffer into bands of rows that can be drawn from separate
    /// threads without locking. `ranges` must be ascending and disjoint.
    pub fn bands_mut(&mut self, ranges: &[Range<usize>]) -> Result<Vec<RowBand<'_>>, RasterError> {
        let (width, height, format) = (self.width, self.height, self.format);
        let mut bands = Vec::with_capacity(ranges.len());
        let mut rest: &mut [Row] = &mut self.rows;
        let mut offset = 0;

        for range in ranges {
            if range.start < offset || range.end < range.start || range.end > height {
                return Err(RasterError::OutOfRange {
                    x: 0,
                    y: range.start,
                    width,
                    height,
                });
            }

            let (_, tail) = std::mem::take(&mut rest).split_at_mut(range.start - offset);
            let (rows, tail) = tail.split_at_mut(range.len());
            bands.push(RowBand {
                first: range.start,
                width,
                height,
                format,
                rows,
            });
            rest = tail;
            offset = range.end;
        }

        Ok(bands)
    }

    /// Hands the packed rows over to an encoder, top row first.
    pub fn into_rows(self) -> impl ExactSizeIterator<Item = Vec<u8>> {
        let format = self.format;
        self.rows.into_iter().map(move |row| {
            let words = row.into_inner().unwrap_or_else(PoisonError::into_inner);
            format.pack(&words)
        })
    }

    fn check(&self, x: usize, y: usize, columns: usize, rows: usize) -> Result<(), RasterError> {
        check_bounds(x, y, columns, rows, 0..self.height, self.width, self.height)
    }
}

fn check_bounds(
    x: usize,
    y: usize,
    columns: usize,
    rows: usize,
    allowed_rows: Range<usize>,
    width: usize,
    height: usize,
) -> Result<(), RasterError> {
    let fits_x = x.checked_add(columns).is_some_and(|end| end <= width);
    let fits_y = allowed_rows.contains(&y)
        && y.checked_add(rows).is_some_and(|end| end <= allowed_rows.end);
    if fits_x && fits_y {
        Ok(())
    } else {
        Err(RasterError::OutOfRange {
            x,
            y,
            width,
            height,
        })
    }
}

/// Exclusive access to a contiguous run of rows. Coordinates stay in image
/// space; drawing outside the band is an error.
pub struct RowBand<'a> {
    first: usize,
    width: usize,
    height: usize,
    format: RowFormat,
    rows: &'a mut [Row],
}

impl RowBand<'_> {
    pub fn rows(&self) -> Range<usize> {
        self.first..self.first + self.rows.len()
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: &[u8]) -> Result<(), RasterError> {
        self.draw_horizontal_line(x, y, 1, color)
    }

    pub fn draw_horizontal_line(
        &mut self,
        x: usize,
        y: usize,
        len: usize,
        color: &[u8],
    ) -> Result<(), RasterError> {
        self.check(x, y, len, 1)?;
        let format = self.format;
        format.write(self.row(y), x, len, color);
        Ok(())
    }

    pub fn draw_vertical_line(
        &mut self,
        x: usize,
        y: usize,
        len: usize,
        color: &[u8],
    ) -> Result<(), RasterError> {
        self.check(x, y, 1, len)?;
        let format = self.format;
        for py in y..y + len {
            format.write(self.row(py), x, 1, color);
        }
        Ok(())
    }

    fn row(&mut self, y: usize) -> &mut Vec<u64> {
        self.rows[y - self.first]
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, x: usize, y: usize, columns: usize, rows: usize) -> Result<(), RasterError> {
        check_bounds(x, y, columns, rows, self.rows(), self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn rows_of(buffer: RasterBuffer) -> Vec<Vec<u8>> {
        buffer.into_rows().collect()
    }

    #[test]
    fn horizontal_line_at_depth_one_sets_only_its_row() {
        let buffer = RasterBuffer::new(3, 2, 1, ColorMode::Gray).unwrap();
        buffer.draw_horizontal_line(0, 0, 3, &[1]).unwrap();

        for x in 0..3 {
            assert_eq!(buffer.pixel(x, 0).unwrap(), [1]);
            assert_eq!(buffer.pixel(x, 1).unwrap(), [0]);
        }
        assert_eq!(rows_of(buffer), vec![vec![0b1110_0000], vec![0]]);
    }

    #[test]
    fn pixels_read_back_masked_to_depth() {
        let gray = RasterBuffer::new(5, 1, 1, ColorMode::Gray).unwrap();
        gray.set_pixel(4, 0, &[255]).unwrap();
        gray.set_pixel(2, 0, &[2]).unwrap();
        assert_eq!(gray.pixel(4, 0).unwrap(), [1]);
        assert_eq!(gray.pixel(2, 0).unwrap(), [0]);

        let rgba = RasterBuffer::new(3, 2, 8, ColorMode::Rgba).unwrap();
        rgba.set_pixel(1, 1, &[10, 20, 30, 40]).unwrap();
        assert_eq!(rgba.pixel(1, 1).unwrap(), [10, 20, 30, 40]);
        assert_eq!(rgba.pixel(0, 1).unwrap(), [0, 0, 0, 0]);
        assert_eq!(rgba.pixel(2, 1).unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn depth_one_lines_cross_word_boundaries() {
        let buffer = RasterBuffer::new(200, 1, 1, ColorMode::Gray).unwrap();
        buffer.draw_horizontal_line(60, 0, 80, &[1]).unwrap();
        buffer.draw_horizontal_line(100, 0, 5, &[0]).unwrap();

        for x in 0..200 {
            let expected = (60..140).contains(&x) && !(100..105).contains(&x);
            assert_eq!(buffer.pixel(x, 0).unwrap(), [u8::from(expected)], "x = {x}");
        }
        assert_eq!(buffer.bytes_per_row(), 25);
    }

    #[test]
    fn rgb_rows_pack_channels_in_order() {
        let buffer = RasterBuffer::new(3, 1, 8, ColorMode::Rgb).unwrap();
        buffer.draw_horizontal_line(1, 0, 2, &[1, 2, 3]).unwrap();
        assert_eq!(rows_of(buffer), vec![vec![0, 0, 0, 1, 2, 3, 1, 2, 3]]);
    }

    #[test]
    fn vertical_line_touches_one_column() {
        let buffer = RasterBuffer::new(4, 4, 8, ColorMode::GrayAlpha).unwrap();
        buffer.draw_vertical_line(2, 1, 3, &[7, 9]).unwrap();

        for y in 0..4 {
            for x in 0..4 {
                let expected = if x == 2 && y >= 1 { [7, 9] } else { [0, 0] };
                assert_eq!(buffer.pixel(x, y).unwrap(), expected);
            }
        }
    }

    #[test]
    fn out_of_range_leaves_buffer_unmodified() {
        let buffer = RasterBuffer::new(4, 3, 8, ColorMode::Gray).unwrap();

        assert!(matches!(
            buffer.draw_horizontal_line(2, 0, 3, &[9]),
            Err(RasterError::OutOfRange { x: 2, y: 0, .. })
        ));
        assert!(buffer.draw_vertical_line(0, 1, 3, &[9]).is_err());
        assert!(buffer.set_pixel(0, 3, &[9]).is_err());
        assert!(buffer.draw_horizontal_line(usize::MAX, 0, 2, &[9]).is_err());

        assert!(rows_of(buffer).iter().flatten().all(|&b| b == 0));
    }

    #[test]
    fn unsupported_formats_are_rejected() {
        for mode in [ColorMode::GrayAlpha, ColorMode::Rgb, ColorMode::Rgba] {
            assert_eq!(
                RasterBuffer::new(2, 2, 1, mode).err(),
                Some(RasterError::UnsupportedFormat { depth: 1, mode })
            );
        }
        assert!(RasterBuffer::new(2, 2, 16, ColorMode::Gray).is_err());
        assert!(RasterBuffer::new(2, 2, 1, ColorMode::Gray).is_ok());
    }

    #[test]
    fn oversized_images_are_allocation_errors() {
        let err = RasterBuffer::new(MAX_DIMENSION + 1, 1, 8, ColorMode::Gray)
            .err()
            .unwrap();
        assert!(err.is_allocation());
    }

    #[test]
    fn bands_must_be_ordered_and_inside_the_image() {
        let mut buffer = RasterBuffer::new(2, 6, 8, ColorMode::Gray).unwrap();
        assert!(buffer.bands_mut(&[0..2, 1..3]).is_err());
        assert!(buffer.bands_mut(&[0..7]).is_err());

        let mut bands = buffer.bands_mut(&[1..3, 4..6]).unwrap();
        assert_eq!(bands[0].rows(), 1..3);
        assert!(bands[0].set_pixel(0, 3, &[1]).is_err());
        assert!(bands[1].draw_vertical_line(1, 3, 2, &[1]).is_err());
        bands[1].draw_vertical_line(1, 4, 2, &[1]).unwrap();

        assert_eq!(buffer.pixel(1, 5).unwrap(), [1]);
        assert_eq!(buffer.pixel(1, 3).unwrap(), [0]);
    }

    #[test]
    fn concurrent_bands_match_sequential_drawing() {
        fn paint(band: &mut RowBand<'_>) {
            for y in band.rows() {
                band.draw_horizontal_line(y % 7, y, 50 + y % 13, &[1]).unwrap();
                band.set_pixel(127 - y % 64, y, &[0]).unwrap();
            }
        }

        let ranges = [0..10, 10..33, 33..34, 34..64];

        let mut concurrent = RasterBuffer::new(128, 64, 1, ColorMode::Gray).unwrap();
        let bands = concurrent.bands_mut(&ranges).unwrap();
        thread::scope(|scope| {
            for mut band in bands {
                scope.spawn(move || paint(&mut band));
            }
        });

        let mut sequential = RasterBuffer::new(128, 64, 1, ColorMode::Gray).unwrap();
        for mut band in sequential.bands_mut(&ranges).unwrap().into_iter().rev() {
            paint(&mut band);
        }

        assert_eq!(rows_of(concurrent), rows_of(sequential));
    }
}
