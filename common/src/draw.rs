//! Renders a maze into a [`RasterBuffer`] from a small pool of threads.
//!
//! Drawing runs in phases separated by joins:
//!
//! 1. fill every image row with the cell colour,
//! 2. draw the right boundary,
//! 3. draw each cell's top-left post and its closed down and left walls,
//! 4. draw the bottom boundary,
//! 5. cut the entrance and exit into the boundary.
//!
//! The first two phases split the image by pixel rows. The third splits the
//! maze by cell rows and hands each worker the pixel rows those cells cover,
//! so no two workers ever share a row.

use std::ops::Range;
use std::thread;
use std::time::Instant;

use log::debug;
use thiserror::Error;

use crate::maze::{Cell, Direction, Maze, WallGrid};
use crate::progress::{Counter, ProgressFn, ProgressMonitor};
use crate::raster::{ColorMode, MAX_DIMENSION, RasterBuffer, RasterError, RowBand};

pub const MAX_WORKERS: usize = 8;
const ROWS_PER_WORKER: usize = 256;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("Cells must be at least 1 pixel wide and walls at least 1 pixel thick.")]
    InvalidLayout { cell_size: usize, wall_width: usize },
    #[error("A {width}x{height} maze needs an image wider or taller than {max} pixels.", max = MAX_DIMENSION)]
    TooLarge { width: usize, height: usize },
    #[error("The image is {actual:?} pixels but the maze needs {expected:?}.")]
    SizeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("The palette needs a {depth}-bit {mode} image.")]
    FormatMismatch { depth: u8, mode: ColorMode },
    #[error(transparent)]
    Raster(#[from] RasterError),
}

impl DrawError {
    pub fn is_allocation(&self) -> bool {
        match self {
            DrawError::TooLarge { .. } => true,
            DrawError::Raster(err) => err.is_allocation(),
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);

    fn is_gray(self) -> bool {
        let [r, g, b, _] = self.0;
        r == g && g == b
    }

    fn is_opaque(self) -> bool {
        self.0[3] == u8::MAX
    }

    fn is_black_or_white(self) -> bool {
        self.is_gray() && self.is_opaque() && matches!(self.0[0], 0 | u8::MAX)
    }
}

/// Wall and cell colours encoded for the smallest image format that holds
/// them both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub mode: ColorMode,
    pub depth: u8,
    wall: Vec<u8>,
    cell: Vec<u8>,
}

impl Palette {
    pub fn new(wall: Rgba, cell: Rgba) -> Self {
        let (mode, depth) = if wall.is_black_or_white() && cell.is_black_or_white() {
            (ColorMode::Gray, 1)
        } else if wall.is_gray() && cell.is_gray() {
            if wall.is_opaque() && cell.is_opaque() {
                (ColorMode::Gray, 8)
            } else {
                (ColorMode::GrayAlpha, 8)
            }
        } else if wall.is_opaque() && cell.is_opaque() {
            (ColorMode::Rgb, 8)
        } else {
            (ColorMode::Rgba, 8)
        };

        Self {
            mode,
            depth,
            wall: encode(wall, mode, depth),
            cell: encode(cell, mode, depth),
        }
    }

    pub fn wall(&self) -> &[u8] {
        &self.wall
    }

    pub fn cell(&self) -> &[u8] {
        &self.cell
    }
}

fn encode(color: Rgba, mode: ColorMode, depth: u8) -> Vec<u8> {
    let [r, g, b, a] = color.0;
    match mode {
        ColorMode::Gray if depth == 1 => vec![u8::from(r != 0)],
        ColorMode::Gray => vec![r],
        ColorMode::GrayAlpha => vec![r, a],
        ColorMode::Rgb => vec![r, g, b],
        ColorMode::Rgba => vec![r, g, b, a],
    }
}

/// Pixel sizes of cells and walls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub cell_size: usize,
    pub wall_width: usize,
}

impl Layout {
    pub fn new(cell_size: usize, wall_width: usize) -> Result<Self, DrawError> {
        if cell_size == 0 || wall_width == 0 {
            return Err(DrawError::InvalidLayout {
                cell_size,
                wall_width,
            });
        }
        Ok(Self {
            cell_size,
            wall_width,
        })
    }

    /// Distance between the top-left corners of neighbouring cells.
    pub fn pitch(&self) -> usize {
        self.cell_size + self.wall_width
    }

    /// Image width and height for a maze of the given size in cells.
    pub fn image_size(&self, width: usize, height: usize) -> Result<(usize, usize), DrawError> {
        let side = |cells: usize| {
            cells
                .checked_mul(self.pitch())?
                .checked_add(self.wall_width)
                .filter(|&pixels| pixels <= MAX_DIMENSION)
        };
        match (side(width), side(height)) {
            (Some(w), Some(h)) => Ok((w, h)),
            _ => Err(DrawError::TooLarge { width, height }),
        }
    }
}

/// Number of threads used for an image `image_height` pixels tall.
pub fn worker_count(image_height: usize) -> usize {
    (1 + image_height / ROWS_PER_WORKER)
        .clamp(1, MAX_WORKERS)
        .min(image_height.max(1))
}

/// Splits `0..len` into at most `parts` contiguous, non-empty ranges whose
/// lengths differ by at most one.
pub fn partition(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.min(len).max(1);
    let (base, extra) = (len / parts, len % parts);

    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let end = start + base + usize::from(i < extra);
        if end > start {
            ranges.push(start..end);
        }
        start = end;
    }
    ranges
}

/// Draws `maze` into `buffer`, which must already have the size given by
/// `layout` and the format chosen by `palette`.
pub fn draw(
    maze: &Maze,
    buffer: &mut RasterBuffer,
    layout: Layout,
    palette: &Palette,
    progress: Option<&ProgressFn<'_>>,
) -> Result<(), DrawError> {
    let workers = worker_count(buffer.height());
    draw_with_workers(maze, buffer, layout, palette, progress, workers)
}

fn draw_with_workers(
    maze: &Maze,
    buffer: &mut RasterBuffer,
    layout: Layout,
    palette: &Palette,
    progress: Option<&ProgressFn<'_>>,
    workers: usize,
) -> Result<(), DrawError> {
    let (width, height) = layout.image_size(maze.width(), maze.height())?;
    let actual = (buffer.width(), buffer.height());
    if actual != (width, height) {
        return Err(DrawError::SizeMismatch {
            expected: (width, height),
            actual,
        });
    }
    if (buffer.mode(), buffer.depth()) != (palette.mode, palette.depth) {
        return Err(DrawError::FormatMismatch {
            depth: palette.depth,
            mode: palette.mode,
        });
    }

    let pitch = layout.pitch();
    let wall = layout.wall_width;
    let walls = &maze.walls;

    let image_rows = partition(height, workers);
    let cell_rows: Vec<Range<usize>> = partition(maze.height(), workers)
        .into_iter()
        .map(|rows| rows.start * pitch..rows.end * pitch)
        .collect();
    debug!("Drawing {width}x{height} image with {workers} workers.");
    debug!("Image rows per worker: {image_rows:?}, cell wall rows per worker: {cell_rows:?}.");

    // One step per image row in each of the first two phases, one per cell,
    // and one each for the bottom boundary, the entrance and the exit.
    let total = 2 * height + walls.len() + 3;

    ProgressMonitor::new(progress, total as u64).watch(workers + 1, |counters| -> Result<(), DrawError> {
        let single_shot = counters[workers];

        let start = Instant::now();
        run_phase(buffer.bands_mut(&image_rows)?, counters, |band, counter| {
            for y in band.rows() {
                band.draw_horizontal_line(0, y, width, palette.cell())?;
                counter.add(1);
            }
            Ok(())
        })?;
        debug!("Filled cells in {:?}.", start.elapsed());

        let start = Instant::now();
        run_phase(buffer.bands_mut(&image_rows)?, counters, |band, counter| {
            for y in band.rows() {
                band.draw_horizontal_line(width - wall, y, wall, palette.wall())?;
                counter.add(1);
            }
            Ok(())
        })?;
        debug!("Drew right boundary in {:?}.", start.elapsed());

        let start = Instant::now();
        run_phase(buffer.bands_mut(&cell_rows)?, counters, |band, counter| {
            let rows = band.rows();
            for y in rows.start / pitch..rows.end / pitch {
                for x in 0..walls.width() {
                    draw_cell(band, walls, layout, palette.wall(), Cell::new(x, y))?;
                    counter.add(1);
                }
            }
            Ok(())
        })?;
        debug!("Drew cell walls in {:?}.", start.elapsed());

        for y in height - wall..height {
            buffer.draw_horizontal_line(0, y, width, palette.wall())?;
        }
        single_shot.add(1);

        let (w, h) = (walls.width(), walls.height());
        for (cell, order) in [
            (maze.entrance(), ENTRANCE_SIDES),
            (maze.exit(), EXIT_SIDES),
        ] {
            if let Some(side) = order.into_iter().find(|side| side.touches(cell, w, h)) {
                open_side(buffer, layout, (width, height), cell, side, palette.cell())?;
            }
            single_shot.add(1);
        }

        Ok(())
    })
}

/// Runs `work` on every band at once and waits for all of them. The band at
/// index `i` reports through `counters[i]`.
fn run_phase(
    bands: Vec<RowBand<'_>>,
    counters: &[Counter<'_>],
    work: impl Fn(&mut RowBand<'_>, Counter<'_>) -> Result<(), RasterError> + Sync,
) -> Result<(), DrawError> {
    let work = &work;
    thread::scope(|scope| -> Result<(), DrawError> {
        let handles: Vec<_> = bands
            .into_iter()
            .zip(counters)
            .map(|(mut band, &counter)| scope.spawn(move || work(&mut band, counter)))
            .collect();

        for handle in handles {
            handle
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
        }
        Ok(())
    })
}

/// Draws the walls a cell owns: its top-left post, and its down and left
/// walls when closed. Boundary cells' down or left walls are the image's
/// top and left edges.
fn draw_cell(
    band: &mut RowBand<'_>,
    walls: &WallGrid,
    layout: Layout,
    color: &[u8],
    cell: Cell,
) -> Result<(), RasterError> {
    let (pitch, wall) = (layout.pitch(), layout.wall_width);
    let (ox, oy) = (cell.x * pitch, cell.y * pitch);

    let top = if walls.is_open(cell, Direction::Down) {
        wall
    } else {
        pitch
    };
    for y in oy..oy + wall {
        band.draw_horizontal_line(ox, y, top, color)?;
    }

    if !walls.is_open(cell, Direction::Left) {
        for x in ox..ox + wall {
            band.draw_vertical_line(x, oy + wall, layout.cell_size, color)?;
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

const ENTRANCE_SIDES: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];
const EXIT_SIDES: [Side; 4] = [Side::Bottom, Side::Top, Side::Right, Side::Left];

impl Side {
    fn touches(self, cell: Cell, width: usize, height: usize) -> bool {
        match self {
            Side::Top => cell.y == 0,
            Side::Bottom => cell.y + 1 == height,
            Side::Left => cell.x == 0,
            Side::Right => cell.x + 1 == width,
        }
    }
}

/// Repaints the boundary wall beside `cell` on `side` in the cell colour.
fn open_side(
    buffer: &RasterBuffer,
    layout: Layout,
    (width, height): (usize, usize),
    cell: Cell,
    side: Side,
    color: &[u8],
) -> Result<(), RasterError> {
    let (pitch, wall, size) = (layout.pitch(), layout.wall_width, layout.cell_size);
    let (ox, oy) = (cell.x * pitch, cell.y * pitch);

    match side {
        Side::Top | Side::Bottom => {
            let first = if side == Side::Top { 0 } else { height - wall };
            for y in first..first + wall {
                buffer.draw_horizontal_line(ox + wall, y, size, color)?;
            }
        }
        Side::Left | Side::Right => {
            let first = if side == Side::Left { 0 } else { width - wall };
            for x in first..first + wall {
                buffer.draw_vertical_line(x, oy + wall, size, color)?;
            }
        }
    }
    Ok(())
}
