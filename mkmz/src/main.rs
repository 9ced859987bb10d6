mod cli;
mod encode;
mod logging;
mod output;
mod progress_bar;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{Level, debug, error, info, log_enabled};
use strum::EnumMessage;

use cli::Args;
use common::draw::{self, DrawError, Layout, Palette};
use common::maze::{Maze, MazeError};
use common::progress::ProgressFn;
use common::raster::{RasterBuffer, RasterError};

/// Largest maze printed as text with `--debug`.
const MAX_LOGGED_CELLS: usize = 1024;

fn main() -> ExitCode {
    let args = Args::parse();
    let (width, height) = args.dimensions();

    let mut image = output::image_path(args.output.as_deref(), width, height);
    if !args.replace {
        image = output::versioned(&image);
    }

    let log_file = if args.log {
        let mut path = output::log_path(&image);
        if !args.replace {
            path = output::versioned(&path);
        }
        match File::create(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Error: Failed to create log file {}.", path.display());
                eprintln!("Details: {e}.");
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };
    logging::init(args.debug, log_file);

    match run(&args, image) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !args.quiet {
                progress_bar::interrupt();
            }
            error!("{err:#}");
            if is_allocation(&err) {
                error!("Reduce the maze dimensions, cell size or wall width and try again.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, image: PathBuf) -> anyhow::Result<()> {
    let (width, height) = args.dimensions();
    let layout = Layout::new(args.cell_size, args.wall_width)?;
    let palette = Palette::new(args.wall_color, args.cell_color);
    let (image_width, image_height) = layout.image_size(width, height)?;

    let bar: &ProgressFn<'_> = &progress_bar::draw;
    let progress = (!args.quiet).then_some(bar);

    info!("Generating maze...");
    let start = Instant::now();
    let maze = Maze::generate(width, height, args.algorithm, args.seed, progress)
        .context("Failed to generate maze")?;
    info!("Maze generation finished in {}.", elapsed(start));
    if log_enabled!(Level::Debug) && width.saturating_mul(height) <= MAX_LOGGED_CELLS {
        debug!("Maze:\n{maze}");
    }

    info!("Drawing maze...");
    let start = Instant::now();
    let mut buffer = RasterBuffer::new(image_width, image_height, palette.depth, palette.mode)
        .context("Failed to allocate image")?;
    draw::draw(&maze, &mut buffer, layout, &palette, progress).context("Failed to draw maze")?;
    info!("Drawing finished in {}.", elapsed(start));

    let mut metadata = maze.metadata();
    metadata.push(("Cell Size".to_string(), args.cell_size.to_string()));
    metadata.push(("Wall Width".to_string(), args.wall_width.to_string()));
    let description = maze.algorithm.get_message();
    drop(maze);

    info!("Writing image...");
    let start = Instant::now();
    encode::write_png(&image, buffer, &metadata, args.compression, progress)
        .with_context(|| format!("Failed to write {}", image.display()))?;
    info!("Image written in {}.", elapsed(start));

    summarize(&metadata, description, (image_width, image_height), &image);
    Ok(())
}

fn summarize(
    metadata: &[(String, String)],
    description: Option<&str>,
    size: (usize, usize),
    image: &Path,
) {
    info!("Maze image generated with the following attributes:");
    for (key, value) in metadata.iter().filter(|(key, _)| key != "Software") {
        info!("\t{key}: {value}");
    }
    if let Some(description) = description {
        debug!("\tAlgorithm Name: {description}");
    }
    info!("\tImage Width: {}", size.0);
    info!("\tImage Height: {}", size.1);
    info!("\tImage Name: {}", image.display());
}

fn elapsed(start: Instant) -> String {
    let elapsed = start.elapsed();
    format!("{}ms ({:.3}s)", elapsed.as_millis(), elapsed.as_secs_f64())
}

fn is_allocation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.downcast_ref::<MazeError>().is_some_and(MazeError::is_allocation)
            || cause.downcast_ref::<RasterError>().is_some_and(RasterError::is_allocation)
            || cause.downcast_ref::<DrawError>().is_some_and(DrawError::is_allocation)
    })
}
