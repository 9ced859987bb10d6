//! Command-line options.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use common::draw::Rgba;
use common::maze::Algorithm;
use strum::{EnumMessage, IntoEnumIterator};

const DEFAULT_SIZE: usize = 10;

/// Generate a random maze and save it as a PNG image.
#[derive(Parser, Debug)]
#[command(name = "mkmz", about, long_about = None, version)]
pub struct Args {
    /// Maze width in cells [default: the height, or 10]
    #[arg(short = 'W', long)]
    pub width: Option<usize>,

    /// Maze height in cells [default: the width, or 10]
    #[arg(short = 'H', long)]
    pub height: Option<usize>,

    /// Size of a cell's interior in pixels
    #[arg(short, long, default_value_t = 10)]
    pub cell_size: usize,

    /// Thickness of walls in pixels
    #[arg(short = 't', long, default_value_t = 1)]
    pub wall_width: usize,

    /// Wall colour as #rgb, #rrggbb or #rrggbbaa
    #[arg(long, value_parser = parse_color, default_value = "#000")]
    pub wall_color: Rgba,

    /// Cell colour as #rgb, #rrggbb or #rrggbbaa
    #[arg(long, value_parser = parse_color, default_value = "#fff")]
    pub cell_color: Rgba,

    /// Maze algorithm: backtracker, wilson, division or kruskal
    #[arg(short, long, value_parser = parse_algorithm, default_value = "backtracker")]
    pub algorithm: Algorithm,

    /// Seed for the random number generator [default: random]
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Output file name; any extension is replaced with .png [default: <W>x<H>_maze.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite existing files instead of numbering new ones
    #[arg(long, default_value_t = false)]
    pub replace: bool,

    /// Also write the log to <output>.txt
    #[arg(long, default_value_t = false)]
    pub log: bool,

    /// PNG compression level
    #[arg(long, value_enum, default_value_t = Compression::Default)]
    pub compression: Compression,

    /// Enable debug messages
    #[arg(short, long, default_value_t = false)]
    pub debug: bool,

    /// Hide progress bars
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Compression {
    Fast,
    Default,
    Best,
}

impl From<Compression> for png::Compression {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::Fast => png::Compression::Fast,
            Compression::Default => png::Compression::Default,
            Compression::Best => png::Compression::Best,
        }
    }
}

impl Args {
    /// Maze width and height in cells. A missing dimension copies the other.
    pub fn dimensions(&self) -> (usize, usize) {
        match (self.width, self.height) {
            (Some(width), Some(height)) => (width, height),
            (Some(side), None) | (None, Some(side)) => (side, side),
            (None, None) => (DEFAULT_SIZE, DEFAULT_SIZE),
        }
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm, String> {
    name.parse().map_err(|_| {
        let known: Vec<String> = Algorithm::iter()
            .map(|algorithm| {
                let description = algorithm.get_detailed_message().unwrap_or_default();
                format!("  {algorithm}: {description}")
            })
            .collect();
        format!("unknown algorithm, expected one of:\n{}", known.join("\n"))
    })
}

pub fn parse_color(text: &str) -> Result<Rgba, String> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("'{text}' is not a hexadecimal colour"));
    }

    let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).unwrap_or(0);
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);

    match hex.len() {
        3 => Ok(Rgba([digit(0) * 17, digit(1) * 17, digit(2) * 17, u8::MAX])),
        6 => Ok(Rgba([pair(0), pair(2), pair(4), u8::MAX])),
        8 => Ok(Rgba([pair(0), pair(2), pair(4), pair(6)])),
        _ => Err(format!("'{text}' should look like #rgb, #rrggbb or #rrggbbaa")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colours_accept_short_long_and_alpha_forms() {
        assert_eq!(parse_color("#fff"), Ok(Rgba::WHITE));
        assert_eq!(parse_color("#000000"), Ok(Rgba::BLACK));
        assert_eq!(parse_color("1a2B3c"), Ok(Rgba([0x1a, 0x2b, 0x3c, 255])));
        assert_eq!(parse_color("#10203040"), Ok(Rgba([0x10, 0x20, 0x30, 0x40])));
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#ggg").is_err());
        assert!(parse_color("#éé").is_err());
    }

    #[test]
    fn missing_dimension_mirrors_the_other() {
        let args = Args::try_parse_from(["mkmz", "-W", "30"]).unwrap();
        assert_eq!(args.dimensions(), (30, 30));

        let args = Args::try_parse_from(["mkmz", "--height", "7"]).unwrap();
        assert_eq!(args.dimensions(), (7, 7));

        let args = Args::try_parse_from(["mkmz", "-W", "4", "-H", "9"]).unwrap();
        assert_eq!(args.dimensions(), (4, 9));

        let args = Args::try_parse_from(["mkmz"]).unwrap();
        assert_eq!(args.dimensions(), (10, 10));
    }

    #[test]
    fn defaults_draw_black_walls_on_white() {
        let args = Args::try_parse_from(["mkmz"]).unwrap();
        assert_eq!(args.wall_color, Rgba::BLACK);
        assert_eq!(args.cell_color, Rgba::WHITE);
        assert_eq!(args.algorithm, Algorithm::Backtracker);
        assert_eq!((args.cell_size, args.wall_width), (10, 1));
        assert_eq!(args.compression, Compression::Default);
    }

    #[test]
    fn algorithms_are_named_in_lowercase() {
        let args = Args::try_parse_from(["mkmz", "-a", "division", "-s", "42"]).unwrap();
        assert_eq!(args.algorithm, Algorithm::RecursiveDivision);
        assert_eq!(args.seed, Some(42));

        assert!(Args::try_parse_from(["mkmz", "-a", "prim"]).is_err());
    }
}
