pub mod maker;
pub mod solver;
pub mod walls;

use std::fmt;

use log::debug;
use thiserror::Error;

pub use maker::Algorithm;
pub use solver::Solution;
pub use walls::{Cell, Direction, WallGrid};

use crate::progress::{ProgressFn, ProgressMonitor};
use maker::MazeMaker;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("A {width}x{height} maze is not possible: both dimensions must be at least {minimum}.")]
    InvalidDimensions {
        width: usize,
        height: usize,
        minimum: usize,
    },
    #[error("A {width}x{height} maze is too large to allocate.")]
    TooLarge { width: usize, height: usize },
    #[error("Only {visited} of {total} cells are reachable; the maze is not connected.")]
    Disconnected { visited: usize, total: usize },
}

impl MazeError {
    pub fn is_allocation(&self) -> bool {
        matches!(self, MazeError::TooLarge { .. })
    }
}

pub struct Maze {
    pub walls: WallGrid,
    pub algorithm: Algorithm,
    pub seed: u64,
    pub solution: Solution,
}

impl Maze {
    /// Carves a `width` x `height` maze and picks its entrance and exit.
    ///
    /// A missing `seed` is drawn from the operating system and recorded in
    /// the returned maze. `progress` is told about carving and path analysis
    /// as a single phase.
    pub fn generate(
        width: usize,
        height: usize,
        generator: Algorithm,
        seed: Option<u64>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<Self, MazeError> {
        let minimum = generator.min_dimension();
        if width < minimum || height < minimum {
            return Err(MazeError::InvalidDimensions {
                width,
                height,
                minimum,
            });
        }

        let walls = WallGrid::new(width, height)?;
        let seed = seed.unwrap_or_else(rand::random);
        debug!("Carving {width}x{height} maze with {generator} (seed {seed}).");

        let cells = walls.len() as u64;
        ProgressMonitor::new(progress, 2 * cells).watch(2, |counters| -> Result<Maze, MazeError> {
            let maker = MazeMaker::new(walls, seed, generator, counters[0])?;
            let walls = maker.walls;
            let solution = solver::find_exits(&walls, counters[1])?;

            Ok(Maze {
                walls,
                algorithm: generator,
                seed,
                solution,
            })
        })
    }

    pub fn width(&self) -> usize {
        self.walls.width()
    }

    pub fn height(&self) -> usize {
        self.walls.height()
    }

    pub fn entrance(&self) -> Cell {
        self.solution.entrance
    }

    pub fn exit(&self) -> Cell {
        self.solution.exit
    }

    /// Key/value pairs describing how the maze was made, in display order.
    pub fn metadata(&self) -> Vec<(String, String)> {
        let point = |cell: Cell| format!("({}, {})", cell.x, cell.y);

        vec![
            ("Software".to_string(), "mkmz".to_string()),
            ("Algorithm".to_string(), self.algorithm.to_string()),
            ("Seed".to_string(), self.seed.to_string()),
            ("Maze Width".to_string(), self.width().to_string()),
            ("Maze Height".to_string(), self.height().to_string()),
            ("Entrance".to_string(), point(self.entrance())),
            ("Exit".to_string(), point(self.exit())),
            (
                "Solution Distance".to_string(),
                self.solution.distance.to_string(),
            ),
            (
                "Solution Branches".to_string(),
                self.solution.branches.to_string(),
            ),
        ]
    }

    /// Text rendering with row 0 at the top, matching the image layout.
    pub fn log(&self) -> String {
        let walls = &self.walls;
        let mut out = String::new();

        for y in 0..walls.height() {
            for x in 0..walls.width() {
                let closed = !walls.is_open(Cell::new(x, y), Direction::Down);
                out.push_str(if closed { "+--" } else { "+  " });
            }
            out.push_str("+\n");

            for x in 0..walls.width() {
                let closed = !walls.is_open(Cell::new(x, y), Direction::Left);
                out.push_str(if closed { "|  " } else { "   " });
            }
            out.push_str("|\n");
        }

        out.push_str(&"+--".repeat(walls.width()));
        out.push('+');
        out
    }
}

impl fmt::Debug for Maze {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.log())
    }
}
