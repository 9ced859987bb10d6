pub mod algorithms;

use rand::prelude::{IndexedRandom, Rng, SeedableRng, StdRng};
use strum::{Display, EnumIter, EnumMessage, EnumString};

use super::{Cell, Direction, MazeError, WallGrid};
use crate::progress::Counter;
use algorithms::{
    backtrack::Backtrack, division::RecursiveDivision, kruskal::Kruskal, wilson::Wilson,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumMessage, EnumString)]
pub enum Algorithm {
    #[strum(
        serialize = "backtracker",
        message = "Recursive backtracker",
        detailed_message = "Long winding corridors with few dead ends."
    )]
    Backtracker,
    #[strum(
        serialize = "wilson",
        message = "Wilson's algorithm",
        detailed_message = "Unbiased: every possible maze is equally likely."
    )]
    Wilson,
    #[strum(
        serialize = "division",
        message = "Recursive division",
        detailed_message = "Long straight walls splitting the maze into boxes."
    )]
    RecursiveDivision,
    #[strum(
        serialize = "kruskal",
        message = "Kruskal's algorithm",
        detailed_message = "Many short dead ends."
    )]
    Kruskal,
}

impl Algorithm {
    /// Smallest width and height the algorithm can carve.
    pub fn min_dimension(self) -> usize {
        match self {
            Algorithm::RecursiveDivision => 2,
            _ => 1,
        }
    }
}

pub struct MazeMaker<'a> {
    pub walls: WallGrid,
    pub rng: StdRng,
    width: usize,
    height: usize,
    progress: Counter<'a>,
}

impl<'a> MazeMaker<'a> {
    /// Carves `walls` with `generator`, counting one progress step per cell.
    pub fn new(
        walls: WallGrid,
        seed: u64,
        generator: Algorithm,
        progress: Counter<'a>,
    ) -> Result<Self, MazeError> {
        let mut maze = MazeMaker {
            width: walls.width(),
            height: walls.height(),
            walls,
            rng: StdRng::seed_from_u64(seed),
            progress,
        };
        match generator {
            Algorithm::Backtracker => maze.backtrack()?,
            Algorithm::Wilson => maze.wilson()?,
            Algorithm::RecursiveDivision => maze.recursive_division()?,
            Algorithm::Kruskal => maze.kruskal()?,
        }
        Ok(maze)
    }

    fn step(&self, cell: Cell, dir: Direction) -> Cell {
        self.walls
            .neighbor(cell, dir)
            .expect("moves should stay inside the grid")
    }

    fn pick_direction(&mut self, cell: Cell, allow: impl Fn(Cell) -> bool) -> Option<Direction> {
        let mut available = [Direction::Up; 4];
        let mut len = 0;

        for dir in Direction::ALL {
            if let Some(neighbor) = self.walls.neighbor(cell, dir) {
                if allow(neighbor) {
                    available[len] = dir;
                    len += 1;
                }
            }
        }

        available[..len].choose(&mut self.rng).copied()
    }

    fn pick_cell(&mut self) -> Cell {
        let x = self.rng.random_range(0..self.width);
        let y = self.rng.random_range(0..self.height);
        Cell::new(x, y)
    }

    fn visit_cell(&self) {
        self.progress.add(1);
    }

    fn index(&self, cell: Cell) -> usize {
        self.walls.index(cell)
    }

    fn too_large(&self) -> MazeError {
        MazeError::TooLarge {
            width: self.width,
            height: self.height,
        }
    }

    fn flags(&self) -> Result<Vec<bool>, MazeError> {
        filled(self.walls.len(), false).ok_or_else(|| self.too_large())
    }
}

pub(crate) fn filled<T: Clone>(len: usize, value: T) -> Option<Vec<T>> {
    let mut items = Vec::new();
    items.try_reserve_exact(len).ok()?;
    items.resize(len, value);
    Some(items)
}

/// Cells not yet joined to the maze, with O(1) random picks and removals.
struct CellPool {
    cells: Vec<usize>,
    slots: Vec<usize>,
}

impl CellPool {
    const TAKEN: usize = usize::MAX;

    fn full(len: usize) -> Option<Self> {
        let mut cells = filled(len, 0)?;
        let mut slots = filled(len, 0)?;
        for i in 0..len {
            cells[i] = i;
            slots[i] = i;
        }
        Some(Self { cells, slots })
    }

    fn pick(&self, rng: &mut StdRng) -> Option<usize> {
        self.cells.choose(rng).copied()
    }

    fn remove(&mut self, index: usize) {
        let slot = self.slots[index];
        if slot == Self::TAKEN {
            return;
        }

        self.cells.swap_remove(slot);
        if let Some(&moved) = self.cells.get(slot) {
            self.slots[moved] = slot;
        }
        self.slots[index] = Self::TAKEN;
    }
}
