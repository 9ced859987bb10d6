use disjoint::DisjointSet;
use rand::seq::SliceRandom;

use super::super::{Cell, Direction, MazeError, MazeMaker};

pub trait Kruskal {
    fn kruskal(&mut self) -> Result<(), MazeError>;
}

impl Kruskal for MazeMaker<'_> {
    fn kruskal(&mut self) -> Result<(), MazeError> {
        let mut walls = self.internal_walls()?;
        walls.shuffle(&mut self.rng);

        let mut rooms = DisjointSet::with_len(self.walls.len());
        self.visit_cell();

        for (cell, dir) in walls {
            let next = self.step(cell, dir);
            if rooms.join(self.index(cell), self.index(next)) {
                self.walls.open(cell, dir);
                self.visit_cell();
            }
        }

        Ok(())
    }
}

impl MazeMaker<'_> {
    /// Every edge between two cells, named by the cell below or left of it.
    fn internal_walls(&self) -> Result<Vec<(Cell, Direction)>, MazeError> {
        let count = (self.width - 1) * self.height + self.width * (self.height - 1);

        let mut walls = Vec::new();
        walls
            .try_reserve_exact(count)
            .map_err(|_| self.too_large())?;

        for y in 0..self.height {
            for x in 0..self.width {
                let cell = Cell::new(x, y);
                if x + 1 < self.width {
                    walls.push((cell, Direction::Right));
                }
                if y + 1 < self.height {
                    walls.push((cell, Direction::Up));
                }
            }
        }

        Ok(walls)
    }
}
