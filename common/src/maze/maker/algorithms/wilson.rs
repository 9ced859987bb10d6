use super::super::{CellPool, Direction, MazeError, MazeMaker, filled};

pub trait Wilson {
    fn wilson(&mut self) -> Result<(), MazeError>;
}

impl Wilson for MazeMaker<'_> {
    fn wilson(&mut self) -> Result<(), MazeError> {
        let len = self.walls.len();
        let mut in_maze = self.flags()?;
        // Last direction taken out of each cell by the current walk.
        let mut exits = filled(len, Direction::Up).ok_or_else(|| self.too_large())?;
        let mut prospective_cells = CellPool::full(len).ok_or_else(|| self.too_large())?;

        let initial_cell = self.pick_cell();
        let i = self.index(initial_cell);
        in_maze[i] = true;
        prospective_cells.remove(i);
        self.visit_cell();

        let mut finalized = 1;
        while let Some(start) = prospective_cells.pick(&mut self.rng) {
            let start_of_walk = self.walls.cell_at(start);

            // Walk until the maze is hit. Revisiting a cell overwrites its
            // exit, which erases the loop that led back to it.
            let mut curr = start_of_walk;
            while !in_maze[self.index(curr)] {
                let dir = self
                    .pick_direction(curr, |_| true)
                    .ok_or(MazeError::Disconnected {
                        visited: finalized,
                        total: len,
                    })?;
                exits[self.index(curr)] = dir;
                curr = self.step(curr, dir);
            }

            let mut curr = start_of_walk;
            while !in_maze[self.index(curr)] {
                let i = self.index(curr);
                let dir = exits[i];
                self.walls.open(curr, dir);
                in_maze[i] = true;
                prospective_cells.remove(i);
                self.visit_cell();
                finalized += 1;
                curr = self.step(curr, dir);
            }
        }

        Ok(())
    }
}
