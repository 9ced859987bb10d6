use super::super::{MazeError, MazeMaker};

pub trait Backtrack {
    fn backtrack(&mut self) -> Result<(), MazeError>;
}

impl Backtrack for MazeMaker<'_> {
    fn backtrack(&mut self) -> Result<(), MazeError> {
        let mut visited = self.flags()?;
        let mut stack = Vec::new();

        let initial_cell = self.pick_cell();
        visited[self.index(initial_cell)] = true;
        self.visit_cell();

        let width = self.width;
        let mut curr = initial_cell;
        loop {
            if let Some(dir) = self.pick_direction(curr, |c| !visited[c.y * width + c.x]) {
                self.walls.open(curr, dir);
                curr = self.step(curr, dir);
                visited[self.index(curr)] = true;
                self.visit_cell();
                stack.push(dir);
            } else if let Some(dir) = stack.pop() {
                curr = self.step(curr, dir.opposite());
            } else {
                break;
            }
        }

        debug_assert_eq!(curr, initial_cell, "backtracking should end where it began");
        Ok(())
    }
}
