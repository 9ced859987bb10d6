use rand::Rng;

use super::super::{Cell, Direction, MazeError, MazeMaker};

pub trait RecursiveDivision {
    fn recursive_division(&mut self) -> Result<(), MazeError>;
}

#[derive(Clone, Copy, Debug)]
struct Region {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl RecursiveDivision for MazeMaker<'_> {
    fn recursive_division(&mut self) -> Result<(), MazeError> {
        self.walls.open_all();

        // Regions are split from a work stack rather than by recursion so
        // that very tall or wide mazes cannot exhaust the call stack.
        let mut regions = vec![Region {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }];

        while let Some(region) = regions.pop() {
            if region.width < 2 || region.height < 2 {
                self.progress.add((region.width * region.height) as u64);
                continue;
            }

            let (first, second) = self.divide(region);
            regions.push(second);
            regions.push(first);
        }

        Ok(())
    }
}

impl MazeMaker<'_> {
    /// Closes one wall across `region`, leaving a single gap.
    fn divide(&mut self, region: Region) -> (Region, Region) {
        let Region {
            x,
            y,
            width,
            height,
        } = region;
        let rng = &mut self.rng;

        let horizontal = if width < height {
            true
        } else if height < width {
            false
        } else {
            rng.random_bool(0.5)
        };

        if horizontal {
            // The wall runs along the top of row `wall_y - 1`.
            let wall_y = y + rng.random_range(1..height);
            let gap_x = x + rng.random_range(0..width);

            for i in x..x + width {
                if i != gap_x {
                    self.walls.close(Cell::new(i, wall_y - 1), Direction::Up);
                }
            }

            (
                Region {
                    height: wall_y - y,
                    ..region
                },
                Region {
                    y: wall_y,
                    height: y + height - wall_y,
                    ..region
                },
            )
        } else {
            let wall_x = x + rng.random_range(1..width);
            let gap_y = y + rng.random_range(0..height);

            for i in y..y + height {
                if i != gap_y {
                    self.walls.close(Cell::new(wall_x - 1, i), Direction::Right);
                }
            }

            (
                Region {
                    width: wall_x - x,
                    ..region
                },
                Region {
                    x: wall_x,
                    width: x + width - wall_x,
                    ..region
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::maze::{Algorithm, Maze};

    #[test]
    fn four_by_four_is_always_a_spanning_tree() {
        for seed in 0..256 {
            let maze = Maze::generate(4, 4, Algorithm::RecursiveDivision, Some(seed), None)
                .expect("4x4 division should generate");
            assert_eq!(maze.walls.open_edge_count(), 15, "\n{}", maze.log());
        }
    }

    #[test]
    fn two_by_two_keeps_three_passages() {
        for seed in 0..32 {
            let maze = Maze::generate(2, 2, Algorithm::RecursiveDivision, Some(seed), None)
                .expect("2x2 division should generate");
            assert_eq!(maze.walls.open_edge_count(), 3, "\n{}", maze.log());
        }
    }
}
