//! Picks the entrance and exit of a finished maze.
//!
//! Candidates are the maze's corners. The walls form a tree, so one
//! depth-first walk from the top-left cell is enough to measure the path
//! between every pair of corners: when the second corner of a pair is
//! reached, the shallowest depth the walk passed through since the first
//! corner is the depth of the two corners' common ancestor.

use super::maker::filled;
use super::{Cell, Direction, MazeError, WallGrid};
use crate::progress::Counter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Solution {
    pub entrance: Cell,
    pub exit: Cell,
    /// Number of moves from entrance to exit.
    pub distance: usize,
    /// Decision points met walking from the entrance to the exit.
    pub branches: usize,
}

/// A corner reached by the walk.
#[derive(Clone, Copy)]
struct Sighting {
    corner: usize,
    depth: usize,
    /// Forks on the walk's path strictly above this corner.
    forks_above: usize,
    /// Open passages out of this corner.
    passages: usize,
    /// Shallowest depth visited since this corner.
    low: usize,
}

pub fn corners(width: usize, height: usize) -> Vec<Cell> {
    let mut corners = Vec::with_capacity(4);
    for cell in [
        Cell::new(0, 0),
        Cell::new(width - 1, 0),
        Cell::new(0, height - 1),
        Cell::new(width - 1, height - 1),
    ] {
        if !corners.contains(&cell) {
            corners.push(cell);
        }
    }
    corners
}

/// Walks every cell once, counting a progress step per cell.
///
/// Fails with [`MazeError::Disconnected`] when some cell cannot be reached,
/// which only happens if a maker left the maze in pieces.
pub fn find_exits(walls: &WallGrid, progress: Counter<'_>) -> Result<Solution, MazeError> {
    let total = walls.len();
    let corners = corners(walls.width(), walls.height());
    let too_large = || MazeError::TooLarge {
        width: walls.width(),
        height: walls.height(),
    };

    let mut visited = filled(total, false).ok_or_else(too_large)?;
    let mut sightings: Vec<Sighting> = Vec::with_capacity(corners.len());
    let mut best: Option<Solution> = None;

    // Directions taken from the start. `forks[d]` counts the forks among
    // the cells at depths below `d` on the current path.
    let mut stack: Vec<Direction> = Vec::new();
    let mut forks: Vec<usize> = vec![0];

    let mut p = Cell::new(0, 0);
    let mut visited_count = 0;

    loop {
        let i = walls.index(p);
        if !visited[i] {
            visited[i] = true;
            visited_count += 1;
            progress.add(1);

            let depth = stack.len();
            let passages = passage_count(walls, p);
            // A cell passed through is a fork when it offers a way besides
            // the one in and the one out.
            forks.push(forks[depth] + usize::from(passages >= 3));

            if let Some(corner) = corners.iter().position(|&c| c == p) {
                let current = Sighting {
                    corner,
                    depth,
                    forks_above: forks[depth],
                    passages,
                    low: depth,
                };
                for sighting in &sightings {
                    let candidate = join(&corners, &forks, sighting, &current);
                    if best.is_none_or(|b| candidate.distance > b.distance) {
                        best = Some(candidate);
                    }
                }
                sightings.push(current);
            }
        }

        let next = Direction::ALL
            .into_iter()
            .find(|&dir| is_unvisited_passage(walls, &visited, p, dir));

        if let Some(dir) = next {
            p = step(walls, p, dir);
            stack.push(dir);
        } else if let Some(dir) = stack.pop() {
            p = step(walls, p, dir.opposite());
            forks.pop();
            let depth = stack.len();
            for sighting in &mut sightings {
                sighting.low = sighting.low.min(depth);
            }
        } else {
            break;
        }
    }

    if visited_count != total {
        return Err(MazeError::Disconnected {
            visited: visited_count,
            total,
        });
    }

    Ok(best.unwrap_or(Solution {
        entrance: corners[0],
        exit: corners[0],
        distance: 0,
        branches: 0,
    }))
}

/// Measures the path from an earlier corner to the corner just reached.
///
/// Both paths from the start share the cells down to depth `earlier.low`,
/// the corners' common ancestor, so the forks between them are read off
/// `forks`. The entrance is a decision when it has two passages; the exit
/// never is.
fn join(corners: &[Cell], forks: &[usize], earlier: &Sighting, current: &Sighting) -> Solution {
    let low = earlier.low;

    // Cells strictly between the common ancestor and each corner, plus the
    // ancestor itself unless it is the earlier corner.
    let mut branches = forks[current.depth] - forks[low + 1];
    if low < earlier.depth {
        branches += earlier.forks_above - forks[low];
    }

    let (entrance, exit) = if earlier.corner < current.corner {
        (earlier, current)
    } else {
        (current, earlier)
    };
    branches += usize::from(entrance.passages >= 2);

    Solution {
        entrance: corners[entrance.corner],
        exit: corners[exit.corner],
        distance: (earlier.depth - low) + (current.depth - low),
        branches,
    }
}

fn passage_count(walls: &WallGrid, p: Cell) -> usize {
    Direction::ALL
        .into_iter()
        .filter(|&dir| walls.is_open(p, dir))
        .count()
}

fn is_unvisited_passage(walls: &WallGrid, visited: &[bool], p: Cell, dir: Direction) -> bool {
    walls.is_open(p, dir)
        && walls
            .neighbor(p, dir)
            .is_some_and(|next| !visited[walls.index(next)])
}

fn step(walls: &WallGrid, p: Cell, dir: Direction) -> Cell {
    walls
        .neighbor(p, dir)
        .expect("open passages should lead to a cell")
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::maze::{Algorithm, Maze};
    use crate::progress::ProgressMonitor;

    fn analyze(walls: &WallGrid) -> Result<Solution, MazeError> {
        ProgressMonitor::new(None, 0).watch(1, |counters| find_exits(walls, counters[0]))
    }

    fn carve(walls: &mut WallGrid, from: Cell, dirs: &[Direction]) {
        let mut p = from;
        for &dir in dirs {
            walls.open(p, dir);
            p = walls.neighbor(p, dir).unwrap();
        }
    }

    /// Cells from `from` to `to` by breadth-first search, both included.
    fn path(walls: &WallGrid, from: Cell, to: Cell) -> Vec<Cell> {
        let mut parent: Vec<Option<Cell>> = vec![None; walls.len()];
        let mut queue = std::collections::VecDeque::from([from]);
        parent[walls.index(from)] = Some(from);
        while let Some(p) = queue.pop_front() {
            for dir in Direction::ALL {
                if let Some(next) = walls.neighbor(p, dir).filter(|_| walls.is_open(p, dir)) {
                    if parent[walls.index(next)].is_none() {
                        parent[walls.index(next)] = Some(p);
                        queue.push_back(next);
                    }
                }
            }
        }

        let mut cells = vec![to];
        let mut p = to;
        while p != from {
            p = parent[walls.index(p)].unwrap();
            cells.push(p);
        }
        cells.reverse();
        cells
    }

    fn distance(walls: &WallGrid, from: Cell, to: Cell) -> usize {
        path(walls, from, to).len() - 1
    }

    /// Decision points met walking from `from` to `to`.
    fn decisions(walls: &WallGrid, from: Cell, to: Cell) -> usize {
        let cells = path(walls, from, to);
        let interior = &cells[1..cells.len().saturating_sub(1).max(1)];
        usize::from(from != to && passage_count(walls, from) >= 2)
            + interior
                .iter()
                .filter(|&&p| passage_count(walls, p) >= 3)
                .count()
    }

    #[test]
    fn corners_are_deduplicated() {
        assert_eq!(corners(1, 1), vec![Cell::new(0, 0)]);
        assert_eq!(corners(1, 4), vec![Cell::new(0, 0), Cell::new(0, 3)]);
        assert_eq!(corners(3, 2).len(), 4);
    }

    #[test]
    fn serpentine_picks_the_farthest_pair() {
        // Rows joined at alternating ends:
        // (0,0) -> (2,0) -> (2,1) -> (0,1) -> (0,2) -> (2,2)
        let mut walls = WallGrid::new(3, 3).unwrap();
        use Direction::*;
        carve(
            &mut walls,
            Cell::new(0, 0),
            &[Right, Right, Up, Left, Left, Up, Right, Right],
        );

        let solution = analyze(&walls).unwrap();

        assert_eq!(solution.entrance, Cell::new(0, 0));
        assert_eq!(solution.exit, Cell::new(2, 2));
        assert_eq!(solution.distance, 8);
        assert_eq!(solution.branches, 0);
    }

    #[test]
    fn comb_counts_forks_on_the_solution_path() {
        // A spine along the bottom row with a tooth rising from every cell.
        let mut walls = WallGrid::new(3, 3).unwrap();
        use Direction::*;
        carve(&mut walls, Cell::new(0, 0), &[Right, Right]);
        for x in 0..3 {
            carve(&mut walls, Cell::new(x, 0), &[Up, Up]);
        }

        let solution = analyze(&walls).unwrap();

        assert_eq!(solution.distance, 6);
        assert_eq!(solution.entrance, Cell::new(0, 2));
        assert_eq!(solution.exit, Cell::new(2, 2));
        // Only (1,0) offers a way off the path; (0,0) is a bend.
        assert_eq!(solution.branches, 1);
    }

    #[test]
    fn corridor_through_the_start_has_no_branches() {
        // (1,0) -> (0,0) -> (0,1) -> (1,1)
        let mut walls = WallGrid::new(2, 2).unwrap();
        use Direction::*;
        carve(&mut walls, Cell::new(1, 0), &[Left, Up, Right]);

        let solution = analyze(&walls).unwrap();

        assert_eq!(solution.entrance, Cell::new(1, 0));
        assert_eq!(solution.exit, Cell::new(1, 1));
        assert_eq!(solution.distance, 3);
        assert_eq!(solution.branches, 0);
    }

    #[test]
    fn entrance_with_two_passages_is_a_branch() {
        // (1,1) -> (1,0) -> (0,0) -> (0,1) -> (0,2) -> (1,2), with the
        // entrance (1,0) also leading up to the dead end (1,1).
        let mut walls = WallGrid::new(2, 3).unwrap();
        use Direction::*;
        carve(&mut walls, Cell::new(1, 1), &[Down, Left, Up, Up, Right]);

        let solution = analyze(&walls).unwrap();

        assert_eq!(solution.entrance, Cell::new(1, 0));
        assert_eq!(solution.exit, Cell::new(1, 2));
        assert_eq!(solution.distance, 4);
        assert_eq!(solution.branches, 1);
    }

    #[test]
    fn disconnected_walls_are_reported() {
        let mut walls = WallGrid::new(2, 2).unwrap();
        walls.open(Cell::new(0, 0), Direction::Right);

        assert_eq!(
            analyze(&walls),
            Err(MazeError::Disconnected {
                visited: 2,
                total: 4
            })
        );
    }

    #[test]
    fn single_cell_uses_it_for_both_ends() {
        let walls = WallGrid::new(1, 1).unwrap();
        let solution = analyze(&walls).unwrap();
        assert_eq!(solution.entrance, Cell::new(0, 0));
        assert_eq!(solution.exit, Cell::new(0, 0));
        assert_eq!(solution.distance, 0);
    }

    #[test]
    fn chosen_distance_matches_breadth_first_search() {
        for seed in 0..32 {
            let maze = Maze::generate(9, 7, Algorithm::Wilson, Some(seed), None).unwrap();
            let Solution {
                entrance,
                exit,
                distance: found,
                ..
            } = maze.solution;

            assert_ne!(entrance, exit);
            assert!(entrance.is_on_boundary(9, 7) && exit.is_on_boundary(9, 7));
            assert_eq!(found, distance(&maze.walls, entrance, exit));

            let longest = corners(9, 7)
                .iter()
                .flat_map(|&a| corners(9, 7).into_iter().map(move |b| (a, b)))
                .map(|(a, b)| distance(&maze.walls, a, b))
                .max()
                .unwrap();
            assert_eq!(found, longest);
        }
    }

    #[test]
    fn branches_match_a_walk_along_the_path() {
        for algorithm in Algorithm::iter() {
            for seed in 0..16 {
                let maze = Maze::generate(8, 6, algorithm, Some(seed), None).unwrap();
                let Solution {
                    entrance,
                    exit,
                    branches,
                    ..
                } = maze.solution;
                assert_eq!(
                    branches,
                    decisions(&maze.walls, entrance, exit),
                    "{algorithm} seed {seed}"
                );
            }
        }
    }
}
