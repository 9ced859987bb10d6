use super::MazeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn opposite(self) -> Direction {
        Self::ALL[(self as usize + 2) % 4]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub fn new(x: usize, y: usize) -> Cell {
        Cell { x, y }
    }

    pub fn is_on_boundary(&self, width: usize, height: usize) -> bool {
        self.x == 0 || self.y == 0 || self.x + 1 == width || self.y + 1 == height
    }
}

// Two bits per cell: bit 0 is the "up" edge, bit 1 the "right" edge.
type Word = u32;
const CELLS_PER_WORD: usize = Word::BITS as usize / 2;

/// Open/closed state of every edge of a `width` x `height` grid graph.
///
/// Each cell only stores its "up" and "right" edges. Queries and mutations
/// of "down" and "left" are redirected to the neighbour that owns the edge,
/// and edges leaving the grid are permanently closed.
#[derive(Clone, PartialEq, Eq)]
pub struct WallGrid {
    width: usize,
    height: usize,
    words: Vec<Word>,
}

impl WallGrid {
    pub fn new(width: usize, height: usize) -> Result<Self, MazeError> {
        if width == 0 || height == 0 {
            return Err(MazeError::InvalidDimensions {
                width,
                height,
                minimum: 1,
            });
        }

        let too_large = MazeError::TooLarge { width, height };
        let cells = width.checked_mul(height).ok_or(too_large.clone())?;
        let len = cells.div_ceil(CELLS_PER_WORD);

        let mut words = Vec::new();
        words.try_reserve_exact(len).map_err(|_| too_large)?;
        words.resize(len, 0);

        Ok(Self {
            width,
            height,
            words,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, cell: Cell) -> usize {
        debug_assert!(
            cell.x < self.width && cell.y < self.height,
            "cell coordinates are out of bounds"
        );

        cell.y * self.width + cell.x
    }

    pub fn cell_at(&self, index: usize) -> Cell {
        Cell::new(index % self.width, index / self.width)
    }

    pub fn neighbor(&self, cell: Cell, dir: Direction) -> Option<Cell> {
        let Cell { x, y } = cell;
        match dir {
            Direction::Up if y + 1 < self.height => Some(Cell::new(x, y + 1)),
            Direction::Right if x + 1 < self.width => Some(Cell::new(x + 1, y)),
            Direction::Down if y > 0 => Some(Cell::new(x, y - 1)),
            Direction::Left if x > 0 => Some(Cell::new(x - 1, y)),
            _ => None,
        }
    }

    pub fn open(&mut self, cell: Cell, dir: Direction) {
        if let Some((word, mask)) = self.locate(cell, dir) {
            self.words[word] |= mask;
        }
    }

    pub fn close(&mut self, cell: Cell, dir: Direction) {
        if let Some((word, mask)) = self.locate(cell, dir) {
            self.words[word] &= !mask;
        }
    }

    pub fn is_open(&self, cell: Cell, dir: Direction) -> bool {
        self.locate(cell, dir)
            .is_some_and(|(word, mask)| self.words[word] & mask != 0)
    }

    /// Opens every edge between two cells of the grid.
    pub fn open_all(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = Cell::new(x, y);
                self.open(cell, Direction::Up);
                self.open(cell, Direction::Right);
            }
        }
    }

    pub fn open_edge_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn as_words(&self) -> &[u32] {
        &self.words
    }

    fn locate(&self, cell: Cell, dir: Direction) -> Option<(usize, Word)> {
        let neighbor = self.neighbor(cell, dir)?;
        let (owner, bit) = match dir {
            Direction::Up => (cell, 0),
            Direction::Right => (cell, 1),
            Direction::Down => (neighbor, 0),
            Direction::Left => (neighbor, 1),
        };

        let i = self.index(owner);
        let shift = (i % CELLS_PER_WORD) * 2 + bit;
        Some((i / CELLS_PER_WORD, 1 << shift))
    }
}
