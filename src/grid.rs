//! Grid geometry: blocks, the board they live on, and the occupancy projection.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Columns on the board.
pub const GRID_WIDTH: usize = 8;
/// Rows on the board. Row 0 is the top, row `GRID_HEIGHT - 1` the floor.
pub const GRID_HEIGHT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seed record for one block: what a board file or the authority hands over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub id: u32,
    pub x: usize,
    pub y: usize,
    pub width: usize,
}

/// A live block. `x` is only fractional while the block is being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub x: f64,
    pub y: usize,
    pub width: usize,
}

impl Block {
    pub fn new(id: u32, x: usize, y: usize, width: usize) -> Self {
        Self {
            id: BlockId(id),
            x: x as f64,
            y,
            width,
        }
    }

    /// Nearest integer column (the resting column once a drag settles).
    #[inline]
    pub fn column(&self) -> usize {
        self.x.round().max(0.0) as usize
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width as f64
    }

    /// True if the half-open span `[x, x + width)` shares any width with this block.
    #[inline]
    pub fn overlaps_span(&self, x: f64, width: usize) -> bool {
        x < self.right() && x + width as f64 > self.x
    }

    pub fn spec(&self) -> BlockSpec {
        BlockSpec {
            id: self.id.0,
            x: self.column(),
            y: self.y,
            width: self.width,
        }
    }
}

impl From<BlockSpec> for Block {
    fn from(spec: BlockSpec) -> Self {
        Self::new(spec.id, spec.x, spec.y, spec.width)
    }
}

/// Rejected seed data. Names the offending block(s).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInitialState {
    #[error("block {id} has zero width")]
    ZeroWidth { id: u32 },
    #[error("block {id} at column {x} with width {width} does not fit in {GRID_WIDTH} columns")]
    ColumnOutOfBounds { id: u32, x: usize, width: usize },
    #[error("block {id} sits on row {y}, outside the {GRID_HEIGHT}-row grid")]
    RowOutOfBounds { id: u32, y: usize },
    #[error("block id {0} is used more than once")]
    DuplicateId(u32),
    #[error("blocks {first} and {second} overlap at row {row}, column {column}")]
    Overlap {
        first: u32,
        second: u32,
        row: usize,
        column: usize,
    },
}

/// The set of live blocks. Iteration order is the seed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    blocks: Vec<Block>,
}

impl Board {
    /// Build a board from seed records, rejecting anything that breaks the grid invariants.
    pub fn from_specs(specs: &[BlockSpec]) -> Result<Self, InvalidInitialState> {
        let mut ids = HashSet::with_capacity(specs.len());
        let mut cells = [[None::<u32>; GRID_WIDTH]; GRID_HEIGHT];
        for spec in specs {
            if spec.width == 0 {
                return Err(InvalidInitialState::ZeroWidth { id: spec.id });
            }
            if spec.x + spec.width > GRID_WIDTH {
                return Err(InvalidInitialState::ColumnOutOfBounds {
                    id: spec.id,
                    x: spec.x,
                    width: spec.width,
                });
            }
            if spec.y >= GRID_HEIGHT {
                return Err(InvalidInitialState::RowOutOfBounds {
                    id: spec.id,
                    y: spec.y,
                });
            }
            if !ids.insert(spec.id) {
                return Err(InvalidInitialState::DuplicateId(spec.id));
            }
            for column in spec.x..spec.x + spec.width {
                if let Some(first) = cells[spec.y][column] {
                    return Err(InvalidInitialState::Overlap {
                        first,
                        second: spec.id,
                        row: spec.y,
                        column,
                    });
                }
                cells[spec.y][column] = Some(spec.id);
            }
        }
        Ok(Self {
            blocks: specs.iter().copied().map(Block::from).collect(),
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// Block covering the given cell, using live (possibly fractional) positions.
    pub fn block_at(&self, row: usize, column: usize) -> Option<BlockId> {
        let centre = column as f64 + 0.5;
        self.blocks
            .iter()
            .find(|b| b.y == row && centre >= b.x && centre < b.right())
            .map(|b| b.id)
    }

    /// Fresh occupancy projection. Never cached: always reflects the current blocks.
    pub fn occupancy(&self) -> Occupancy {
        Occupancy::from_blocks(&self.blocks)
    }

    pub fn row_is_complete(&self, row: usize) -> bool {
        self.occupancy().row_is_complete(row)
    }

    pub fn specs(&self) -> Vec<BlockSpec> {
        self.blocks.iter().map(Block::spec).collect()
    }
}

/// Cell matrix: `cells[row][column]` holds the id of the block covering that cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    cells: [[Option<BlockId>; GRID_WIDTH]; GRID_HEIGHT],
}

impl Occupancy {
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut cells = [[None; GRID_WIDTH]; GRID_HEIGHT];
        for block in blocks {
            let Some(row) = cells.get_mut(block.y) else {
                continue;
            };
            let start = block.column();
            for cell in row.iter_mut().skip(start).take(block.width) {
                *cell = Some(block.id);
            }
        }
        Self { cells }
    }

    #[inline]
    pub fn get(&self, row: usize, column: usize) -> Option<BlockId> {
        self.cells.get(row).and_then(|r| r.get(column)).copied().flatten()
    }

    /// True iff every cell in `row` is taken. Rows outside the grid are never complete.
    pub fn row_is_complete(&self, row: usize) -> bool {
        self.cells
            .get(row)
            .is_some_and(|r| r.iter().all(Option::is_some))
    }

    pub fn complete_rows(&self) -> Vec<usize> {
        (0..GRID_HEIGHT)
            .filter(|&row| self.row_is_complete(row))
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<BlockId>; GRID_WIDTH]> {
        self.cells.iter()
    }
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: Vec<String> = row
                .iter()
                .map(|cell| cell.map_or_else(|| ".".to_string(), |id| id.to_string()))
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: u32, x: usize, y: usize, width: usize) -> BlockSpec {
        BlockSpec { id, x, y, width }
    }

    #[test]
    fn occupancy_marks_every_covered_cell() {
        let board = Board::from_specs(&[spec(1, 0, 9, 2), spec(2, 5, 9, 3), spec(3, 1, 4, 1)]).unwrap();
        let occ = board.occupancy();
        assert_eq!(occ.get(9, 0), Some(BlockId(1)));
        assert_eq!(occ.get(9, 1), Some(BlockId(1)));
        assert_eq!(occ.get(9, 2), None);
        assert_eq!(occ.get(9, 7), Some(BlockId(2)));
        assert_eq!(occ.get(4, 1), Some(BlockId(3)));
        assert_eq!(occ.get(20, 0), None);
    }

    #[test]
    fn full_row_is_complete() {
        let board = Board::from_specs(&[spec(1, 0, 9, 2), spec(2, 2, 9, 6)]).unwrap();
        assert!(board.row_is_complete(9));
        assert!(!board.row_is_complete(8));
        assert!(!board.row_is_complete(GRID_HEIGHT));
        assert_eq!(board.occupancy().complete_rows(), vec![9]);
    }

    #[test]
    fn rejects_overlapping_seed() {
        let err = Board::from_specs(&[spec(1, 0, 3, 3), spec(2, 2, 3, 2)]).unwrap_err();
        assert_eq!(
            err,
            InvalidInitialState::Overlap {
                first: 1,
                second: 2,
                row: 3,
                column: 2
            }
        );
    }

    #[test]
    fn rejects_out_of_bounds_and_bad_ids() {
        assert!(matches!(
            Board::from_specs(&[spec(1, 7, 0, 2)]),
            Err(InvalidInitialState::ColumnOutOfBounds { id: 1, .. })
        ));
        assert!(matches!(
            Board::from_specs(&[spec(1, 0, GRID_HEIGHT, 1)]),
            Err(InvalidInitialState::RowOutOfBounds { id: 1, .. })
        ));
        assert_eq!(
            Board::from_specs(&[spec(4, 0, 0, 0)]),
            Err(InvalidInitialState::ZeroWidth { id: 4 })
        );
        assert_eq!(
            Board::from_specs(&[spec(1, 0, 0, 1), spec(1, 3, 0, 1)]),
            Err(InvalidInitialState::DuplicateId(1))
        );
    }

    #[test]
    fn block_at_follows_fractional_position() {
        let mut board = Board::from_specs(&[spec(1, 2, 5, 2)]).unwrap();
        assert_eq!(board.block_at(5, 3), Some(BlockId(1)));
        assert_eq!(board.block_at(5, 4), None);
        board.block_mut(BlockId(1)).unwrap().x = 2.6;
        assert_eq!(board.block_at(5, 4), Some(BlockId(1)));
        assert_eq!(board.block_at(5, 2), None);
    }

    #[test]
    fn display_renders_ids_and_gaps() {
        let board = Board::from_specs(&[spec(7, 1, 0, 2)]).unwrap();
        let text = board.occupancy().to_string();
        assert_eq!(text.lines().next(), Some(". 7 7 . . . . ."));
        assert_eq!(text.lines().count(), GRID_HEIGHT);
    }
}
