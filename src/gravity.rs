//! Tick-paced gravity: every block drops at most one row per tick.

use crate::grid::{Block, Board, GRID_HEIGHT};

/// Empty rows directly below `block` before the floor or the nearest block sharing its columns.
pub fn fall_distance(block: &Block, blocks: &[Block]) -> usize {
    let floor = GRID_HEIGHT - 1 - block.y.min(GRID_HEIGHT - 1);
    (block.y + 1..GRID_HEIGHT)
        .find(|&row| collides(block, row, blocks))
        .map_or(floor, |row| row - block.y - 1)
}

fn collides(block: &Block, row: usize, blocks: &[Block]) -> bool {
    blocks
        .iter()
        .any(|other| other.id != block.id && other.y == row && other.overlaps_span(block.x, block.width))
}

/// One gravity step over a snapshot. Every block is measured against the same pre-tick
/// positions, so a block resting on a falling one waits a tick before following it.
pub fn step(blocks: &[Block]) -> Vec<Block> {
    blocks
        .iter()
        .map(|block| {
            if fall_distance(block, blocks) > 0 {
                Block {
                    y: block.y + 1,
                    ..*block
                }
            } else {
                *block
            }
        })
        .collect()
}

/// True if any block present in both sets changed column or row.
pub fn positions_changed(before: &[Block], after: &[Block]) -> bool {
    before.iter().any(|b| {
        after
            .iter()
            .find(|a| a.id == b.id)
            .is_none_or(|a| a.x != b.x || a.y != b.y)
    })
}

impl Board {
    /// Apply one gravity step in place. Returns `true` if anything moved.
    pub fn apply_gravity(&mut self) -> bool {
        let next = step(self.blocks());
        let moving = positions_changed(self.blocks(), &next);
        *self.blocks_mut() = next;
        moving
    }

    /// Step gravity until nothing moves. Returns the number of moving steps.
    pub fn settle(&mut self) -> usize {
        let mut steps = 0;
        while self.apply_gravity() {
            steps += 1;
        }
        steps
    }
}
