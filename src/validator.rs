//! Collision checks for horizontal slides.
//!
//! [`is_blocked`] is the drag-time check: it compares the proposed destination
//! against the column the slide started from, so with the row frozen during a
//! drag it covers everything between the two. [`span_is_clear`] is the strict
//! swept check used where a move arrives as a single jump (the authority).

use crate::grid::{Block, BlockId};

/// Whether sliding the block `moving` (of `width` cells, in `row`) from `current` to
/// `target` is obstructed by another block of that row.
///
/// Rightward: blocked iff some other block's left edge lies in `[current + width, target + width)`.
/// Leftward: blocked iff some other block ends past `target` and starts at or before `current`.
pub fn is_blocked(
    row: usize,
    current: f64,
    target: f64,
    width: usize,
    blocks: &[Block],
    moving: BlockId,
) -> bool {
    let width = width as f64;
    let mut others = blocks.iter().filter(|b| b.y == row && b.id != moving);
    if target > current {
        others.any(|b| b.x >= current + width && b.x < target + width)
    } else {
        others.any(|b| b.right() > target && b.x <= current)
    }
}

/// True if every cell the block sweeps through between `from` and `to` is free of other blocks.
pub fn span_is_clear(
    row: usize,
    from: usize,
    to: usize,
    width: usize,
    blocks: &[Block],
    moving: BlockId,
) -> bool {
    let start = from.min(to) as f64;
    let span = from.abs_diff(to) + width;
    !blocks
        .iter()
        .filter(|b| b.y == row && b.id != moving)
        .any(|b| b.overlaps_span(start, span))
}
