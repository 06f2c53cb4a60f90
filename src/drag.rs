//! Drag/slide interaction: turns pointer input into column commits.
//!
//! `Idle -> Dragging` on pointer-down over a block, `Dragging -> Dragging` on every
//! pointer move, and `Dragging -> Idle` through [`DragState::release`] (settle and
//! commit) or [`DragState::cancel`] (put the block back). Every open drag must end
//! through one of the two.

use crate::grid::{BlockId, Board, GRID_WIDTH};
use crate::submit::MoveIntent;
use crate::validator::is_blocked;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub block_id: BlockId,
    pub pointer_start_x: f64,
    pub initial_column: usize,
    pub last_input: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Result of one pointer move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragStep {
    /// The block now sits at this (continuous) column.
    Moved(f64),
    /// The candidate column was obstructed; the block stayed put.
    Blocked,
    /// No drag in progress, or the dragged block no longer exists.
    Ignored,
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging(_))
    }

    pub fn session(&self) -> Option<&DragSession> {
        match self {
            Self::Dragging(session) => Some(session),
            Self::Idle => None,
        }
    }

    /// Start dragging `block_id`. Returns `false` (and stays idle) if a drag is
    /// already open or the block does not exist.
    pub fn begin(&mut self, board: &Board, block_id: BlockId, pointer_x: f64, now: Instant) -> bool {
        if self.is_dragging() {
            return false;
        }
        let Some(block) = board.block(block_id) else {
            return false;
        };
        debug!(block = %block_id, column = block.column(), row = block.y, "drag started");
        *self = Self::Dragging(DragSession {
            block_id,
            pointer_start_x: pointer_x,
            initial_column: block.column(),
            last_input: now,
        });
        true
    }

    /// Follow the pointer. `cell_size` is pointer units per grid column.
    pub fn drag_to(&mut self, board: &mut Board, pointer_x: f64, cell_size: f64, now: Instant) -> DragStep {
        let Self::Dragging(session) = self else {
            return DragStep::Ignored;
        };
        session.last_input = now;
        let Some(block) = board.block(session.block_id).copied() else {
            return DragStep::Ignored;
        };
        let max_column = GRID_WIDTH.saturating_sub(block.width) as f64;
        let candidate = ((pointer_x - session.pointer_start_x) / cell_size + session.initial_column as f64)
            .max(0.0)
            .min(max_column);
        if is_blocked(
            block.y,
            session.initial_column as f64,
            candidate,
            block.width,
            board.blocks(),
            block.id,
        ) {
            return DragStep::Blocked;
        }
        if let Some(live) = board.block_mut(block.id) {
            live.x = candidate;
        }
        DragStep::Moved(candidate)
    }

    /// Settle the dragged block on its nearest column and end the drag.
    /// Returns the move intent when the column changed.
    pub fn release(&mut self, board: &mut Board) -> Option<MoveIntent> {
        let Self::Dragging(session) = std::mem::take(self) else {
            return None;
        };
        let block = board.block_mut(session.block_id)?;
        let column = block.column();
        block.x = column as f64;
        debug!(block = %session.block_id, from = session.initial_column, to = column, "drag released");
        (column != session.initial_column).then_some(MoveIntent {
            row: block.y,
            start_column: session.initial_column,
            final_column: column,
        })
    }

    /// Abort the drag and return the block to the column it started from.
    pub fn cancel(&mut self, board: &mut Board) {
        let Self::Dragging(session) = std::mem::take(self) else {
            return;
        };
        if let Some(block) = board.block_mut(session.block_id) {
            block.x = session.initial_column as f64;
        }
        debug!(block = %session.block_id, "drag cancelled");
    }

    /// True if the open drag has seen no pointer input for `timeout`.
    pub fn timed_out(&self, now: Instant, timeout: Duration) -> bool {
        self.session()
            .is_some_and(|s| now.saturating_duration_since(s.last_input) >= timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BlockSpec;

    const CELL: f64 = 40.0;

    fn board(specs: &[(u32, usize, usize, usize)]) -> Board {
        let specs: Vec<BlockSpec> = specs
            .iter()
            .map(|&(id, x, y, width)| BlockSpec { id, x, y, width })
            .collect();
        Board::from_specs(&specs).unwrap()
    }

    #[test]
    fn drag_follows_pointer_and_commits_rounded_column() {
        let now = Instant::now();
        let mut b = board(&[(1, 0, 9, 2)]);
        let mut drag = DragState::default();
        assert!(drag.begin(&b, BlockId(1), 100.0, now));
        assert_eq!(drag.drag_to(&mut b, 204.0, CELL, now), DragStep::Moved(2.6));
        assert!((b.blocks()[0].x - 2.6).abs() < 1e-9);
        let intent = drag.release(&mut b);
        assert_eq!(
            intent,
            Some(MoveIntent {
                row: 9,
                start_column: 0,
                final_column: 3
            })
        );
        assert!(b.blocks()[0].x.abs_diff_eq_int(3));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn drag_clamps_to_the_grid() {
        let now = Instant::now();
        let mut b = board(&[(1, 3, 0, 3)]);
        let mut drag = DragState::default();
        drag.begin(&b, BlockId(1), 0.0, now);
        assert_eq!(drag.drag_to(&mut b, 2000.0, CELL, now), DragStep::Moved(5.0));
        assert_eq!(drag.drag_to(&mut b, -2000.0, CELL, now), DragStep::Moved(0.0));
    }

    #[test]
    fn blocked_candidate_leaves_block_in_place() {
        let now = Instant::now();
        let mut b = board(&[(1, 0, 0, 2), (2, 4, 0, 2)]);
        let mut drag = DragState::default();
        drag.begin(&b, BlockId(1), 0.0, now);
        assert_eq!(drag.drag_to(&mut b, 60.0, CELL, now), DragStep::Moved(1.5));
        assert_eq!(drag.drag_to(&mut b, 120.0, CELL, now), DragStep::Blocked);
        assert!((b.blocks()[0].x - 1.5).abs() < 1e-9);
        assert_eq!(drag.release(&mut b).map(|m| m.final_column), Some(2));
    }

    #[test]
    fn release_in_place_emits_nothing() {
        let now = Instant::now();
        let mut b = board(&[(1, 4, 2, 1)]);
        let mut drag = DragState::default();
        drag.begin(&b, BlockId(1), 10.0, now);
        drag.drag_to(&mut b, 26.0, CELL, now);
        assert_eq!(drag.release(&mut b), None);
        assert!(b.blocks()[0].x.abs_diff_eq_int(4));
    }

    #[test]
    fn cancel_restores_initial_column() {
        let now = Instant::now();
        let mut b = board(&[(1, 1, 2, 2)]);
        let mut drag = DragState::default();
        drag.begin(&b, BlockId(1), 0.0, now);
        drag.drag_to(&mut b, 132.0, CELL, now);
        drag.cancel(&mut b);
        assert!(!drag.is_dragging());
        assert!(b.blocks()[0].x.abs_diff_eq_int(1));
    }

    #[test]
    fn second_begin_is_refused_while_dragging() {
        let now = Instant::now();
        let b = board(&[(1, 0, 0, 1), (2, 3, 0, 1)]);
        let mut drag = DragState::default();
        assert!(drag.begin(&b, BlockId(1), 0.0, now));
        assert!(!drag.begin(&b, BlockId(2), 0.0, now));
        assert_eq!(drag.session().map(|s| s.block_id), Some(BlockId(1)));
        assert!(!DragState::default().begin(&b, BlockId(9), 0.0, now));
    }

    #[test]
    fn idle_drag_times_out() {
        let start = Instant::now();
        let b = board(&[(1, 0, 0, 1)]);
        let mut drag = DragState::default();
        drag.begin(&b, BlockId(1), 0.0, start);
        let timeout = Duration::from_millis(500);
        assert!(!drag.timed_out(start + Duration::from_millis(499), timeout));
        assert!(drag.timed_out(start + timeout, timeout));
    }

    trait ColumnEq {
        fn abs_diff_eq_int(self, column: usize) -> bool;
    }

    impl ColumnEq for f64 {
        fn abs_diff_eq_int(self, column: usize) -> bool {
            (self - column as f64).abs() < 1e-9
        }
    }
}
