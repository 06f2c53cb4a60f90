//! Row clearing and the settle tracker that decides when a clear pass may run.

use crate::grid::{BlockId, Board};
use tracing::info;

/// What a clear pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Rows that were complete before the pass, top to bottom.
    pub rows: Vec<usize>,
    /// Ids of the blocks deleted, in board order.
    pub removed: Vec<BlockId>,
}

impl ClearReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Delete every block sitting on a complete row. Rows above are not shifted:
/// gravity fills the gap on later ticks.
pub fn clear_complete_rows(board: &mut Board) -> ClearReport {
    let rows = board.occupancy().complete_rows();
    if rows.is_empty() {
        return ClearReport::default();
    }
    let mut removed = Vec::new();
    board.blocks_mut().retain(|block| {
        let on_complete_row = rows.contains(&block.y);
        if on_complete_row {
            removed.push(block.id);
        }
        !on_complete_row
    });
    info!(rows = ?rows, blocks = removed.len(), "cleared complete rows");
    ClearReport { rows, removed }
}

/// Tracks the moving/stable signal across evaluations.
///
/// A clear pass is allowed once per settle: the current evaluation and the one
/// before it must both be stable, and something must have changed since the
/// last pass (movement, or a re-arm after a committed slide or resync).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTracker {
    moving: bool,
    was_moving: bool,
    armed: bool,
}

impl Default for SettleTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SettleTracker {
    /// A fresh board counts as moving until two stable evaluations have been seen.
    pub fn new() -> Self {
        Self {
            moving: true,
            was_moving: true,
            armed: true,
        }
    }

    /// Record one evaluation. Returns `true` when a clear pass should run now.
    pub fn observe(&mut self, moving: bool) -> bool {
        self.was_moving = self.moving;
        self.moving = moving;
        if moving {
            self.armed = true;
        }
        if self.is_settled() && self.armed {
            self.armed = false;
            return true;
        }
        false
    }

    /// The board changed outside gravity; require a fresh double confirmation.
    pub fn rearm(&mut self) {
        self.moving = true;
        self.was_moving = true;
        self.armed = true;
    }

    /// The board changed between ticks without changing the stable signal
    /// (a committed slide): allow one more clear pass once settled.
    pub fn mark_dirty(&mut self) {
        self.armed = true;
    }

    /// Result of the most recent evaluation.
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn is_settled(&self) -> bool {
        !self.moving && !self.was_moving
    }
}
