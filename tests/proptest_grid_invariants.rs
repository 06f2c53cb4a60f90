//! Property-based invariant tests for the grid engine.
//!
//! 1. No two blocks ever share a cell, through any mix of drags and ticks.
//! 2. A rightward slide is blocked exactly when the reverse leftward slide is,
//!    for endpoints that overlap nothing.
//! 3. Gravity comes to rest within `GRID_HEIGHT` ticks.
//! 4. A clear pass leaves no complete row and removes only blocks from complete rows.
//! 5. Seeded layouts are valid and start with no complete row.

use std::time::Instant;

use proptest::prelude::*;
use slidetui::Difficulty;
use slidetui::drag::DragState;
use slidetui::grid::{Block, BlockSpec, Board, GRID_HEIGHT, GRID_WIDTH};
use slidetui::line_clear::{SettleTracker, clear_complete_rows};
use slidetui::seed;
use slidetui::validator::is_blocked;

const CELL: f64 = 40.0;
const EPSILON: f64 = 1e-9;

// ── Helpers ─────────────────────────────────────────────────────────────

/// Up to four blocks per row, packed left to right with random gaps.
fn board_specs() -> impl Strategy<Value = Vec<BlockSpec>> {
    let row = proptest::collection::vec((0usize..3, 1usize..=4), 0..4);
    proptest::collection::vec(row, GRID_HEIGHT).prop_map(|rows| {
        let mut specs = Vec::new();
        for (y, row) in rows.into_iter().enumerate() {
            let mut x = 0;
            for (gap, width) in row {
                x += gap;
                if x + width > GRID_WIDTH {
                    break;
                }
                specs.push(BlockSpec {
                    id: specs.len() as u32 + 1,
                    x,
                    y,
                    width,
                });
                x += width;
            }
        }
        specs
    })
}

/// A mover of `width` with two valid endpoints `a < b`, plus an optional
/// `(column, width)` blocker on the same row overlapping neither endpoint.
fn slide_case() -> impl Strategy<Value = (usize, usize, usize, Option<(usize, usize)>)> {
    (1usize..=4, 1usize..=4)
        .prop_flat_map(|(width, kw)| {
            let last = GRID_WIDTH - width;
            (Just(width), Just(kw), 0..last)
                .prop_flat_map(move |(width, kw, a)| (Just(width), Just(kw), Just(a), a + 1..=last))
        })
        .prop_flat_map(|(width, kw, a, b)| {
            let clear_of = |x: usize, kx: usize| kx + kw <= x || x + width <= kx;
            let free: Vec<usize> = (0..=GRID_WIDTH - kw)
                .filter(|&kx| clear_of(a, kx) && clear_of(b, kx))
                .collect();
            let blocker = if free.is_empty() {
                Just(None::<usize>).boxed()
            } else {
                proptest::sample::select(free).prop_map(Some).boxed()
            };
            (
                Just(width),
                Just(a),
                Just(b),
                blocker.prop_map(move |kx| kx.map(|kx| (kx, kw))),
            )
        })
}

#[derive(Debug, Clone)]
enum Op {
    Tick,
    Drag {
        pick: usize,
        pointer: Vec<i32>,
        cancel: bool,
    },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Tick),
        1 => (any::<usize>(), proptest::collection::vec(-400i32..400, 1..6), any::<bool>())
            .prop_map(|(pick, pointer, cancel)| Op::Drag { pick, pointer, cancel }),
    ]
}

fn check_no_overlap(board: &Board) -> Result<(), TestCaseError> {
    let blocks = board.blocks();
    for (i, a) in blocks.iter().enumerate() {
        prop_assert!(a.x >= -EPSILON && a.right() <= GRID_WIDTH as f64 + EPSILON, "{a:?} out of bounds");
        prop_assert!(a.y < GRID_HEIGHT);
        for b in &blocks[i + 1..] {
            if a.y == b.y {
                let apart = a.right() <= b.x + EPSILON || b.right() <= a.x + EPSILON;
                prop_assert!(apart, "{a:?} overlaps {b:?}");
            }
        }
    }
    Ok(())
}

fn run_drag(board: &mut Board, pick: usize, pointer: &[i32], cancel: bool) -> Result<(), TestCaseError> {
    if board.is_empty() {
        return Ok(());
    }
    let block = board.blocks()[pick % board.len()];
    let now = Instant::now();
    let mut drag = DragState::default();
    prop_assert!(drag.begin(board, block.id, 0.0, now));
    for &x in pointer {
        drag.drag_to(board, f64::from(x), CELL, now);
        check_no_overlap(board)?;
    }
    if cancel {
        drag.cancel(board);
        prop_assert_eq!(board.block(block.id).map(|b| b.x), Some(block.x));
    } else if let Some(intent) = drag.release(board) {
        prop_assert_eq!(intent.row, block.y);
        prop_assert_eq!(intent.start_column, block.column());
    }
    prop_assert!(!drag.is_dragging());
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Occupancy invariant
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn blocks_never_overlap(specs in board_specs(), ops in proptest::collection::vec(op(), 1..40)) {
        let mut board = Board::from_specs(&specs).unwrap();
        let mut tracker = SettleTracker::new();
        for op in ops {
            match op {
                Op::Tick => {
                    let moving = board.apply_gravity();
                    if tracker.observe(moving) {
                        clear_complete_rows(&mut board);
                    }
                }
                Op::Drag { pick, pointer, cancel } => {
                    run_drag(&mut board, pick, &pointer, cancel)?;
                    tracker.mark_dirty();
                }
            }
            check_no_overlap(&board)?;
            // Resting positions are whole columns, so the board round-trips through its specs.
            prop_assert!(Board::from_specs(&board.specs()).is_ok());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Validator symmetry
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn right_and_left_slides_agree((width, a, b, blocker) in slide_case()) {
        let mut row = vec![Block::new(1, a, 0, width)];
        if let Some((kx, kw)) = blocker {
            row.push(Block::new(2, kx, 0, kw));
        }
        let mover = row[0].id;
        let rightward = is_blocked(0, a as f64, b as f64, width, &row, mover);
        let leftward = is_blocked(0, b as f64, a as f64, width, &row, mover);
        prop_assert_eq!(rightward, leftward, "a={} b={} width={} blocker={:?}", a, b, width, blocker);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Convergence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn gravity_comes_to_rest_within_grid_height(specs in board_specs()) {
        let mut board = Board::from_specs(&specs).unwrap();
        let ticks = (1..=GRID_HEIGHT).find(|_| !board.apply_gravity());
        prop_assert!(ticks.is_some(), "still moving after {} ticks", GRID_HEIGHT);
        prop_assert!(!board.apply_gravity());
        prop_assert_eq!(board.len(), specs.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Row-clear exactness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clear_removes_exactly_the_complete_rows(specs in board_specs()) {
        let mut board = Board::from_specs(&specs).unwrap();
        let complete = board.occupancy().complete_rows();
        let report = clear_complete_rows(&mut board);

        prop_assert_eq!(&report.rows, &complete);
        prop_assert!(board.occupancy().complete_rows().is_empty());
        for id in &report.removed {
            let spec = specs.iter().find(|s| s.id == id.0).unwrap();
            prop_assert!(complete.contains(&spec.y));
        }
        for block in board.blocks() {
            prop_assert!(!complete.contains(&block.y));
        }
        prop_assert_eq!(board.len() + report.removed.len(), specs.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Seeded layouts
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn seeded_layouts_are_valid(level in 0usize..Difficulty::ALL.len(), seed in any::<u32>()) {
        let specs = seed::generate(Difficulty::ALL[level], seed);
        let board = Board::from_specs(&specs).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(board.occupancy().complete_rows().is_empty());
        prop_assert_eq!(seed::generate(Difficulty::ALL[level], seed), specs);
    }
}
