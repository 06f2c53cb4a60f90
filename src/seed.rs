//! Deterministic starting layouts for offline play and demos.

use crate::Difficulty;
use crate::grid::{BlockSpec, GRID_HEIGHT, GRID_WIDTH};

/// Widest block the generator produces.
const MAX_BLOCK_WIDTH: usize = 4;

/// Small LCG so a given seed always yields the same board.
#[derive(Debug, Clone)]
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12345);
        self.0 >> 16
    }

    fn below(&mut self, n: u32) -> u32 {
        self.next() % n.max(1)
    }

    /// Index in `0..n`, for small counts.
    fn index_below(&mut self, n: usize) -> usize {
        (self.next() as usize) % n.max(1)
    }
}

/// Number of pre-filled rows for a difficulty.
pub fn filled_rows(difficulty: Difficulty) -> usize {
    (2 + difficulty.level() as usize / 2).min(GRID_HEIGHT - 1)
}

/// Build a layout: the bottom rows are filled with blocks and gaps, never a
/// complete row. Ids run from 1 in generation order. Always a valid initial state.
pub fn generate(difficulty: Difficulty, seed: u32) -> Vec<BlockSpec> {
    let mut rng = Lcg(seed ^ 0x5EED_0000 ^ u32::from(difficulty.level()));
    // Higher levels leave fewer gaps (percent chance of a gap at each column).
    let gap_chance = 45u32.saturating_sub(4 * u32::from(difficulty.level()));
    let mut specs = Vec::new();
    let mut next_id = 1u32;
    for y in (GRID_HEIGHT - filled_rows(difficulty))..GRID_HEIGHT {
        let row_start = specs.len();
        let mut x = 0;
        while x < GRID_WIDTH {
            if rng.below(100) < gap_chance {
                x += 1;
                continue;
            }
            let room = (GRID_WIDTH - x).min(MAX_BLOCK_WIDTH);
            let width = 1 + rng.index_below(room);
            specs.push(BlockSpec {
                id: next_id,
                x,
                y,
                width,
            });
            next_id += 1;
            x += width;
        }
        let covered: usize = specs[row_start..].iter().map(|s| s.width).sum();
        if covered == GRID_WIDTH {
            // Open a hole by trimming or dropping the widest block of the row.
            let Some(widest) = (row_start..specs.len()).max_by_key(|&i| specs[i].width) else {
                continue;
            };
            if specs[widest].width > 1 {
                specs[widest].width -= 1;
            } else {
                specs.remove(widest);
            }
        }
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Board;

    #[test]
    fn same_seed_same_board() {
        assert_eq!(generate(Difficulty::Medium, 7), generate(Difficulty::Medium, 7));
    }

    #[test]
    fn every_difficulty_and_seed_yields_a_valid_board_without_full_rows() {
        for difficulty in Difficulty::ALL {
            for seed in 0..64 {
                let specs = generate(difficulty, seed);
                let board = Board::from_specs(&specs).unwrap_or_else(|e| {
                    panic!("{difficulty:?}/{seed}: {e}");
                });
                assert!(board.occupancy().complete_rows().is_empty());
                let top = GRID_HEIGHT - filled_rows(difficulty);
                assert!(specs.iter().all(|s| s.y >= top));
            }
        }
    }

    #[test]
    fn index_below_stays_in_range() {
        let mut rng = Lcg(42);
        for n in 1..=MAX_BLOCK_WIDTH {
            assert!((0..200).all(|_| rng.index_below(n) < n));
        }
        assert_eq!(rng.index_below(0), 0);
    }

    #[test]
    fn block_widths_respect_the_generator_limit() {
        for seed in 0..64 {
            let specs = generate(Difficulty::VeryEasy, seed);
            assert!(specs.iter().all(|s| (1..=MAX_BLOCK_WIDTH).contains(&s.width)));
        }
    }

    #[test]
    fn harder_levels_fill_more_rows() {
        assert_eq!(filled_rows(Difficulty::VeryEasy), 2);
        assert_eq!(filled_rows(Difficulty::Master), 6);
    }
}
