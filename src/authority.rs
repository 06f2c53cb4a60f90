//! In-process authority: keeps its own board and resolves every accepted move to rest.

use crate::grid::{BlockSpec, Board, GRID_WIDTH};
use crate::line_clear::clear_complete_rows;
use crate::submit::{AuthorityError, Credential, MoveAuthority, MoveIntent};
use crate::validator::span_is_clear;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct LocalAuthority {
    board: Mutex<Board>,
    latency: Duration,
    accepted: AtomicUsize,
}

impl LocalAuthority {
    /// Takes the seed board and settles it, as the authority never holds a board mid-fall.
    pub fn new(mut board: Board) -> Self {
        resolve(&mut board);
        Self {
            board: Mutex::new(board),
            latency: Duration::ZERO,
            accepted: AtomicUsize::new(0),
        }
    }

    /// Simulated network delay before every answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn accepted_moves(&self) -> usize {
        self.accepted.load(Ordering::Relaxed)
    }

    pub async fn board(&self) -> Board {
        self.board.lock().await.clone()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Gravity to rest, clear, repeat until nothing changes.
fn resolve(board: &mut Board) {
    loop {
        board.settle();
        if clear_complete_rows(board).is_empty() {
            break;
        }
    }
}

fn apply(board: &mut Board, intent: MoveIntent) -> Result<(), AuthorityError> {
    let Some(block) = board
        .blocks()
        .iter()
        .find(|b| b.y == intent.row && b.column() == intent.start_column)
        .copied()
    else {
        return Err(AuthorityError::Rejected(format!(
            "no block starts at row {} column {}",
            intent.row, intent.start_column
        )));
    };
    if intent.final_column + block.width > GRID_WIDTH {
        return Err(AuthorityError::Rejected(format!(
            "block {} does not fit at column {}",
            block.id, intent.final_column
        )));
    }
    if !span_is_clear(
        intent.row,
        intent.start_column,
        intent.final_column,
        block.width,
        board.blocks(),
        block.id,
    ) {
        return Err(AuthorityError::Rejected(format!(
            "path of block {} is obstructed",
            block.id
        )));
    }
    if let Some(live) = board.block_mut(block.id) {
        live.x = intent.final_column as f64;
    }
    resolve(board);
    Ok(())
}

impl MoveAuthority for LocalAuthority {
    async fn submit_move(&self, credential: &Credential, intent: MoveIntent) -> Result<(), AuthorityError> {
        self.delay().await;
        let mut board = self.board.lock().await;
        apply(&mut board, intent)?;
        self.accepted.fetch_add(1, Ordering::Relaxed);
        debug!(account = %credential, %intent, "authority applied move");
        Ok(())
    }

    async fn fetch_board(&self, credential: &Credential) -> Result<Vec<BlockSpec>, AuthorityError> {
        self.delay().await;
        let specs = self.board.lock().await.specs();
        info!(account = %credential, blocks = specs.len(), "authority served board snapshot");
        Ok(specs)
    }
}
