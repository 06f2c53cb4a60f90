//! Slidetui engine: an 8x10 sliding-block grid with tick-paced gravity, row
//! clears, pointer-driven drags and optimistic move submission.
//!
//! The engine is presentation-agnostic. A front-end owns one [`session::Session`],
//! forwards pointer events to it and calls [`session::Session::tick`] every
//! [`GameConfig::tick_ms`].

pub mod authority;
pub mod drag;
pub mod gravity;
pub mod grid;
pub mod line_clear;
pub mod seed;
pub mod session;
pub mod submit;
pub mod validator;

use clap::ValueEnum;
use std::time::Duration;

/// Default gravity period: one row per 100 ms.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Options derived from CLI that affect game behaviour (tick period, drag and submission limits).
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub tick_ms: u64,
    /// Pointer units per grid column.
    pub cell_size: f64,
    /// End a drag that has seen no pointer input for this long (0 = never).
    pub drag_timeout_ms: u64,
    /// Give up on a submission after this long (0 = wait forever).
    pub submit_timeout_ms: u64,
    pub resync_on_failure: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            cell_size: 40.0,
            drag_timeout_ms: 0,
            submit_timeout_ms: 0,
            resync_on_failure: true,
        }
    }
}

impl GameConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn drag_timeout(&self) -> Option<Duration> {
        (self.drag_timeout_ms > 0).then(|| Duration::from_millis(self.drag_timeout_ms))
    }

    pub fn submit_timeout(&self) -> Option<Duration> {
        (self.submit_timeout_ms > 0).then(|| Duration::from_millis(self.submit_timeout_ms))
    }
}

/// Game difficulty ladder. Only shapes generated seed layouts here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Difficulty {
    VeryEasy,
    #[default]
    Easy,
    Medium,
    MediumHard,
    Hard,
    VeryHard,
    Expert,
    Master,
}

impl Difficulty {
    pub const ALL: [Self; 8] = [
        Self::VeryEasy,
        Self::Easy,
        Self::Medium,
        Self::MediumHard,
        Self::Hard,
        Self::VeryHard,
        Self::Expert,
        Self::Master,
    ];

    /// 1 (VeryEasy) through 8 (Master).
    pub fn level(self) -> u8 {
        match self {
            Self::VeryEasy => 1,
            Self::Easy => 2,
            Self::Medium => 3,
            Self::MediumHard => 4,
            Self::Hard => 5,
            Self::VeryHard => 6,
            Self::Expert => 7,
            Self::Master => 8,
        }
    }
}
