//! Slide 2048 - a 4x4 sliding-tile puzzle core
//!
//! Core modules:
//! - `sim`: Deterministic board engine (slide/merge, spawning, game over)
//! - `scheduler`: Serializes player input against the engine, one move in flight
//! - `settings`: Spawn rules, backlog bound and driver pacing

pub mod scheduler;
pub mod settings;
pub mod sim;

pub use scheduler::{
    InputEvent, MoveScheduler, SchedulerHandle, SchedulerState, SettleSignal, Submission,
    ViewUpdate,
};
pub use settings::{Settings, SettingsError};
pub use sim::{Board, BoardSnapshot, Direction, EngineError, GameState, MoveResult, TileEvent};

/// Game configuration constants
pub mod consts {
    /// Board edge length (fixed, the board is always square)
    pub const GRID_SIZE: usize = 4;
    /// Total number of slots on the board
    pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

    /// Chance that a freshly spawned tile is a 4 instead of a 2
    pub const FOUR_PROBABILITY: f64 = 0.2;
    /// Tiles seeded on a new game
    pub const INITIAL_TILES: usize = 1;

    /// Requests allowed to wait behind the move in flight
    pub const MAX_PENDING_MOVES: usize = 2;

    /// Slide animation time per cell travelled (ms)
    pub const MS_PER_CELL: u64 = 80;
    /// Delay before the game over notice is shown (ms)
    pub const GAME_OVER_DELAY_MS: u64 = 500;
}

/// Row-major slot index for (row, col)
#[inline]
pub fn cell_index(row: usize, col: usize) -> usize {
    row * consts::GRID_SIZE + col
}

/// (row, col) for a row-major slot index
#[inline]
pub fn cell_coords(index: usize) -> (usize, usize) {
    (index / consts::GRID_SIZE, index % consts::GRID_SIZE)
}
