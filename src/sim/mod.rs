//! Deterministic board engine
//!
//! All game rules live here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Stable traversal order (edge-first, line by line)
//! - No rendering, timing or platform dependencies

pub mod moves;
pub mod spawn;
pub mod state;

pub use moves::{MoveResult, apply_move};
pub use spawn::{roll_tile_value, spawn_tiles};
pub use state::{
    Board, BoardSnapshot, Cell, Direction, EngineError, GamePhase, GameState, SpawnRules, Tile,
    TileEvent, TileEventKind,
};
