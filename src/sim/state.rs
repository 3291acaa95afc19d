//! Game state and core board types
//!
//! Everything the engine mutates lives in `GameState`; renderers only ever
//! see `BoardSnapshot` and `TileEvent` copies.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::spawn::spawn_tiles;
use crate::consts::*;
use crate::{cell_coords, cell_index};

/// Errors raised at the engine's input boundary
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid tile value {value} at slot {index} (must be a power of two >= 2)")]
    InvalidTileValue { index: usize, value: u32 },
}

/// A direction to slide/merge tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions, in numeric-code order
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }

    /// Line starts on the target edge and the step that walks away from it
    pub(crate) fn traversal(self) -> ([usize; GRID_SIZE], isize) {
        match self {
            Direction::Left => ([0, 4, 8, 12], 1),
            Direction::Right => ([3, 7, 11, 15], -1),
            Direction::Up => ([0, 1, 2, 3], GRID_SIZE as isize),
            Direction::Down => ([12, 13, 14, 15], -(GRID_SIZE as isize)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "w" | "k" => Ok(Direction::Up),
            "down" | "s" | "j" => Ok(Direction::Down),
            "left" | "a" | "h" => Ok(Direction::Left),
            "right" | "d" | "l" => Ok(Direction::Right),
            _ => Err(EngineError::InvalidDirection(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = EngineError;

    /// 0=Up, 1=Down, 2=Left, 3=Right
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Direction::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| EngineError::InvalidDirection(code.to_string()))
    }
}

/// A board coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn from_index(index: usize) -> Self {
        let (row, col) = cell_coords(index);
        Self { row, col }
    }

    pub fn index(&self) -> usize {
        cell_index(self.row, self.col)
    }
}

/// A numbered tile, owned by exactly one board slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Stable identifier for render tracking
    pub id: u32,
    /// Power of two >= 2
    pub value: u32,
}

/// What happened to a tile during a move or reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileEventKind {
    /// Moved into an empty slot
    Slid,
    /// Moved onto an equal tile and was consumed; `value` is the doubled result
    Merged,
    /// Newly placed (`from == to`)
    Spawned,
    /// Cleared by a reset (`from == to`)
    Removed,
}

/// Per-tile event handed to the rendering side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileEvent {
    pub tile_id: u32,
    pub kind: TileEventKind,
    pub from: Cell,
    pub to: Cell,
    /// Value shown at `to` once the event has played out
    pub value: u32,
}

impl TileEvent {
    pub(crate) fn in_place(tile: Tile, index: usize, kind: TileEventKind) -> Self {
        let cell = Cell::from_index(index);
        Self {
            tile_id: tile.id,
            kind,
            from: cell,
            to: cell,
            value: tile.value,
        }
    }

    /// Cells travelled (0 for spawn/remove)
    pub fn distance(&self) -> usize {
        self.from.row.abs_diff(self.to.row) + self.from.col.abs_diff(self.to.col)
    }
}

/// The 4x4 grid, row-major
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    slots: [Option<Tile>; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Board {
    /// A constant empty board
    pub const EMPTY: Board = Board {
        slots: [None; CELL_COUNT],
    };

    /// Build a board from raw values (0 = empty). Tile ids are assigned 1.. in
    /// slot order.
    pub fn from_values(values: [u32; CELL_COUNT]) -> Result<Self, EngineError> {
        let mut board = Board::EMPTY;
        let mut next_id = 1;
        for (index, &value) in values.iter().enumerate() {
            if value == 0 {
                continue;
            }
            if value < 2 || !value.is_power_of_two() {
                return Err(EngineError::InvalidTileValue { index, value });
            }
            board.slots[index] = Some(Tile { id: next_id, value });
            next_id += 1;
        }
        Ok(board)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Values per slot, 0 for empty
    pub fn values(&self) -> [u32; CELL_COUNT] {
        let mut out = [0; CELL_COUNT];
        for (slot, tile) in out.iter_mut().zip(self.slots.iter()) {
            *slot = tile.map_or(0, |t| t.value);
        }
        out
    }

    /// Occupied slots with their tiles, in slot order
    pub fn tiles(&self) -> impl Iterator<Item = (usize, &Tile)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|t| (i, t)))
    }

    pub fn empty_cells(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count_empty(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    pub fn highest_tile(&self) -> u32 {
        self.tiles().map(|(_, t)| t.value).max().unwrap_or(0)
    }

    /// True iff the board is full and no horizontal or vertical neighbours match.
    ///
    /// Only the right and down neighbour of each slot are checked, so every
    /// pair is looked at once. Tiles too large to double never match.
    pub fn is_terminal(&self) -> bool {
        let mergeable = |a: Tile, b: Tile| a.value == b.value && a.value.checked_mul(2).is_some();
        for index in 0..CELL_COUNT {
            let Some(tile) = self.slots[index] else {
                return false;
            };
            let (row, col) = cell_coords(index);
            if col + 1 < GRID_SIZE
                && self.slots[index + 1].is_some_and(|right| mergeable(tile, right))
            {
                return false;
            }
            if row + 1 < GRID_SIZE
                && self.slots[index + GRID_SIZE].is_some_and(|down| mergeable(tile, down))
            {
                return false;
            }
        }
        true
    }

    #[inline]
    pub(crate) fn take(&mut self, index: usize) -> Option<Tile> {
        self.slots[index].take()
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Option<Tile> {
        &mut self.slots[index]
    }

    fn max_tile_id(&self) -> u32 {
        self.tiles().map(|(_, t)| t.id).max().unwrap_or(0)
    }
}

/// Read-only view of the grid and score for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub cells: [Option<u32>; CELL_COUNT],
    pub score: u64,
    pub game_over: bool,
}

impl fmt::Display for BoardSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "score: {}", self.score)?;
        for row in 0..GRID_SIZE {
            if row > 0 {
                writeln!(f, "-----------------------------")?;
            }
            let line: Vec<String> = (0..GRID_SIZE)
                .map(|col| match self.cells[cell_index(row, col)] {
                    Some(v) => format!("{:^6}", v),
                    None => format!("{:^6}", "."),
                })
                .collect();
            writeln!(f, "{}", line.join("|"))?;
        }
        if self.game_over {
            writeln!(f, "GAME OVER")?;
        }
        Ok(())
    }
}

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Moves are accepted
    Playing,
    /// No legal move remains; moves are no-ops until reset
    GameOver,
}

/// Tile spawning rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRules {
    /// Chance a spawned tile is a 4 (otherwise 2)
    pub four_probability: f64,
    /// Tiles placed when a game starts
    pub initial_tiles: usize,
}

impl Default for SpawnRules {
    fn default() -> Self {
        Self {
            four_probability: FOUR_PROBABILITY,
            initial_tiles: INITIAL_TILES,
        }
    }
}

/// Complete game state (deterministic for a given seed)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed the RNG was created from
    pub seed: u64,
    pub(crate) board: Board,
    /// Sum of every spawned tile's value since the last reset
    pub(crate) score: u64,
    pub(crate) phase: GamePhase,
    pub(crate) rules: SpawnRules,
    pub(crate) rng: Pcg32,
    next_id: u32,
}

impl GameState {
    /// Create a new game with default spawn rules
    pub fn new(seed: u64) -> Self {
        Self::with_rules(seed, SpawnRules::default())
    }

    /// Create a new game and seed its opening tiles
    pub fn with_rules(seed: u64, rules: SpawnRules) -> Self {
        let mut state = Self::blank(seed, rules);
        spawn_tiles(&mut state, rules.initial_tiles);
        state
    }

    /// Wrap an existing grid. Score starts at 0 and the phase at `Playing`;
    /// the terminal check runs on the next move.
    pub fn from_board(seed: u64, board: Board) -> Self {
        let mut state = Self::blank(seed, SpawnRules::default());
        state.next_id = board.max_tile_id() + 1;
        state.board = board;
        state
    }

    fn blank(seed: u64, rules: SpawnRules) -> Self {
        Self {
            seed,
            board: Board::EMPTY,
            score: 0,
            phase: GamePhase::Playing,
            rules,
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Clear the grid, score and phase, then reseed the opening tiles.
    ///
    /// The RNG stream carries on, so consecutive games differ. Returns
    /// `Removed` events for the old tiles followed by `Spawned` events.
    pub fn reset(&mut self) -> Vec<TileEvent> {
        let mut events: Vec<TileEvent> = self
            .board
            .tiles()
            .map(|(i, t)| TileEvent::in_place(*t, i, TileEventKind::Removed))
            .collect();

        self.board = Board::EMPTY;
        self.score = 0;
        self.phase = GamePhase::Playing;
        let initial = self.rules.initial_tiles;
        events.extend(spawn_tiles(self, initial));
        events
    }

    /// Allocate a new tile ID
    pub(crate) fn next_tile_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn rules(&self) -> &SpawnRules {
        &self.rules
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let mut cells = [None; CELL_COUNT];
        for (index, tile) in self.board.tiles() {
            cells[index] = Some(tile.value);
        }
        BoardSnapshot {
            cells,
            score: self.score,
            game_over: self.is_game_over(),
        }
    }
}
