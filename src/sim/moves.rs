//! Move resolution
//!
//! Slides and merges every line toward the target edge, then spawns at most
//! one tile and re-checks for game over.

use super::spawn::spawn_tiles;
use super::state::{Cell, Direction, GamePhase, GameState, TileEvent, TileEventKind};
use crate::consts::*;

/// Outcome of a single `apply_move` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub direction: Direction,
    /// At least one tile slid or merged (and a tile was spawned)
    pub changed: bool,
    /// Slides/merges in resolution order, followed by the spawn (if any)
    pub events: Vec<TileEvent>,
    /// Number of merges performed
    pub merges: u32,
    /// Game is over after this move
    pub game_over: bool,
    /// This call is the one that ended the game
    pub became_game_over: bool,
}

impl MoveResult {
    fn unchanged(direction: Direction, game_over: bool) -> Self {
        Self {
            direction,
            changed: false,
            events: Vec::new(),
            merges: 0,
            game_over,
            became_game_over: false,
        }
    }

    /// Longest slide in this move, in cells
    pub fn max_distance(&self) -> usize {
        self.events.iter().map(TileEvent::distance).max().unwrap_or(0)
    }
}

/// Where a tile ends up when scanning toward the edge
enum Destination {
    Empty(usize),
    /// Target slot and the merged value
    Merge(usize, u32),
}

/// Scan from `from` toward `edge` (stepping by `toward`) for the furthest
/// reachable empty slot, or an equal tile that has not merged yet.
fn find_destination(
    state: &GameState,
    merged: &[bool; CELL_COUNT],
    from: usize,
    toward: isize,
    edge: usize,
) -> Option<Destination> {
    let value = state.board.get(from)?.value;
    let mut found = None;
    let mut index = from;

    while index != edge {
        index = index.checked_add_signed(toward)?;
        match state.board.get(index) {
            None => found = Some(Destination::Empty(index)),
            Some(other) if other.value == value && !merged[index] => {
                // A pair at the top of the value range stays put
                return match value.checked_mul(2) {
                    Some(doubled) => Some(Destination::Merge(index, doubled)),
                    None => found,
                };
            }
            Some(_) => break,
        }
    }
    found
}

/// Apply a move in `direction`.
///
/// A move on a finished game is a no-op. Tiles merge at most once per call;
/// lines are resolved edge-first so equal runs pair up from the target edge.
pub fn apply_move(state: &mut GameState, direction: Direction) -> MoveResult {
    if state.phase == GamePhase::GameOver {
        return MoveResult::unchanged(direction, true);
    }

    let (starts, step) = direction.traversal();
    // Slots holding a tile that was the target of a merge during this move
    let mut merged = [false; CELL_COUNT];
    let mut events = Vec::new();
    let mut merges = 0;

    for edge in starts {
        for offset in 1..GRID_SIZE as isize {
            let Some(from) = edge.checked_add_signed(offset * step) else {
                continue;
            };
            let Some(dest) = find_destination(state, &merged, from, -step, edge) else {
                continue;
            };
            let Some(tile) = state.board.take(from) else {
                continue;
            };

            match dest {
                Destination::Merge(to, value) => {
                    // The target keeps its id
                    if let Some(target) = state.board.slot_mut(to) {
                        target.value = value;
                    }
                    merged[to] = true;
                    merges += 1;
                    events.push(TileEvent {
                        tile_id: tile.id,
                        kind: TileEventKind::Merged,
                        from: Cell::from_index(from),
                        to: Cell::from_index(to),
                        value,
                    });
                }
                Destination::Empty(to) => {
                    *state.board.slot_mut(to) = Some(tile);
                    events.push(TileEvent {
                        tile_id: tile.id,
                        kind: TileEventKind::Slid,
                        from: Cell::from_index(from),
                        to: Cell::from_index(to),
                        value: tile.value,
                    });
                }
            }
        }
    }

    let changed = !events.is_empty();
    if changed {
        events.extend(spawn_tiles(state, 1));
    }

    let game_over = state.board.is_terminal();
    // Finished games returned early, so reaching game over here is the transition
    let became_game_over = game_over;
    if game_over {
        state.phase = GamePhase::GameOver;
        log::info!("Game over with score {}", state.score);
    }

    MoveResult {
        direction,
        changed,
        events,
        merges,
        game_over,
        became_game_over,
    }
}

impl GameState {
    /// Convenience wrapper around [`apply_move`]
    pub fn apply_move(&mut self, direction: Direction) -> MoveResult {
        apply_move(self, direction)
    }
}
