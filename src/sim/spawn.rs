//! Tile spawning

use rand::Rng;
use rand::seq::SliceRandom;

use super::state::{GameState, Tile, TileEvent, TileEventKind};

/// Roll a spawn value: 4 with `four_probability`, otherwise 2
#[inline]
pub fn roll_tile_value<R: Rng + ?Sized>(rng: &mut R, four_probability: f64) -> u32 {
    if rng.random_bool(four_probability.clamp(0.0, 1.0)) {
        4
    } else {
        2
    }
}

/// Place up to `count` new tiles on distinct empty slots chosen uniformly at
/// random. Each spawned value is added to the score.
pub fn spawn_tiles(state: &mut GameState, count: usize) -> Vec<TileEvent> {
    let mut empty = state.board.empty_cells();
    let take = count.min(empty.len());
    let (chosen, _) = empty.partial_shuffle(&mut state.rng, take);

    let mut events = Vec::with_capacity(take);
    for &index in chosen.iter() {
        let value = roll_tile_value(&mut state.rng, state.rules.four_probability);
        let tile = Tile {
            id: state.next_tile_id(),
            value,
        };
        *state.board.slot_mut(index) = Some(tile);
        state.score += value as u64;
        events.push(TileEvent::in_place(tile, index, TileEventKind::Spawned));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::CELL_COUNT;
    use crate::sim::state::Board;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_spawn_fills_only_empty_slots() {
        let mut values = [2; CELL_COUNT];
        values[3] = 0;
        values[9] = 0;
        let mut state = GameState::from_board(5, Board::from_values(values).unwrap());

        let events = spawn_tiles(&mut state, 1);
        assert_eq!(events.len(), 1);
        let index = events[0].to.index();
        assert!(index == 3 || index == 9);
        assert_eq!(state.board().count_empty(), 1);
    }

    #[test]
    fn test_spawn_caps_at_empty_count() {
        let mut values = [2; CELL_COUNT];
        values[0] = 0;
        let mut state = GameState::from_board(5, Board::from_values(values).unwrap());

        let events = spawn_tiles(&mut state, 4);
        assert_eq!(events.len(), 1);
        assert_eq!(state.board().count_empty(), 0);

        // Full board: nothing to do
        assert!(spawn_tiles(&mut state, 1).is_empty());
    }

    #[test]
    fn test_spawn_adds_value_to_score() {
        let mut state = GameState::from_board(11, Board::EMPTY);
        let events = spawn_tiles(&mut state, 3);
        let total: u64 = events.iter().map(|e| e.value as u64).sum();
        assert_eq!(state.score(), total);
        // Distinct slots and distinct ids
        assert_ne!(events[0].to, events[1].to);
        assert_ne!(events[1].to, events[2].to);
        assert_ne!(events[0].tile_id, events[2].tile_id);
    }

    #[test]
    fn test_spawn_distribution() {
        let mut rng = Pcg32::seed_from_u64(2048);
        let n = 20_000;
        let fours = (0..n)
            .filter(|_| roll_tile_value(&mut rng, 0.2) == 4)
            .count();
        let ratio = fours as f64 / n as f64;
        assert!((ratio - 0.2).abs() < 0.02, "four ratio {ratio}");
    }

    #[test]
    fn test_spawn_distribution_through_games() {
        // Same check, but through the real spawn path
        let mut twos = 0;
        let mut fours = 0;
        for seed in 0..5_000 {
            let state = GameState::new(seed);
            match state.board().highest_tile() {
                2 => twos += 1,
                4 => fours += 1,
                other => panic!("unexpected spawn value {other}"),
            }
        }
        let ratio = fours as f64 / (twos + fours) as f64;
        assert!((ratio - 0.2).abs() < 0.03, "four ratio {ratio}");
    }
}
