//! Move scheduler
//!
//! Serializes player input against the board engine. At most one move is in
//! flight: a move counts as finished once the engine has applied it and the
//! view has signalled that its animations settled. Requests arriving
//! meanwhile wait in a small bounded backlog; anything beyond it is dropped
//! to keep input lag bounded. A new-game request skips the backlog and
//! interrupts whatever is pending. Moves carry the game generation they were
//! submitted against, so only those aimed at a replaced grid are discarded.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::settings::Settings;
use crate::sim::{
    BoardSnapshot, Direction, GameState, MoveResult, TileEvent, TileEventKind, apply_move,
};

/// Discrete input from the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Move(Direction),
    NewGame,
}

/// What happened to a submitted input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Accepted; will be applied in arrival order
    Queued,
    /// Backlog full; the request was discarded
    Dropped,
    /// Scheduler has shut down
    Closed,
}

/// Scheduler phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for input
    Idle,
    /// A move has been applied and is waiting to settle
    Resolving,
}

/// Handed to the view with every move; fire it once all animations for the
/// move have finished. Dropping it counts as settled.
pub struct SettleSignal(oneshot::Sender<()>);

impl SettleSignal {
    fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }

    pub fn settled(self) {
        // Scheduler may have moved on after a reset
        let _ = self.0.send(());
    }
}

impl fmt::Debug for SettleSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SettleSignal")
    }
}

/// Updates published to the view, in order
#[derive(Debug)]
pub enum ViewUpdate {
    /// A fresh game: `Removed` events for the old tiles, then `Spawned`
    Reset {
        snapshot: BoardSnapshot,
        events: Vec<TileEvent>,
    },
    /// A move was applied. The next move waits on `settle` if the board changed.
    Moved {
        result: MoveResult,
        snapshot: BoardSnapshot,
        settle: SettleSignal,
    },
    /// Sent once, after the move that ended the game has settled
    GameOver { score: u64 },
}

/// A move tagged with the game it was aimed at
#[derive(Debug, Clone, Copy)]
struct QueuedMove {
    generation: u64,
    direction: Direction,
}

/// Caller-facing handle for submitting input. Dropping every handle stops the
/// scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    moves_tx: mpsc::Sender<QueuedMove>,
    reset_tx: mpsc::UnboundedSender<u64>,
    status_rx: watch::Receiver<SchedulerState>,
    generation: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Submit an input without waiting. Moves beyond the backlog bound are
    /// dropped; a new game is always accepted while the scheduler runs.
    pub fn submit(&self, event: InputEvent) -> Submission {
        match event {
            InputEvent::Move(direction) => {
                let queued = QueuedMove {
                    generation: self.generation.load(Ordering::Acquire),
                    direction,
                };
                match self.moves_tx.try_send(queued) {
                    Ok(()) => Submission::Queued,
                    Err(TrySendError::Full(_)) => {
                        log::debug!("Backlog full, dropped {direction}");
                        Submission::Dropped
                    }
                    Err(TrySendError::Closed(_)) => Submission::Closed,
                }
            }
            InputEvent::NewGame => {
                if self.reset_tx.is_closed() {
                    return Submission::Closed;
                }
                let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                match self.reset_tx.send(generation) {
                    Ok(()) => Submission::Queued,
                    Err(_) => Submission::Closed,
                }
            }
        }
    }

    pub fn status(&self) -> SchedulerState {
        *self.status_rx.borrow()
    }
}

/// Owns the game state and drains input one move at a time
pub struct MoveScheduler {
    state: GameState,
    moves_rx: mpsc::Receiver<QueuedMove>,
    reset_rx: mpsc::UnboundedReceiver<u64>,
    /// Generation of the game currently on the board
    generation: u64,
    updates_tx: mpsc::UnboundedSender<ViewUpdate>,
    status_tx: watch::Sender<SchedulerState>,
}

impl MoveScheduler {
    /// Create a scheduler, its input handle and the view update stream.
    ///
    /// Usage: let (scheduler, handle, updates) = MoveScheduler::new(state, &settings);
    ///        let task = scheduler.spawn();
    pub fn new(
        state: GameState,
        settings: &Settings,
    ) -> (Self, SchedulerHandle, mpsc::UnboundedReceiver<ViewUpdate>) {
        let (moves_tx, moves_rx) = mpsc::channel(settings.max_pending_moves.max(1));
        let (reset_tx, reset_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SchedulerState::Idle);

        let scheduler = Self {
            state,
            moves_rx,
            reset_rx,
            generation: 0,
            updates_tx,
            status_tx,
        };
        let handle = SchedulerHandle {
            moves_tx,
            reset_tx,
            status_rx,
            generation: Arc::new(AtomicU64::new(0)),
        };
        (scheduler, handle, updates_rx)
    }

    /// Start the drain loop on a Tokio task. The task ends once every handle
    /// is dropped and yields the final game state.
    pub fn spawn(self) -> JoinHandle<GameState> {
        tokio::spawn(self.run())
    }

    /// Drain loop. Publishes the opening board, then applies moves strictly in
    /// arrival order. Resets take priority over queued moves.
    pub async fn run(mut self) -> GameState {
        let events = self
            .state
            .board()
            .tiles()
            .map(|(i, t)| TileEvent::in_place(*t, i, TileEventKind::Spawned))
            .collect();
        log::info!("Game started with seed {}", self.state.seed);
        self.publish(ViewUpdate::Reset {
            snapshot: self.state.snapshot(),
            events,
        });

        loop {
            tokio::select! {
                biased;
                reset = self.reset_rx.recv() => match reset {
                    Some(generation) => self.new_game(generation),
                    None => break,
                },
                next = self.moves_rx.recv() => match next {
                    Some(queued) => {
                        if !self.catch_up(queued.generation).await {
                            break;
                        }
                        if queued.generation < self.generation {
                            log::debug!("Discarded stale {} from a previous game", queued.direction);
                            continue;
                        }
                        self.resolve(queued.direction).await;
                    }
                    None => break,
                },
            }
        }

        log::debug!("Scheduler stopped");
        self.state
    }

    async fn resolve(&mut self, direction: Direction) {
        self.set_status(SchedulerState::Resolving);

        let result = apply_move(&mut self.state, direction);
        let changed = result.changed;
        let became_game_over = result.became_game_over;
        let (settle, settled) = SettleSignal::new();
        self.publish(ViewUpdate::Moved {
            result,
            snapshot: self.state.snapshot(),
            settle,
        });

        if changed {
            tokio::select! {
                biased;
                reset = self.reset_rx.recv() => {
                    if let Some(generation) = reset {
                        log::debug!("Reset interrupted {direction} before it settled");
                        self.new_game(generation);
                        self.set_status(SchedulerState::Idle);
                        return;
                    }
                }
                outcome = settled => {
                    if outcome.is_err() {
                        log::debug!("Settle signal dropped, treating {direction} as settled");
                    }
                }
            }
        }

        if became_game_over {
            self.publish(ViewUpdate::GameOver {
                score: self.state.score(),
            });
        }
        self.set_status(SchedulerState::Idle);
    }

    /// A move can be tagged with a generation whose reset is still in flight
    /// from another handle. Apply those resets first. Returns false once every
    /// handle is gone.
    async fn catch_up(&mut self, generation: u64) -> bool {
        while self.generation < generation {
            match self.reset_rx.recv().await {
                Some(next) => self.new_game(next),
                None => return false,
            }
        }
        true
    }

    /// Reinitialize the game. Moves still queued against the old generation
    /// are skipped as they come up.
    fn new_game(&mut self, generation: u64) {
        // Resets from different handles may arrive out of order
        self.generation = self.generation.max(generation);
        let events = self.state.reset();
        log::info!("New game started");
        self.publish(ViewUpdate::Reset {
            snapshot: self.state.snapshot(),
            events,
        });
    }

    fn publish(&self, update: ViewUpdate) {
        if self.updates_tx.send(update).is_err() {
            log::debug!("View receiver dropped, update discarded");
        }
    }

    fn set_status(&self, status: SchedulerState) {
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            log::debug!("Scheduler {previous:?} -> {status:?}");
        }
    }
}
