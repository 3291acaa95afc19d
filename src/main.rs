//! Slide 2048 terminal driver
//!
//! Reads moves from stdin, prints the board after each settled move.

#[cfg(not(target_arch = "wasm32"))]
mod terminal {
    use std::path::PathBuf;
    use std::time::Duration;

    use clap::Parser;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::sync::mpsc;

    use slide_2048::{
        BoardSnapshot, Direction, GameState, InputEvent, MoveScheduler, SchedulerHandle,
        Settings, Submission, ViewUpdate,
    };

    #[derive(Parser, Debug)]
    #[command(about = "Play 2048 in the terminal: w/a/s/d (or h/j/k/l) to move, n for a new game, q to quit")]
    struct Args {
        /// RNG seed (overrides the settings file)
        #[arg(long)]
        seed: Option<u64>,

        /// Path to a JSON settings file
        #[arg(long, value_name = "FILE", value_parser = clap::value_parser!(PathBuf))]
        settings: Option<PathBuf>,

        /// Print board snapshots as JSON lines
        #[arg(long)]
        json: bool,
    }

    pub async fn run() {
        let args = Args::parse();
        let mut settings = Settings::load_or_default(args.settings.as_deref());
        if args.seed.is_some() {
            settings.seed = args.seed;
        }

        let seed = settings.seed_or_random();
        log::info!("Slide 2048 starting with seed {seed}");

        let state = GameState::with_rules(seed, settings.rules());
        let (scheduler, handle, updates) = MoveScheduler::new(state, &settings);
        let task = scheduler.spawn();
        let view = tokio::spawn(render_loop(updates, settings, args.json));

        read_input(handle).await;

        match task.await {
            Ok(state) => log::info!("Final score: {}", state.score()),
            Err(e) => log::error!("Scheduler task failed: {e}"),
        }
        if let Err(e) = view.await {
            log::error!("Render task failed: {e}");
        }
    }

    /// Key input stand-in: every whitespace-separated token is a direction
    /// word or a run of single-letter keys ("aaw" = left, left, up).
    async fn read_input(handle: SchedulerHandle) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    log::error!("Failed to read input: {e}");
                    break;
                }
            };

            for token in line.split_whitespace() {
                let events = match token.to_lowercase().as_str() {
                    "q" | "quit" => return,
                    "n" | "new" => vec![InputEvent::NewGame],
                    word => match parse_keys(word) {
                        Ok(events) => events,
                        Err(e) => {
                            eprintln!("{e}");
                            continue;
                        }
                    },
                };

                for event in events {
                    if handle.submit(event) == Submission::Closed {
                        return;
                    }
                }
            }
        }
    }

    fn parse_keys(word: &str) -> Result<Vec<InputEvent>, slide_2048::EngineError> {
        if let Ok(direction) = word.parse::<Direction>() {
            return Ok(vec![InputEvent::Move(direction)]);
        }
        word.chars()
            .map(|c| c.to_string().parse::<Direction>().map(InputEvent::Move))
            .collect()
    }

    /// Rendering stand-in: waits out the slide animation, prints the board,
    /// then releases the scheduler.
    async fn render_loop(
        mut updates: mpsc::UnboundedReceiver<ViewUpdate>,
        settings: Settings,
        json: bool,
    ) {
        while let Some(update) = updates.recv().await {
            match update {
                ViewUpdate::Reset { snapshot, .. } => show(&snapshot, json),
                ViewUpdate::Moved {
                    result,
                    snapshot,
                    settle,
                } => {
                    if result.changed {
                        let ms = result.max_distance() as u64 * settings.ms_per_cell;
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        show(&snapshot, json);
                    }
                    settle.settled();
                }
                ViewUpdate::GameOver { score } => {
                    tokio::time::sleep(Duration::from_millis(settings.game_over_delay_ms)).await;
                    println!("Game Over! Final score: {score} (n for a new game)");
                }
            }
        }
    }

    fn show(snapshot: &BoardSnapshot, json: bool) {
        if !json {
            println!("{snapshot}");
            return;
        }
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{line}"),
            Err(e) => log::error!("Failed to encode snapshot: {e}"),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    terminal::run().await;
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The terminal driver is native only; embed the library directly on wasm
}
