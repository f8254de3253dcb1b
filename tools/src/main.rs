//! outpost-runner: headless host for the outpost simulation.
//!
//! Usage:
//!   outpost-runner --state outpost-save.json --ticks 3600
//!   outpost-runner --state outpost.db --live 30
//!   outpost-runner --seed 12345 --ipc-mode

use anyhow::{Context, Result};
use outpost_core::{
    clock::{SystemClock, WallClock},
    config::SimConfig,
    engine::SimEngine,
    entity::{Equipment, Item, Mission, ResourcePool, Worker},
    event::SimEvent,
    host::{SimHost, Ticker},
    store::{JsonFileStore, MemoryStore, SnapshotStore, SqliteStore},
    types::{MissionId, Timestamp, WorkerId},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick { count: u64 },
    Assign { mission_id: MissionId, worker_id: WorkerId },
    Save,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    now: Timestamp,
    last_generation_time: Option<Timestamp>,
    saves: u64,
    failed_saves: u64,
    resources: &'a ResourcePool,
    workers: &'a [Worker],
    available: &'a [Mission],
    active: &'a [Mission],
    inventory: &'a [Item],
    equipment: &'a [Equipment],
    events: &'a [SimEvent],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ticks = parse_arg(&args, "--ticks", 0u64);
    let live = parse_arg(&args, "--live", 0u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let state = find_arg(&args, "--state").unwrap_or("./outpost-save.json");

    let mut config = match find_arg(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = find_arg(&args, "--seed").and_then(|s| s.parse().ok()) {
        config.seed = Some(seed);
    }

    if !ipc_mode {
        println!("Outpost - outpost-runner");
        println!("  state:     {state}");
        println!("  seed:      {}", config.seed.map_or("random".to_string(), |s| s.to_string()));
        println!("  ticks:     {ticks}");
        println!("  live:      {live}s");
        println!();
    }

    let clock = SystemClock;
    let store = open_store(state)?;
    let mut engine = SimEngine::start(config, store, clock.now())
        .with_context(|| format!("Cannot start from {state}"))?;

    if ipc_mode {
        run_ipc_loop(&mut engine, clock.now())?;
        return Ok(());
    }

    if ticks > 0 {
        let scratch = fast_forward(&engine, ticks, clock.now());
        print_summary(&scratch, ticks);
    }

    if live > 0 {
        engine = run_live(engine, Duration::from_secs(live))?;
    }

    if ticks == 0 || live > 0 {
        print_summary(&engine, 0);
    }
    Ok(())
}

/// Batch fast-forward, one simulated second per tick, on a copy of the
/// loaded state. The copy saves into memory only: the real store must never
/// hold timestamps ahead of the wall clock.
fn fast_forward(engine: &SimEngine, ticks: u64, start: Timestamp) -> SimEngine {
    let mut scratch = SimEngine::new(
        engine.config().clone(),
        engine.snapshot().clone(),
        engine.last_active(),
        Box::new(MemoryStore::new()),
    );
    let mut now = start;
    for _ in 0..ticks {
        now += 1.0;
        for event in scratch.tick(now) {
            log::info!("[{}] {}", event.type_name(), describe_event(&event));
        }
    }
    scratch
}

/// `.db` / `.sqlite` paths go to SQLite, everything else to a JSON file.
fn open_store(path: &str) -> Result<Box<dyn SnapshotStore>> {
    let store: Box<dyn SnapshotStore> = if path.ends_with(".db") || path.ends_with(".sqlite") {
        Box::new(SqliteStore::open(path)?)
    } else {
        Box::new(JsonFileStore::open(path)?)
    };
    Ok(store)
}

/// Real-time mode: the engine runs on the host thread, ticked by wall clock.
fn run_live(engine: SimEngine, run_for: Duration) -> Result<SimEngine> {
    let interval = Duration::from_secs_f64(engine.config().tick_interval.max(0.01));
    let clock: Arc<dyn WallClock> = Arc::new(SystemClock);

    let host = SimHost::spawn(engine, Arc::clone(&clock))?;
    let updates = host.handle().subscribe()?;
    let ticker = Ticker::spawn(host.handle(), clock, interval)?;

    let deadline = Instant::now() + run_for;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match updates.recv_timeout(remaining) {
            Ok(update) => {
                for event in &update.events {
                    println!("  {}", describe_event(event));
                }
            }
            Err(_) => break,
        }
    }

    ticker.stop();
    Ok(host.shutdown()?)
}

/// JSON lines on stdin, one state reply per line on stdout. Simulated time
/// starts at `start` and only moves on `tick`.
fn run_ipc_loop(engine: &mut SimEngine, start: Timestamp) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut now = start;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let (events, error) = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => (vec![], None),
            IpcCommand::Tick { count } => {
                let mut events = Vec::new();
                for _ in 0..count {
                    now += 1.0;
                    events.extend(engine.tick(now));
                }
                (events, None)
            }
            IpcCommand::Assign { mission_id, worker_id } => match engine.assign(mission_id, worker_id, now) {
                Ok(events) => (events, None),
                Err(e) => (vec![], Some(e.to_string())),
            },
            IpcCommand::Save => {
                let error = (!engine.request_save(now)).then(|| "save failed".to_string());
                (vec![], error)
            }
        };

        let state = build_ui_state(engine, now, &events, error);
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }

    engine.request_save(now);
    Ok(())
}

fn build_ui_state<'a>(
    engine: &'a SimEngine,
    now: Timestamp,
    events: &'a [SimEvent],
    error: Option<String>,
) -> UiState<'a> {
    let snapshot = engine.snapshot();
    UiState {
        now,
        last_generation_time: snapshot.last_generation_time,
        saves: engine.save_count(),
        failed_saves: engine.failed_save_count(),
        resources: &snapshot.resources,
        workers: &snapshot.workers,
        available: &snapshot.available,
        active: &snapshot.active,
        inventory: &snapshot.inventory,
        equipment: &snapshot.equipment,
        events,
        error,
    }
}

fn describe_event(event: &SimEvent) -> String {
    match event {
        SimEvent::MissionGenerated { name, expiration_time, .. } => {
            format!("generated '{name}', expires at {expiration_time:.0}")
        }
        SimEvent::MissionExpired { mission_id, .. } => format!("expired {mission_id}"),
        SimEvent::MissionAssigned { mission_id, worker_id, .. } => {
            format!("assigned {mission_id} to {worker_id}")
        }
        SimEvent::MissionCompleted { mission_id, rewards, .. } => {
            let loot: Vec<String> = rewards.iter().map(|r| format!("{} x{}", r.name, r.quantity)).collect();
            format!("completed {mission_id}: {}", loot.join(", "))
        }
        SimEvent::OfflineReconciled {
            elapsed,
            completed,
            expired,
            generated,
            ..
        } => format!("caught up {elapsed:.0}s: {completed} completed, {expired} expired, {generated} generated"),
    }
}

fn print_summary(engine: &SimEngine, ticks: u64) {
    let snapshot = engine.snapshot();
    let on_mission = snapshot.workers.iter().filter(|w| !w.is_idle()).count();

    println!("=== RUN SUMMARY ===");
    println!("  ticks run:      {ticks}");
    println!("  missions rolled: {}", snapshot.missions_generated);
    println!("  available:      {}", snapshot.available.len());
    println!("  active:         {}", snapshot.active.len());
    println!("  workers out:    {on_mission}/{}", snapshot.workers.len());
    println!("  saves:          {} ({} failed)", engine.save_count(), engine.failed_save_count());

    println!();
    println!("=== INVENTORY ===");
    if snapshot.inventory.is_empty() {
        println!("  (empty)");
    }
    for item in &snapshot.inventory {
        println!("  {:<16} x{}", item.name, item.quantity);
    }
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    find_arg(args, flag).and_then(|v| v.parse().ok()).unwrap_or(default)
}
