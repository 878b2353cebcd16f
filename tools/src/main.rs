//! colony-runner: headless runner for the colony simulation.
//!
//! Usage:
//!   colony-runner --seed 12345 --ticks 3000 --db run.db --save-dir ./saves
//!   colony-runner --config colony.json --content-dir ./content --load --save-dir ./saves
//!   colony-runner --repl
//!   colony-runner --ipc-mode
//!
//! In REPL mode each stdin line is a `/colony ...` command or `tick N`.
//! In IPC mode every stdin line is a JSON request and every reply is one
//! JSON line on stdout.

use anyhow::{Context, Result};
use colony_core::{
    command::{CommandResult, CommandRouter},
    config::ColonyConfig,
    content::ContentCatalog,
    engine::ColonyEngine,
    store::SimStore,
    types::{Tick, WorldSec},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    GetState,
    Tick { count: u64 },
    Command { line: String },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    tick:            Tick,
    world_time_sec:  WorldSec,
    paused:          bool,
    population:      u32,
    population_cap:  u32,
    hotspots:        usize,
    tasks:           usize,
    active_enemies:  u32,
    raids_survived:  u32,
    policy:          &'static str,
    status:          String,
}

#[derive(serde::Serialize)]
struct IpcReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<CommandResult>,
    state:  UiState,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match flag_value(&args, "--config") {
        Some(path) => ColonyConfig::load(Path::new(path))?,
        None => ColonyConfig::default(),
    };
    config.sim.seed = parse_arg(&args, "--seed", config.sim.seed);
    let ticks = parse_arg(&args, "--ticks", 3000u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let repl = args.iter().any(|a| a == "--repl");
    let load = args.iter().any(|a| a == "--load");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let save_dir = flag_value(&args, "--save-dir");

    let catalog = match flag_value(&args, "--content-dir") {
        Some(dir) => ContentCatalog::load(Path::new(dir))
            .with_context(|| format!("content pack {dir} failed validation"))?,
        None => ContentCatalog::builtin(),
    };

    if !ipc_mode {
        println!("colony-runner");
        println!("  seed:      {}", config.sim.seed);
        println!("  ticks:     {ticks}");
        println!("  db:        {db}");
        println!("  save_dir:  {}", save_dir.unwrap_or("-"));
        println!();
    }

    let store = if db == ":memory:" {
        SimStore::in_memory()?
    } else {
        SimStore::open(db)?
    };
    let run_id = format!("run-{}", config.sim.seed);
    let seed = config.sim.seed;

    let mut engine = ColonyEngine::build(run_id.clone(), config, catalog)?.with_store(store)?;
    if let Some(dir) = save_dir {
        engine = engine.with_save_dir(dir);
    }
    if load {
        engine.load().context("loading the active save")?;
    }
    log::info!("run={run_id} seed={seed} ready");

    let mut router = CommandRouter::new(engine);
    if ipc_mode {
        run_ipc_loop(&mut router)?;
    } else if repl {
        run_repl(&mut router)?;
        print_summary(router.engine(), &run_id, router.engine().clock.current_tick)?;
    } else {
        router.engine_mut().run_ticks(ticks)?;
        print_summary(router.engine(), &run_id, ticks)?;
    }
    Ok(())
}

fn run_ipc_loop(router: &mut CommandRouter) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        if handle.read_line(&mut buffer)? == 0 {
            break;
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let result = match request {
            IpcRequest::Quit => break,
            IpcRequest::GetState => None,
            IpcRequest::Tick { count } => {
                router.engine_mut().run_ticks(count)?;
                None
            }
            IpcRequest::Command { line } => Some(router.execute(&line)),
        };
        let reply = IpcReply { result, state: ui_state(router.engine()) };
        writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn run_repl(router: &mut CommandRouter) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        if let Some(count) = line.strip_prefix("tick") {
            let count = count.trim().parse().unwrap_or(1u64);
            let events = router.engine_mut().run_ticks(count)?;
            writeln!(stdout, "ok: {count} ticks, {} events", events.len())?;
            continue;
        }
        let result = router.execute(line);
        let tag = if result.success { "ok" } else { "error" };
        writeln!(stdout, "{tag}: {}", result.message)?;
    }
    Ok(())
}

fn ui_state(engine: &ColonyEngine) -> UiState {
    let state = &engine.state;
    UiState {
        tick:           engine.clock.current_tick,
        world_time_sec: state.world_time_sec,
        paused:         engine.is_paused(),
        population:     state.population(),
        population_cap: state.population_cap,
        hotspots:       state.hotspots.len(),
        tasks:          state.tasks.len(),
        active_enemies: state.raid.active_enemies,
        raids_survived: state.raid.raids_survived,
        policy:         state.active_policy.as_str(),
        status:         engine.status(),
    }
}

fn print_summary(engine: &ColonyEngine, run_id: &str, ticks: u64) -> Result<()> {
    let state = &engine.state;
    let logged = match engine.store() {
        Some(store) => store.event_count(run_id)?,
        None => 0,
    };

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {run_id}");
    println!("  ticks run:      {ticks}");
    println!("  final tick:     {}", engine.clock.current_tick);
    println!("  world time:     {}s", state.world_time_sec);
    println!("  population:     {}/{}", state.population(), state.population_cap);
    println!("  tasks queued:   {}", state.tasks.len());
    println!("  raids survived: {}", state.raid.raids_survived);
    println!("  events logged:  {logged}");
    println!();
    println!("=== STOCK ===");
    for (resource, qty) in state.stock.iter() {
        println!("  {:<8} {qty}", resource.item_id());
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
