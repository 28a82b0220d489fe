//! ledger-runner: headless driver for the loyalty ledger.
//!
//! Usage:
//!   ledger-runner --seed 12345 --steps 500 --db ledger.db
//!   ledger-runner --config ./data/ledger_config.json --ipc-mode
//!
//! Batch mode generates a seeded workload, replays it and prints a
//! summary. IPC mode reads one JSON request per line on stdin and writes
//! one JSON response per line on stdout.

use anyhow::{Context, Result};
use loyalty_core::{
    command::{CommandOutcome, LedgerCommand},
    config::LedgerConfig,
    engine::LedgerEngine,
    external::InMemoryIdentityRegistry,
    scenario::{replay, ScenarioGenerator},
    store::LedgerStore,
    types::{Amount, Height, Principal},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

const DEFAULT_CONFIG: &str = "./data/ledger_config.json";

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    State,
    /// Move the height forward by `by`.
    Advance { by: Height },
    /// Run one caller-supplied command at the current height.
    Execute { caller: Principal, command: LedgerCommand },
    /// Run the next `count` generated commands.
    Step { count: usize },
    Quit,
}

#[derive(serde::Serialize)]
struct LedgerState {
    height:           Height,
    profiles:         i64,
    tickets:          i64,
    discounts:        i64,
    total_discounted: Amount,
    proposals:        i64,
    events:           i64,
    balances:         Vec<(Principal, Amount)>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let steps = parse_arg(&args, "--steps", 500usize);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let config_path = flag_value(&args, "--config");

    let config = load_config(config_path)?;
    let run_id = uuid::Uuid::new_v4();

    if !ipc_mode {
        println!("Loyalty ledger: ledger-runner");
        println!("  run_id:   {run_id}");
        println!("  started:  {}", chrono::Utc::now().to_rfc3339());
        println!("  seed:     {seed}");
        println!("  steps:    {steps}");
        println!("  db:       {db}");
        println!("  owner:    {}", config.owner);
        println!();
    }

    let store = if db == ":memory:" {
        LedgerStore::in_memory()?
    } else {
        LedgerStore::open(db).with_context(|| format!("opening ledger database {db}"))?
    };

    let mut generator = ScenarioGenerator::new(seed, &config);
    let mut engine = LedgerEngine::with_collaborators(
        config,
        store,
        Box::new(generator.token_ledger()),
        Box::new(InMemoryIdentityRegistry::new("profile")),
        Box::new(InMemoryIdentityRegistry::new("ticket")),
    )?;
    log::info!("run {run_id} seed={seed} db={db}");
    generator.resume_at(engine.height());

    if ipc_mode {
        run_ipc_loop(&mut engine, &mut generator)?;
    } else {
        let commands = generator.generate(steps);
        let summary = replay(&mut engine, &commands)?;
        print_summary(&engine, &generator, run_id, summary.accepted, summary.rejected)?;
    }

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<LedgerConfig> {
    match path {
        Some(path) => LedgerConfig::load(path),
        None if Path::new(DEFAULT_CONFIG).exists() => LedgerConfig::load(DEFAULT_CONFIG),
        None => {
            log::warn!("{DEFAULT_CONFIG} not found, using built-in defaults");
            Ok(LedgerConfig::default_test())
        }
    }
}

fn run_ipc_loop(engine: &mut LedgerEngine, generator: &mut ScenarioGenerator) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                write_json(&mut stdout, &serde_json::json!({ "error": e.to_string() }))?;
                continue;
            }
        };

        match request {
            IpcRequest::Quit => break,
            IpcRequest::State => {
                let state = build_state(engine, generator)?;
                write_json(&mut stdout, &state)?;
            }
            IpcRequest::Advance { by } => match engine.advance_by(by) {
                Ok(_) => write_json(&mut stdout, &build_state(engine, generator)?)?,
                Err(e) => write_json(&mut stdout, &serde_json::json!({ "error": e.to_string() }))?,
            },
            IpcRequest::Execute { caller, command } => {
                let response = match engine.execute(&caller, command) {
                    Ok(outcome) => outcome_json(&outcome)?,
                    Err(e) if e.is_rejection() => serde_json::json!({ "error": e.to_string() }),
                    Err(e) => return Err(e.into()),
                };
                write_json(&mut stdout, &response)?;
            }
            IpcRequest::Step { count } => {
                generator.resume_at(engine.height());
                let commands = generator.generate(count);
                let summary = replay(engine, &commands)?;
                write_json(&mut stdout, &summary)?;
            }
        }
    }
    Ok(())
}

fn outcome_json(outcome: &CommandOutcome) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(outcome)?)
}

fn write_json<T: serde::Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string(value)?)?;
    out.flush()?;
    Ok(())
}

fn build_state(engine: &LedgerEngine, generator: &ScenarioGenerator) -> Result<LedgerState> {
    let store = engine.store();
    let tokens = engine.token_ledger();
    let balances = generator
        .customers()
        .iter()
        .map(|c| (c.clone(), tokens.balance_of(c)))
        .collect();

    Ok(LedgerState {
        height: engine.height(),
        profiles: store.profile_count()?,
        tickets: store.ticket_count()?,
        discounts: store.discount_history_count()?,
        total_discounted: store.total_discount_recorded()?,
        proposals: store.proposal_count()?,
        events: store.event_count()?,
        balances,
    })
}

fn print_summary(
    engine: &LedgerEngine,
    generator: &ScenarioGenerator,
    run_id: uuid::Uuid,
    accepted: u64,
    rejected: u64,
) -> Result<()> {
    let state = build_state(engine, generator)?;
    let params = engine.store().get_params()?;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:           {run_id}");
    println!("  final height:     {}", state.height);
    println!("  accepted:         {accepted}");
    println!("  rejected:         {rejected}");
    println!("  profiles:         {}", state.profiles);
    println!("  tickets:          {}", state.tickets);
    println!("  discounts:        {}", state.discounts);
    println!("  total discounted: {}", state.total_discounted);
    println!("  proposals:        {}", state.proposals);
    println!("  events:           {}", state.events);

    println!();
    println!("=== PARAMETERS ===");
    println!("  max discount:     {}%", params.max_discount_pct);
    println!("  threshold:        {}", params.complaint_threshold);
    println!("  decay:            {}% every {} heights", params.decay_factor_pct, params.decay_period);

    println!();
    println!("=== TOKEN BALANCES ===");
    for (who, balance) in &state.balances {
        println!("  {who:<12} {balance}");
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
