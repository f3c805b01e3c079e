//! fxdesk operator CLI.
//!
//! `tick` is the offline proving path: scenario source + simulator +
//! in-memory ledger wired into one process, no network anywhere. `replay`
//! and `db` talk to the durable Postgres ledger via FXD_DATABASE_URL.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use fxd_brains::BrainRegistry;
use fxd_exec::SimulatedExecutor;
use fxd_ledger::{EventLedger, MemoryLedger};
use fxd_md::{Scenario, ScenarioSource};
use fxd_runtime::{Actor, Desk, TickArgs, TickDeps};
use fxd_schemas::{ActorRole, Gate, LedgerEvent};

#[derive(Parser)]
#[command(name = "fxdesk")]
#[command(about = "FX decision desk CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run shadow/paper ticks against the simulator (offline, in-memory).
    Tick {
        /// Comma-separated symbol list.
        #[arg(long, default_value = "EURUSD,GBPUSD")]
        symbols: String,

        /// Scenario: AUTO | TREND_UP | TREND_DOWN | RANGE | STRESS.
        #[arg(long, default_value = "AUTO")]
        scenario: String,

        /// Number of ticks to run.
        #[arg(long, default_value_t = 1)]
        ticks: u32,

        /// Promote to G1 and arm after the first tick so commands reach the
        /// simulator (paper mode). Default is shadow (G0, no commands).
        #[arg(long, default_value_t = false)]
        paper: bool,
    },

    /// Print one day of the durable ledger with its replay status.
    Replay {
        /// Day to replay (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,
    },

    /// Compute layered config hash + print canonical JSON.
    ConfigHash {
        /// Paths in merge order (base -> env -> desk).
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Database commands.
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    Migrate,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Tick {
            symbols,
            scenario,
            ticks,
            paper,
        } => run_ticks(&symbols, &scenario, ticks, paper),

        Commands::Replay { date } => {
            let pool = fxd_ledger::connect_from_env().await?;
            let ledger = fxd_ledger::PgLedger::new(pool);
            let bundle = ledger.day(date).await?;
            println!(
                "replay day {date}: status={} events={} audits={}",
                bundle.replay_day.status.as_str(),
                bundle.events.len(),
                bundle.audit_logs.len()
            );
            for event in &bundle.events {
                print_event(event);
            }
            Ok(())
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let loaded = fxd_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(())
        }

        Commands::Db { cmd } => {
            let pool = fxd_ledger::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    // Connectivity probe doubles as a smoke test.
                    fxd_ledger::migrate(&pool).await?;
                    println!("db_ok=true migrations_applied=true");
                }
                DbCmd::Migrate => {
                    fxd_ledger::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
            Ok(())
        }
    }
}

fn run_ticks(symbols: &str, scenario: &str, ticks: u32, paper: bool) -> Result<()> {
    let scenario: Scenario = scenario
        .parse()
        .map_err(|e: String| anyhow::anyhow!("parse scenario: {e}"))?;
    let symbols: Vec<String> = symbols
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let now = Utc::now();
    let ledger = MemoryLedger::new();
    let source = ScenarioSource::new(scenario, now);
    let registry = BrainRegistry::standard();
    let sim = SimulatedExecutor::new();

    let mut desk = Desk::new();
    let inbox = desk.lifecycle_inbox();
    sim.on_lifecycle(move |ev| inbox.lock().expect("inbox poisoned").push(ev.clone()));

    let deps = TickDeps {
        ledger: &ledger,
        hub: None,
        source: &source,
        registry: &registry,
        executor: &sim,
    };
    let operator = Actor::new("cli", ActorRole::Admin);

    for n in 0..ticks {
        let mut args = TickArgs::new(symbols.clone(), Utc::now());
        args.scenario_label = Some(scenario.as_str().to_string());

        let summary = desk.run_tick(&deps, &args)?;

        println!(
            "tick {}/{} correlation={} events={} mcl={} brains={} pm={}",
            n + 1,
            ticks,
            summary.correlation_id,
            summary.events_persisted,
            summary.has_mcl_snapshot,
            summary.has_brain_intent_or_skip,
            summary.has_pm_decision,
        );
        for event in ledger.by_correlation(summary.correlation_id)? {
            print_event(&event);
        }

        // Paper mode: after the first green tick, step to G1 and arm.
        if paper && n == 0 {
            desk.change_gate(&deps, &operator, Gate::G1)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            desk.arm(&deps, &operator, "ARM")
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            println!("gate=G1 arm=ARMED (paper)");
        }
    }

    let bundle = ledger.day(now.date_naive())?;
    println!(
        "day {}: replay status={} events={}",
        now.date_naive(),
        bundle.replay_day.status.as_str(),
        bundle.events.len()
    );
    println!(
        "simulator: positions={} strategy={:?} armed={}",
        sim.open_position_count(),
        sim.active_strategy(),
        sim.is_armed()
    );

    Ok(())
}

fn print_event(event: &LedgerEvent) {
    println!(
        "  {:<22} {:<6} {:<8} {:<8} {}",
        event.event_type.as_str(),
        event.severity.as_str(),
        event.component.as_str(),
        event.symbol.as_deref().unwrap_or("-"),
        event
            .reason_code
            .map(|c| c.as_str())
            .unwrap_or("-")
    );
}
