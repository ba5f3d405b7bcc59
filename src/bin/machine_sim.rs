//! machine-sim - simulated machine sensor engine
//!
//! Usage:
//!   machine-sim serve --port 8080
//!   machine-sim run --ticks 600 --fault bearing_wear --inject-at 100
//!   machine-sim faults

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use machine_sim::config::TICK_INTERVAL_MS;
use machine_sim::simulation::faults;
use machine_sim::{
    FaultKind, ServerConfig, SimulationRuntime, SimulationScheduler, Status, SystemState, api,
    metrics,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "machine-sim")]
#[command(about = "Simulated machine sensors with fault injection and anomaly detection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine in real time behind the HTTP control API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Fixed RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run a fixed number of ticks on a simulated clock and print snapshots
    Run {
        /// Number of ticks (10 per simulated second)
        #[arg(short, long, default_value = "600")]
        ticks: u64,

        /// Fault to inject
        #[arg(short, long)]
        fault: Option<FaultKind>,

        /// Tick at which the fault is injected
        #[arg(long, default_value = "100")]
        inject_at: u64,

        /// Fixed RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(long, default_value = "summary")]
        format: OutputFormat,
    },

    /// List injectable faults
    Faults,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    /// One JSON snapshot per line
    Json,
    /// One line per tick
    Pretty,
    /// Status transitions and a final report only
    Summary,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port, seed } => {
            run_serve(ServerConfig { host, port, seed });
        }
        Commands::Run {
            ticks,
            fault,
            inject_at,
            seed,
            format,
        } => {
            run_headless(ticks, fault, inject_at, seed, format);
        }
        Commands::Faults => {
            run_faults();
        }
    }
}

fn run_serve(config: ServerConfig) {
    tracing_subscriber::fmt::init();
    metrics::init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to start tokio runtime");
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        let scheduler = match config.seed {
            Some(seed) => SimulationScheduler::with_seed(seed),
            None => SimulationScheduler::new(),
        };
        let engine = SimulationRuntime::spawn(scheduler);

        let shutdown = async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for ctrl-c");
            }
            info!("Shutting down...");
        };

        if let Err(e) = api::serve(&config, engine.handle(), shutdown).await {
            error!(addr = %config.bind_addr(), error = %e, "Control API failed");
        }

        if let Some(scheduler) = engine.shutdown().await {
            info!(ticks = scheduler.tick_count(), "Engine stopped");
        }
    });
}

fn run_headless(
    ticks: u64,
    fault: Option<FaultKind>,
    inject_at: u64,
    seed: Option<u64>,
    format: OutputFormat,
) {
    if fault.is_some() {
        if let Err(msg) = check_inject_tick(inject_at, ticks) {
            eprintln!("Error: {}", msg);
            std::process::exit(2);
        }
    }

    let fault_label = fault.map(|k| k.display_name()).unwrap_or("none");
    eprintln!("╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║           MACHINE-SIM Headless Run                           ║");
    eprintln!("╠══════════════════════════════════════════════════════════════╣");
    eprintln!("║ Ticks: {:53} ║", ticks);
    eprintln!("║ Fault: {:53} ║", fault_label);
    eprintln!("║ Inject at tick: {:44} ║", inject_at);
    eprintln!("╚══════════════════════════════════════════════════════════════╝");

    let mut scheduler = match seed {
        Some(seed) => SimulationScheduler::with_seed(seed),
        None => SimulationScheduler::new(),
    };

    let start = Utc::now();
    let mut last_status = Status::Normal;
    let mut worst_status = Status::Normal;
    let mut first_detection: Option<u64> = None;
    let mut min_days: Option<f64> = None;
    let mut last: Option<std::sync::Arc<SystemState>> = None;

    for tick in 1..=ticks {
        let now = start + Duration::milliseconds((tick * TICK_INTERVAL_MS) as i64);

        if let Some(kind) = fault {
            if tick == inject_at {
                if let Err(e) = scheduler.inject(kind, now) {
                    eprintln!("Warning: {}", e);
                }
            }
        }

        let state = scheduler.tick(now);

        worst_status = worst_status.max(state.overall_status);
        let detected = state.anomalous_count() > 0;
        if scheduler.controller().is_active() && first_detection.is_none() && detected {
            first_detection = Some(state.tick);
        }
        if let Some(days) = state.days_to_failure {
            min_days = Some(min_days.map_or(days, |d| d.min(days)));
        }

        match format {
            OutputFormat::Json => match serde_json::to_string(&*state) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("Failed to encode tick {}: {}", state.tick, e),
            },
            OutputFormat::Pretty => println!("{}", pretty_line(&state)),
            OutputFormat::Summary => {
                if state.overall_status != last_status {
                    println!(
                        "tick {:>5}  {} -> {}  {}",
                        state.tick,
                        last_status.as_str(),
                        state.overall_status.as_str(),
                        state.anomaly_details.join(" | ")
                    );
                }
            }
        }
        last_status = state.overall_status;
        last = Some(state);
    }

    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║                        Run Complete                          ║");
    eprintln!("╠══════════════════════════════════════════════════════════════╣");
    eprintln!("║ Ticks simulated: {:43} ║", scheduler.tick_count());
    eprintln!("║ Worst status: {:46} ║", worst_status.as_str());
    match first_detection {
        Some(tick) => eprintln!("║ First detection at tick: {:35} ║", tick),
        None => eprintln!("║ First detection at tick: {:>35} ║", "-"),
    }
    match min_days {
        Some(days) => eprintln!("║ Min days to failure: {:39.1} ║", days),
        None => eprintln!("║ Min days to failure: {:>39} ║", "-"),
    }
    if let Some(state) = last {
        for sensor in &state.sensors {
            eprintln!(
                "║ {:12} {:>10.2} {:<8} {:>8} {:>16} ║",
                sensor.config.name,
                sensor.current_value,
                sensor.config.unit,
                sensor.status.as_str(),
                if sensor.is_anomalous { "ANOMALY" } else { "" }
            );
        }
    }
    eprintln!("╚══════════════════════════════════════════════════════════════╝");
}

/// The headless loop runs ticks `1..=ticks`; any other inject tick would
/// never fire.
fn check_inject_tick(inject_at: u64, ticks: u64) -> Result<(), String> {
    if (1..=ticks).contains(&inject_at) {
        Ok(())
    } else {
        Err(format!(
            "--inject-at {} is outside the run (ticks 1..={})",
            inject_at, ticks
        ))
    }
}

fn pretty_line(state: &SystemState) -> String {
    let channels: Vec<String> = state
        .sensors
        .iter()
        .map(|s| {
            let marker = if s.is_anomalous { "*" } else { "" };
            format!("{}={:.2}{}{}", s.sensor, s.current_value, s.config.unit, marker)
        })
        .collect();
    let fault = match &state.active_fault {
        Some(f) => format!(" [{} {:.0}%]", f.kind, f.progress * 100.0),
        None => String::new(),
    };
    format!(
        "[{:>5}] {:8} {}{}",
        state.tick,
        state.overall_status.as_str().to_uppercase(),
        channels.join(" "),
        fault
    )
}

fn run_faults() {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                     Injectable Faults                        ║");
    println!("╠══════════════════════════════════════════════════════════════╣");

    for info in faults::catalog() {
        println!("║ {:18} - {:39} ║", info.kind.as_str(), info.name);
        println!("║   {:58} ║", info.description);
    }

    println!("╚══════════════════════════════════════════════════════════════╝");
    println!("\nUsage: machine-sim run --fault <FAULT> --inject-at <TICK>");
}
