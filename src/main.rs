// src/main.rs - Host entry point: runs the controller against the simulated plant
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thermo_actuator::config::{self, Config};
use thermo_actuator::{ControlLoop, CycleOutcome, CycleRecord, ManualClock, SimulatedPlant, StdClock, TracingSink};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Simulated runs stop here unless --cycles says otherwise.
const FAST_DEFAULT_CYCLES: u64 = 600;

#[derive(Parser, Debug)]
#[command(name = "thermo-actuator", version, about = "Closed-loop thermal actuator controller running against a simulated room.")]
struct Cli {
    /// Path to a TOML config file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control loop (default)
    Run(RunArgs),
    /// Print the resolved configuration as TOML
    ShowConfig,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Raw setpoint dial position
    #[arg(long)]
    dial: Option<u16>,

    /// Advance a simulated clock by one period per cycle instead of sleeping
    #[arg(long)]
    fast: bool,

    /// Silence controller diagnostics
    #[arg(long)]
    quiet: bool,

    /// Write one JSON line per cycle to this file
    #[arg(long)]
    trace: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load(path) {
            Ok(config) => config,
            Err(e) => {
                init_tracing(tracing::Level::INFO);
                tracing::error!("Failed to load config from '{}': {}", path.display(), e);
                return Err(e);
            }
        },
        None => Config::default(),
    };
    init_tracing(config.logging.level.to_tracing());

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Run(args) => run(config, args).await,
    }
}

fn load(path: &Path) -> Result<Config, BoxError> {
    Ok(config::load_config(&path.to_string_lossy())?)
}

fn init_tracing(level: tracing::Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

async fn run(mut config: Config, args: RunArgs) -> Result<(), BoxError> {
    if args.quiet {
        config.logging.enabled = false;
    }
    if let Some(dial) = args.dial {
        config.simulation.dial_raw = dial;
    }

    tracing::info!("Starting thermo-actuator v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Setpoint range {}..{} C, hold {} ms, PWM low/high {}/{}",
        config.setpoint.pot_min,
        config.setpoint.pot_max,
        config.motor.hold_ms,
        config.motor.pwm_low,
        config.motor.pwm_high
    );

    let mut trace = match &args.trace {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };
    let period_ms = config.cycle.period_ms;

    if args.fast {
        let clock = ManualClock::new(0);
        let plant = SimulatedPlant::new(&config, clock.clone());
        let mut ctl = ControlLoop::new(&config, plant, clock.clone(), TracingSink)?;
        ctl.startup()?;
        for _ in 0..args.cycles.unwrap_or(FAST_DEFAULT_CYCLES) {
            clock.advance(period_ms);
            let outcome = ctl.run_cycle();
            record(&mut trace, ctl.cycles(), &outcome);
        }
        ctl.shutdown()?;
        tracing::info!(
            "Finished {} cycles ({} ms simulated), room at {:.2} C",
            ctl.cycles(),
            ctl.cycles() * period_ms as u64,
            ctl.hardware().temperature_c()
        );
    } else {
        let clock = StdClock::new();
        let plant = SimulatedPlant::new(&config, clock);
        let mut ctl = ControlLoop::new(&config, plant, clock, TracingSink)?;
        ctl.startup()?;
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Ctrl-C handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        };
        ctl.run_periodic(
            Duration::from_millis(period_ms as u64),
            args.cycles,
            shutdown,
            |ctl, outcome| record(&mut trace, ctl.cycles(), outcome),
        )
        .await;
        ctl.shutdown()?;
        tracing::info!(
            "Finished {} cycles, room at {:.2} C",
            ctl.cycles(),
            ctl.hardware().temperature_c()
        );
    }

    if let Some(mut writer) = trace {
        writer.flush()?;
    }
    Ok(())
}

fn record(trace: &mut Option<BufWriter<File>>, cycle: u64, outcome: &CycleOutcome) {
    let Some(writer) = trace.as_mut() else {
        return;
    };
    let line = match serde_json::to_string(&CycleRecord::from_outcome(cycle, outcome)) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!("Failed to serialize cycle {}: {}", cycle, e);
            return;
        }
    };
    if let Err(e) = writeln!(writer, "{}", line) {
        tracing::warn!("Failed to write trace line: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from(["thermo-actuator", "run", "--fast", "--cycles", "5", "--dial", "600"]).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert!(args.fast);
                assert_eq!(args.cycles, Some(5));
                assert_eq!(args.dial, Some(600));
            }
            other => panic!("unexpected command {other:?}"),
        }
        let cli = Cli::try_parse_from(["thermo-actuator", "show-config", "--config", "room.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::ShowConfig)));
        assert_eq!(cli.config, Some(PathBuf::from("room.toml")));
    }

    #[test]
    fn test_missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().starts_with("IO error"));
    }

    #[tokio::test]
    async fn test_fast_run_writes_jsonl_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let args = RunArgs {
            cycles: Some(30),
            fast: true,
            quiet: true,
            trace: Some(path.clone()),
            ..RunArgs::default()
        };
        run(Config::default(), args).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 30);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["outcome"], "applied");
        assert_eq!(first["cycle"], 1);
        assert_eq!(first["at_ms"], 100);
    }
}
