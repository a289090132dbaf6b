//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_execution_adapter::PaperExecutionAdapter;
use crate::domain::config_validation::validate_trading_config;
use crate::domain::cycle::{CycleConfig, DispatchPolicy, ExecutionCycle};
use crate::domain::error::AutotraderError;
use crate::domain::scheduler::Scheduler;
use crate::domain::strategies::{
    BollingerBreakout, RsiThreshold, SmaCrossover, Strategy, StrategyRegistry,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "autotrader", about = "Scheduled signal-to-order trading loop")]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (overrides [logging] level)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run cycles on a fixed interval until stdin closes or reads "stop"
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        interval_seconds: Option<u64>,
        /// Stop on its own after this many seconds
        #[arg(long)]
        duration_seconds: Option<u64>,
    },
    /// Run a single cycle and print the resulting trades
    Once {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List registered strategies
    Strategies,
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Command {
    fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Run { config, .. } | Command::Once { config } | Command::Validate { config } => {
                Some(config.as_path())
            }
            Command::Strategies => None,
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let config_level = cli
        .command
        .config_path()
        .and_then(|p| FileConfigAdapter::from_file(p).ok())
        .and_then(|c| c.get_string("logging", "level"));
    init_logging(cli.log_level.as_deref().or(config_level.as_deref()));

    let mut stdout = std::io::stdout();
    match cli.command {
        Command::Run {
            config,
            interval_seconds,
            duration_seconds,
        } => run_scheduled(
            &config,
            interval_seconds,
            duration_seconds.map(Duration::from_secs),
            watch_for_stop(BufReader::new(std::io::stdin())),
            &mut stdout,
        ),
        Command::Once { config } => run_once(&config, &mut stdout),
        Command::Strategies => run_strategies(&mut stdout),
        Command::Validate { config } => run_validate(&config, &mut stdout),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level`; falls back to `info`.
pub fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // a second init (e.g. in tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn fail(err: AutotraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

fn load_validated(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = load_config(path)?;
    validate_trading_config(&adapter).map_err(fail)?;
    Ok(adapter)
}

pub fn build_cycle_config(config: &dyn ConfigPort) -> Result<CycleConfig, AutotraderError> {
    let symbol = config
        .get_string("market", "symbol")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AutotraderError::ConfigMissing {
            section: "market".into(),
            key: "symbol".into(),
        })?;

    let dispatch = match config
        .get_string("execution", "dispatch")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("all") => DispatchPolicy::All,
        Some("new_rows") => DispatchPolicy::NewRowsOnly,
        Some(other) => {
            return Err(AutotraderError::ConfigInvalid {
                section: "execution".into(),
                key: "dispatch".into(),
                reason: format!("unknown dispatch policy '{other}'"),
            });
        }
    };

    Ok(CycleConfig {
        symbol,
        timeframe: config
            .get_string("market", "timeframe")
            .unwrap_or_else(|| "1m".to_string()),
        window: config.get_int("market", "window", 500).max(0) as usize,
        order_size: config.get_double("execution", "order_size", 0.0),
        leverage: config.get_int("execution", "leverage", 1).clamp(1, u32::MAX as i64) as u32,
        dispatch,
    })
}

fn window_param(config: &dyn ConfigPort, key: &str, default: i64) -> usize {
    config.get_int("strategy", key, default).max(0) as usize
}

/// Resolve `[strategy] name` against the registry, with the configured
/// parameters applied to the built-in strategies.
pub fn build_strategy(config: &dyn ConfigPort) -> Result<Arc<dyn Strategy>, AutotraderError> {
    let name = config
        .get_string("strategy", "name")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| SmaCrossover::NAME.to_string());

    let mut registry = StrategyRegistry::with_builtins();
    match name.as_str() {
        SmaCrossover::NAME => {
            registry.register(Arc::new(SmaCrossover::new(
                window_param(config, "short_window", 20),
                window_param(config, "long_window", 50),
            )?));
        }
        RsiThreshold::NAME => {
            registry.register(Arc::new(RsiThreshold::new(
                window_param(config, "period", 14),
                config.get_double("strategy", "lower", 30.0),
                config.get_double("strategy", "upper", 70.0),
            )?));
        }
        BollingerBreakout::NAME => {
            registry.register(Arc::new(BollingerBreakout::new(
                window_param(config, "window", 20),
                config.get_double("strategy", "num_std_dev", 2.0),
            )?));
        }
        _ => {}
    }

    registry.get(&name)
}

pub fn build_interval(config: &dyn ConfigPort, override_secs: Option<u64>) -> Duration {
    let secs = override_secs
        .unwrap_or_else(|| config.get_int("scheduler", "interval_seconds", 300).max(1) as u64);
    Duration::from_secs(secs.max(1))
}

pub fn build_data_port(
    config: &dyn ConfigPort,
) -> Result<Box<dyn MarketDataPort + Send>, AutotraderError> {
    let source = config
        .get_string("market", "source")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "csv".to_string());

    match source.as_str() {
        "csv" => {
            let data_path = config
                .get_string("market", "data_path")
                .unwrap_or_else(|| "cache/market_data".to_string());
            Ok(Box::new(CsvAdapter::new(PathBuf::from(data_path))))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_adapter::SqliteAdapter;

            let adapter = SqliteAdapter::from_config(config)?;
            adapter.initialize_schema()?;
            Ok(Box::new(adapter))
        }
        other => Err(AutotraderError::ConfigInvalid {
            section: "market".into(),
            key: "source".into(),
            reason: format!("unsupported data source '{other}'"),
        }),
    }
}

/// Wire the configured data source, strategy and optional sinks into a cycle.
pub fn build_cycle(config: &dyn ConfigPort) -> Result<ExecutionCycle, AutotraderError> {
    let cycle_config = build_cycle_config(config)?;
    let strategy = build_strategy(config)?;
    let data = build_data_port(config)?;

    let mut cycle = ExecutionCycle::new(cycle_config, data, strategy);

    if config.get_string("storage", "path").is_some() {
        #[cfg(feature = "sqlite")]
        {
            use crate::adapters::sqlite_adapter::SqliteAdapter;

            let storage = SqliteAdapter::from_config(config)?;
            storage.initialize_schema()?;
            cycle = cycle.with_storage(Box::new(storage));
        }
        #[cfg(not(feature = "sqlite"))]
        warn!("[storage] path is set but the sqlite feature is disabled; rows will not be stored");
    }

    if config.get_bool("execution", "enabled", false) {
        let mut paper = PaperExecutionAdapter::new();
        if let Some(reason) = config
            .get_string("execution", "reject_reason")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            warn!(%reason, "paper execution will reject every order");
            paper = paper.reject_all(reason);
        }
        cycle = cycle.with_execution(Box::new(paper));
    }

    Ok(cycle)
}

/// Start the scheduler and block until `stop` fires or `duration` elapses.
pub fn run_scheduled(
    config_path: &Path,
    interval_override: Option<u64>,
    duration: Option<Duration>,
    stop: Receiver<()>,
    out: &mut dyn Write,
) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let cycle = match build_cycle(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let interval = build_interval(&adapter, interval_override);

    info!(
        symbol = %cycle.config().symbol,
        strategy = %cycle.strategy_id(),
        interval_secs = interval.as_secs(),
        "starting trading loop"
    );

    let mut scheduler = Scheduler::new(cycle);
    if let Err(e) = scheduler.start(interval) {
        return fail(e);
    }

    wait_for_stop(&stop, duration);

    scheduler.stop();
    let position = scheduler.with_task(|c| c.position());
    match writeln!(
        out,
        "Stopped after {} cycles, tracked position: {}",
        scheduler.cycles_run(),
        position
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e.into()),
    }
}

/// Signal once `reader` reaches EOF, fails, or yields a `stop` line.
///
/// The watcher thread is detached: a thread blocked on stdin cannot be joined.
pub fn watch_for_stop<R>(reader: R) -> Receiver<()>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<()>();

    let spawned = thread::Builder::new()
        .name("autotrader-stdin".to_string())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(l) if l.trim().eq_ignore_ascii_case("stop") => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });
    if let Err(e) = spawned {
        warn!(error = %e, "stop watcher unavailable");
    }
    rx
}

fn wait_for_stop(stop: &Receiver<()>, limit: Option<Duration>) {
    match limit {
        Some(limit) => match stop.recv_timeout(limit) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => info!("stop requested"),
            Err(RecvTimeoutError::Timeout) => info!("run duration elapsed"),
        },
        None => {
            let _ = stop.recv();
            info!("stop requested");
        }
    }
}

/// Run one cycle on the caller thread; trades go to `out`, the summary to stderr.
pub fn run_once(config_path: &Path, out: &mut dyn Write) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match once(&adapter, out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn once(adapter: &FileConfigAdapter, out: &mut dyn Write) -> Result<(), AutotraderError> {
    let mut cycle = build_cycle(adapter)?;
    let report = cycle.run()?;

    for cycle_row in report.rows.iter().filter(|r| r.action.is_trade()) {
        writeln!(
            out,
            "{}  {:<10}  signal={:<5}  close={}",
            cycle_row.row.timestamp.to_rfc3339(),
            cycle_row.action.as_str(),
            cycle_row.signal.to_string(),
            cycle_row.row.close
        )?;
    }

    eprintln!("\n=== Cycle {} ===", report.cycle_id);
    eprintln!("Symbol:       {}", report.symbol);
    eprintln!("Strategy:     {}", report.strategy_id);
    eprintln!("Rows:         {}", report.rows.len());
    eprintln!("Trades:       {}", report.trade_count());
    eprintln!("Orders:       {}", report.orders.len());
    eprintln!("Failed:       {}", report.failed_orders().count());
    eprintln!("Position:     {}", report.position_after);
    if let Some(reason) = &report.storage_error {
        eprintln!("Storage:      failed ({reason})");
    }
    Ok(())
}

pub fn run_strategies(out: &mut dyn Write) -> ExitCode {
    let registry = StrategyRegistry::with_builtins();
    for strategy in registry.iter() {
        if let Err(e) = writeln!(out, "{:<15} {}", strategy.name(), strategy.description()) {
            return fail(e.into());
        }
    }
    ExitCode::SUCCESS
}

pub fn run_validate(config_path: &Path, out: &mut dyn Write) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match validate(&adapter, out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn validate(adapter: &FileConfigAdapter, out: &mut dyn Write) -> Result<(), AutotraderError> {
    let cycle_config = build_cycle_config(adapter)?;
    let strategy = build_strategy(adapter)?;

    writeln!(out, "Configuration is valid.")?;
    writeln!(out, "  symbol:    {}", cycle_config.symbol)?;
    writeln!(out, "  timeframe: {}", cycle_config.timeframe)?;
    writeln!(out, "  window:    {}", cycle_config.window)?;
    writeln!(out, "  strategy:  {}", strategy.name())?;
    writeln!(
        out,
        "  interval:  {}s",
        build_interval(adapter, None).as_secs()
    )?;
    Ok(())
}
