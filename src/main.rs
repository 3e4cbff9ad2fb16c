use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ema_channel::prelude::*;
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ema-channel")]
#[command(about = "A Rust-based EMA channel backtesting engine", long_about = None)]
struct Cli {
    //enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //run a single backtest
    Run {
        #[command(flatten)]
        common: CommonArgs,

        //ema period
        #[arg(long)]
        ema: Option<usize>,

        //output path for equity curve csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,

        //output path for trades csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,

        //output path for the full result as json
        #[arg(long)]
        output_json: Option<PathBuf>,

        //write the resolved configuration to this json file
        #[arg(long)]
        save_config: Option<PathBuf>,
    },

    //compare several ema periods on the same data
    Sweep {
        #[command(flatten)]
        common: CommonArgs,

        //comma separated ema periods (eg 20,30,33)
        #[arg(long, value_delimiter = ',')]
        ema: Vec<usize>,

        //evaluate periods sequentially instead of in parallel
        #[arg(long)]
        sequential: bool,

        //output path for the reports as json
        #[arg(long)]
        output_json: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CommonArgs {
    //json configuration file, flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    //path to csv data file (timestamp,open,high,low,close,volume)
    #[arg(long)]
    data: Option<PathBuf>,

    //channel width as a fraction (eg 0.02 for 2%)
    #[arg(long)]
    width: Option<f64>,

    //ema seeding convention (sma, first)
    #[arg(long)]
    seed: Option<String>,

    //initial capital
    #[arg(long)]
    initial_capital: Option<f64>,

    //commission rate as a fraction of notional
    #[arg(long)]
    commission: Option<f64>,

    //fill price convention (close, next-open)
    #[arg(long)]
    fill: Option<FillPrice>,

    //annual risk free rate as a fraction
    #[arg(long)]
    risk_free: Option<f64>,

    //bar interval (eg 1h, 4h, 1d), inferred from the data when omitted
    #[arg(long)]
    interval: Option<BarInterval>,
}

impl CommonArgs {
    //loads the config file (or defaults) and applies flag overrides
    fn resolve(&self, ema: Option<usize>) -> Result<BacktestConfiguration> {
        let mut config = match &self.config {
            Some(path) => BacktestConfiguration::from_json_file(path)
                .context(format!("Failed to load config from {:?}", path))?,
            None => BacktestConfiguration::default(),
        };

        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(ema) = ema {
            config.strategy.ema_period = ema;
        }
        if let Some(width) = self.width {
            config.strategy.channel_width = width;
        }
        if let Some(seed) = &self.seed {
            config.strategy.ema_seed = EmaSeed::parse(seed)
                .ok_or_else(|| anyhow::anyhow!("Unknown EMA seed: {}", seed))?;
        }
        if let Some(capital) = self.initial_capital {
            config.backtest.initial_capital = capital;
        }
        if let Some(commission) = self.commission {
            config.backtest.commission_rate = commission;
        }
        if let Some(fill) = self.fill {
            config.backtest.fill_price = fill;
        }
        if let Some(rf) = self.risk_free {
            config.backtest.risk_free_rate = rf;
        }
        if let Some(interval) = self.interval {
            config.backtest.interval = Some(interval);
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            common,
            ema,
            output_equity_csv,
            output_trades_csv,
            output_json,
            save_config,
        } => {
            let mut config = common.resolve(ema)?;
            if output_equity_csv.is_some() {
                config.output_equity_csv = output_equity_csv;
            }
            if output_trades_csv.is_some() {
                config.output_trades_csv = output_trades_csv;
            }
            if output_json.is_some() {
                config.output_json = output_json;
            }
            if let Some(path) = save_config {
                config
                    .to_json_file(&path)
                    .context(format!("Failed to save config to {:?}", path))?;
                info!("Configuration saved to {:?}", path);
            }
            run_backtest(&config)?;
        }
        Commands::Sweep {
            common,
            ema,
            sequential,
            output_json,
        } => {
            let mut config = common.resolve(None)?;
            if !ema.is_empty() {
                config.sweep_periods = ema;
            }
            if config.sweep_periods.is_empty() {
                config.sweep_periods = vec![config.strategy.ema_period];
            }
            if output_json.is_some() {
                config.output_json = output_json;
            }
            config.validate()?;
            run_sweep(&config, sequential)?;
        }
    }

    Ok(())
}

fn load_engine(config: &BacktestConfiguration) -> Result<BacktestEngine> {
    info!("Loading data from {:?}", config.data_path);
    let bars = load_csv(&config.data_path)
        .context(format!("Failed to load data from {:?}", config.data_path))?;

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        info!(
            "Loaded {} bars, {} to {}",
            bars.len(),
            first.timestamp,
            last.timestamp
        );
    } else {
        anyhow::bail!("No bars found in {:?}", config.data_path);
    }

    Ok(BacktestEngine::new(config.backtest.clone(), bars))
}

fn run_backtest(config: &BacktestConfiguration) -> Result<()> {
    let engine = load_engine(config)?;
    info!("Interval: {}", engine.interval());

    let result = engine.run_params(config.strategy)?;

    println!("{}", result.strategy);
    println!("{}\n", "=".repeat(result.strategy.len()));
    result.report.pretty_print_table();
    let benchmark = &result.benchmark;
    println!(
        "\nBuy & hold: {:.2}%  excess: {:.2}%  information ratio: {:.3}  ({})",
        benchmark.buy_hold_return,
        benchmark.excess_return,
        benchmark.information_ratio,
        if benchmark.outperformed {
            "outperformed"
        } else {
            "underperformed"
        }
    );

    if let Some(path) = &config.output_equity_csv {
        save_csv(&result.equity_curve, path)?;
        info!("Equity curve saved to {:?}", path);
    }

    if let Some(path) = &config.output_trades_csv {
        save_csv(&result.trades, path)?;
        info!("Trades saved to {:?}", path);
    }

    if let Some(path) = &config.output_json {
        save_json(&result, path)?;
        info!("Result saved to {:?}", path);
    }

    Ok(())
}

fn run_sweep(config: &BacktestConfiguration, sequential: bool) -> Result<()> {
    let engine = load_engine(config)?;
    let sweep = ParameterSweep::new(&engine, config.strategy, &config.sweep_periods);

    info!("Sweeping EMA periods {:?}", sweep.periods());
    let results = if sequential {
        sweep.run()
    } else {
        sweep.run_parallel()
    };

    let mut table = Table::new();
    table.add_row(Row::new(
        [
            "EMA", "Return", "CAGR", "Sharpe", "Sortino", "Max DD", "Win Rate", "Trades",
        ]
        .iter()
        .map(|h| Cell::new(h))
        .collect(),
    ));

    for (period, result) in &results {
        let row = match result {
            Ok(r) => vec![
                period.to_string(),
                format!("{:.2}%", r.total_return),
                format!("{:.2}%", r.cagr),
                format!("{:.3}", r.sharpe_ratio),
                format!("{:.3}", r.sortino_ratio),
                format!("{:.2}%", r.max_drawdown),
                format!("{:.2}%", r.win_rate),
                r.num_round_trips.to_string(),
            ],
            Err(err) => vec![period.to_string(), format!("error: {}", err)],
        };
        table.add_row(Row::new(row.iter().map(|v| Cell::new(v)).collect()));
    }
    table.printstd();

    if let Some(path) = &config.output_json {
        let reports: Vec<SweepEntry> = results
            .iter()
            .map(|(&ema_period, result)| match result {
                Ok(report) => SweepEntry {
                    ema_period,
                    report: Some(report),
                    error: None,
                },
                Err(err) => SweepEntry {
                    ema_period,
                    report: None,
                    error: Some(err.to_string()),
                },
            })
            .collect();
        save_json(&reports, path)?;
        info!("Sweep results saved to {:?}", path);
    }

    Ok(())
}

#[derive(Serialize)]
struct SweepEntry<'a> {
    ema_period: usize,
    report: Option<&'a PerformanceReport>,
    error: Option<String>,
}

fn save_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).context(format!("Failed to create {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).context(format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
