use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};

use goldbot::backtest::{BacktestConfig, FeedScenario, ReplayRunner, SyntheticFeed};
use goldbot::execution::{run_engine, SymbolEngine};
use goldbot::risk::TradingMode;
use goldbot::strategy::{FallbackProvider, LocalHeuristicProvider, RemoteProvider};
use goldbot::{Result, SignalProvider};

#[derive(Parser)]
#[command(name = "goldbot", about = "Signal and risk engine for a single instrument")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a synthetic feed through the pipeline and print a report
    Backtest {
        #[arg(long, value_enum, default_value = "volatile")]
        scenario: FeedScenario,
        #[arg(long, default_value_t = 8000)]
        ticks: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, value_enum, default_value = "scalping")]
        mode: TradingMode,
        #[arg(long, default_value_t = 1.0)]
        lot_size: f64,
        #[arg(long, default_value_t = 60)]
        timeframe_secs: i64,
    },
    /// Stream a synthetic feed through the async engine in real time
    Stream {
        #[arg(long, value_enum, default_value = "sideways")]
        scenario: FeedScenario,
        #[arg(long, default_value_t = 2000)]
        ticks: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, value_enum, default_value = "ultra-safe")]
        mode: TradingMode,
        #[arg(long, default_value_t = 1.0)]
        lot_size: f64,
        #[arg(long, default_value_t = 60)]
        timeframe_secs: i64,
        /// Milliseconds between ticks
        #[arg(long, default_value_t = 50)]
        tick_ms: u64,
    },
}

fn setup_logging() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "goldbot=info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Remote provider from the environment, when configured.
fn remote_from_env() -> Option<RemoteProvider> {
    let endpoint = std::env::var("GOLDBOT_MODEL_ENDPOINT").ok()?;
    let api_key = std::env::var("GOLDBOT_API_KEY").unwrap_or_default();
    tracing::info!(%endpoint, "remote signal provider configured");
    Some(RemoteProvider::new(endpoint, api_key))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Backtest {
            scenario,
            ticks,
            seed,
            mode,
            lot_size,
            timeframe_secs,
        } => {
            let updates = SyntheticFeed::new(seed).generate(scenario, ticks, timeframe_secs, 4);
            let config = BacktestConfig {
                mode,
                lot_size,
                timeframe_secs,
                ..BacktestConfig::default()
            };

            tracing::info!(?scenario, ticks, ?mode, "starting backtest");
            let report = ReplayRunner::new(config).run(&updates);

            println!("=== Backtest report ===");
            println!("ticks:             {}", report.ticks);
            println!("candles:           {}", report.candles);
            println!("signals evaluated: {}", report.signals_evaluated);
            println!("trades opened:     {}", report.trades_opened);
            println!("trades closed:     {}", report.trades_closed);
            println!("win rate:          {:.1}%", report.win_rate() * 100.0);
            println!("total profit:      ${:.2}", report.total_profit);
            println!("max drawdown:      ${:.2}", report.max_drawdown);
        }
        Command::Stream {
            scenario,
            ticks,
            seed,
            mode,
            lot_size,
            timeframe_secs,
            tick_ms,
        } => {
            let updates = SyntheticFeed::new(seed).generate(scenario, ticks, timeframe_secs, 4);
            let engine = SymbolEngine::new(
                "XAUUSD",
                timeframe_secs,
                100,
                mode,
                true,
                lot_size,
                100.0,
            );

            let provider: Arc<dyn SignalProvider> = Arc::new(FallbackProvider::new(
                remote_from_env(),
                LocalHeuristicProvider::default(),
            ));

            let (tx, rx) = mpsc::channel(256);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            let engine_task = tokio::spawn(run_engine(engine, provider, rx, shutdown_rx, 5));

            let producer = tokio::spawn(async move {
                for update in updates {
                    if tx.send(update).await.is_err() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(tick_ms)).await;
                }
            });

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, shutting down");
                    let _ = shutdown_tx.send(true);
                }
                _ = producer => {}
            }

            let engine = engine_task.await?;
            let trades = engine.positions().all_trades();
            println!("=== Session summary ===");
            println!("candles:      {}", engine.history().len());
            println!("trades:       {}", trades.len());
            println!("open:         {}", engine.positions().open_trades().len());
            println!("total profit: ${:.2}", engine.positions().total_profit());
            for trade in trades {
                println!(
                    "  {:?} {:?} in {:.2} out {:?} profit {:.2}",
                    trade.side, trade.phase, trade.entry_price, trade.exit_price, trade.profit
                );
            }
        }
    }

    Ok(())
}
