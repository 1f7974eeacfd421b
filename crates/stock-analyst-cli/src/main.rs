use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use stock_analyst_core::insights::Polarity;
use stock_analyst_core::report::{AnalysisReport, analyze_candles};
use stock_analyst_core::schema::write_parquet;
use stock_analyst_core::snapshot::{SnapshotRecord, parse_snapshot_payload};
use stock_analyst_core::window::DateRange;
use stock_analyst_providers::directory::load_directory;
use stock_analyst_providers::provider::{CandleInterval, HistoricalRequest, MarketDataProvider};
use stock_analyst_providers::upstox::UpstoxProvider;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "stock-analyst",
    about = "Analyze historical candles and market quotes"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a saved historical candle document
    Analyze {
        /// Candle JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// First date of the window (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date of the window (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Also write the enriched window to a Parquet file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write the JSON analysis context for a language model to this file
        #[arg(long)]
        llm_context: Option<PathBuf>,

        /// Instrument key recorded in the LLM context (default: input file stem)
        #[arg(short = 'k', long)]
        instrument_key: Option<String>,
    },

    /// Summarize a saved market quote document
    Quote {
        /// Quote JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Download historical candles and analyze them
    FetchCandles {
        /// Instrument key, e.g. NSE_EQ|INE848E01016
        #[arg(short = 'k', long)]
        instrument_key: String,

        /// Candle unit: minutes, hours, days, weeks, months
        #[arg(long, default_value = "days")]
        interval: String,

        /// Units per candle
        #[arg(long, default_value_t = 1)]
        count: u32,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        /// Save the raw response to this file
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the JSON analysis context for a language model to this file
        #[arg(long)]
        llm_context: Option<PathBuf>,
    },

    /// Download the market quote for an instrument and summarize it
    FetchQuote {
        /// Instrument key, e.g. NSE_EQ|INE848E01016
        #[arg(short = 'k', long)]
        instrument_key: String,

        /// Save the raw response to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Search an instrument listing by name
    Search {
        /// Instrument CSV with segment, name and instrument_key columns
        #[arg(short, long)]
        directory: PathBuf,

        /// Exact instrument key, or a case-insensitive name fragment
        query: String,
    },
}

/// Missing values print as a dash rather than failing the report.
fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "—".to_string(),
    }
}

fn polarity_marker(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::Positive => "+",
        Polarity::Negative => "-",
        Polarity::Neutral => "~",
    }
}

fn print_report(report: &AnalysisReport) {
    let m = &report.metrics;

    if let (Some(first), Some(last)) = (report.records.first(), report.records.last()) {
        println!(
            "Window: {} to {} ({} bar(s){})",
            first.candle.timestamp.date_naive(),
            last.candle.timestamp.date_naive(),
            m.total_days,
            if report.range.is_unbounded() {
                ", full history"
            } else {
                ""
            }
        );
    }
    println!(
        "Price: {:.2} ({:+.2}, {:+.2}%)",
        m.current_price, m.price_change, m.price_change_pct
    );
    println!("Range: {:.2} to {:.2}", m.min_price, m.max_price);
    println!(
        "Volume: {} total, {:.0} average",
        m.total_volume, m.avg_volume
    );
    println!(
        "Volatility: {:.2}% ({} risk)",
        m.volatility, report.risk_level
    );
    println!(
        "Days: {} green, {} red, win rate {:.1}%, loss rate {:.1}%",
        m.green_days,
        m.red_days,
        m.win_rate,
        m.loss_rate()
    );
    println!("Trend: {}", m.recent_trend);

    if let Some(latest) = report.latest() {
        println!(
            "Latest: SMA5 {} | SMA20 {} | SMA50 {} | RSI {} | BB {} / {} / {}",
            fmt_opt(latest.sma_5, 2),
            fmt_opt(latest.sma_20, 2),
            fmt_opt(latest.sma_50, 2),
            fmt_opt(latest.rsi, 1),
            fmt_opt(latest.bb_lower, 2),
            fmt_opt(latest.bb_middle, 2),
            fmt_opt(latest.bb_upper, 2),
        );
    }

    if let Some(returns) = &report.stats.daily_return {
        println!(
            "Daily return: mean {:.2}%, std {}, min {:.2}%, max {:.2}%",
            returns.mean,
            fmt_opt(returns.std_dev, 2),
            returns.min,
            returns.max
        );
    }

    println!("Insights:");
    for insight in &report.insights {
        println!("  {} {}", polarity_marker(insight.polarity), insight.message);
    }
}

fn print_snapshot(record: &SnapshotRecord) {
    println!("{} ({})", record.symbol, record.instrument_key);
    println!(
        "  Last: {:.2} ({:+.2}, {:+.2}%)  {:?}",
        record.last_price,
        record.net_change,
        record.net_change_percent,
        record.price_action()
    );
    println!(
        "  OHLC: {:.2} / {:.2} / {:.2} / {:.2}  avg {:.2}",
        record.open, record.high, record.low, record.close, record.average_price
    );
    println!(
        "  Range position: {:.1}%  intraday volatility {}%",
        record.range_position(),
        fmt_opt(record.intraday_volatility(), 2)
    );
    println!(
        "  Volume: {} ({:?})  buy {} / sell {}",
        record.volume,
        record.volume_activity(),
        record.total_buy_quantity,
        record.total_sell_quantity
    );
    println!(
        "  Circuits: {:.2} / {:.2}  buffers {}% / {}%  risk {}",
        record.lower_circuit,
        record.upper_circuit,
        fmt_opt(record.lower_circuit_buffer, 2),
        fmt_opt(record.upper_circuit_buffer, 2),
        record
            .circuit_risk()
            .map_or_else(|| "—".to_string(), |r| r.to_string())
    );
    if !record.timestamp.is_empty() {
        println!("  As of: {}", record.timestamp);
    }
}

/// Destinations for a candle report besides the stdout summary.
#[derive(Default)]
struct CandleOutputs<'a> {
    json: bool,
    export: Option<&'a Path>,
    /// Instrument key and target file for the LLM context.
    llm_context: Option<(&'a str, &'a Path)>,
}

fn render_candles(payload: &str, range: DateRange, outputs: &CandleOutputs<'_>) -> Result<()> {
    let report = analyze_candles(payload, range).context("candle analysis failed")?;

    if let Some((instrument_key, path)) = outputs.llm_context {
        let context = report
            .llm_context(instrument_key)
            .context("failed to build LLM context")?;
        std::fs::write(path, context)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote LLM context for {instrument_key} to {}", path.display());
    }

    if let Some(path) = outputs.export {
        write_parquet(path, &report.records)
            .with_context(|| format!("failed to export to {}", path.display()))?;
        info!(
            "wrote {} enriched bar(s) to {}",
            report.records.len(),
            path.display()
        );
    }

    if outputs.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        print_report(&report);
    }

    Ok(())
}

fn render_quotes(payload: &str) -> Result<()> {
    let records = parse_snapshot_payload(payload).context("quote parsing failed")?;
    if records.is_empty() {
        println!("No quotes in document.");
    }
    for record in &records {
        print_snapshot(record);
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn save_raw(path: Option<&Path>, body: &str) -> Result<()> {
    if let Some(path) = path {
        std::fs::write(path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("saved raw response to {}", path.display());
    }
    Ok(())
}

fn create_provider() -> Result<Box<dyn MarketDataProvider>> {
    Ok(Box::new(
        UpstoxProvider::from_env().context("failed to create Upstox provider")?,
    ))
}

fn cmd_analyze(
    input: &Path,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
    export: Option<&Path>,
    llm_context: Option<&Path>,
    instrument_key: Option<&str>,
) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        anyhow::ensure!(from <= to, "--from {from} is after --to {to}");
    }
    let payload = read_input(input)?;

    let instrument_key = instrument_key
        .or_else(|| input.file_stem().and_then(|s| s.to_str()))
        .unwrap_or("unknown");
    let outputs = CandleOutputs {
        json,
        export,
        llm_context: llm_context.map(|path| (instrument_key, path)),
    };
    render_candles(&payload, DateRange::new(from, to), &outputs)
}

fn cmd_quote(input: &Path) -> Result<()> {
    let payload = read_input(input)?;
    render_quotes(&payload)
}

async fn cmd_fetch_candles(
    instrument_key: &str,
    unit: &str,
    count: u32,
    from: NaiveDate,
    to: NaiveDate,
    out: Option<&Path>,
    llm_context: Option<&Path>,
) -> Result<()> {
    let interval = CandleInterval::parse(unit, count)?;
    let request = HistoricalRequest::new(instrument_key, interval, from, to)?;

    let provider = create_provider()?;
    info!("Using provider: {}", provider.name());

    let body = provider
        .fetch_historical_candles(&request)
        .await
        .with_context(|| format!("failed to fetch candles for {instrument_key}"))?;
    save_raw(out, &body)?;

    let outputs = CandleOutputs {
        llm_context: llm_context.map(|path| (instrument_key, path)),
        ..CandleOutputs::default()
    };
    render_candles(&body, DateRange::all(), &outputs)
}

async fn cmd_fetch_quote(instrument_key: &str, out: Option<&Path>) -> Result<()> {
    let provider = create_provider()?;
    info!("Using provider: {}", provider.name());

    let body = provider
        .fetch_quotes(instrument_key)
        .await
        .with_context(|| format!("failed to fetch quote for {instrument_key}"))?;
    save_raw(out, &body)?;

    render_quotes(&body)
}

async fn cmd_search(directory: &Path, query: &str) -> Result<()> {
    let directory = load_directory(directory)
        .await
        .with_context(|| format!("failed to load {}", directory.display()))?;

    if let Some(instrument) = directory.get(query.trim()) {
        println!("{instrument}");
        return Ok(());
    }

    let matches = directory.search(query);
    if matches.is_empty() {
        println!("No instruments match '{query}'.");
        return Ok(());
    }
    for instrument in matches {
        println!("{instrument}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    match &cli.command {
        Commands::Analyze {
            input,
            from,
            to,
            json,
            export,
            llm_context,
            instrument_key,
        } => {
            cmd_analyze(
                input,
                *from,
                *to,
                *json,
                export.as_deref(),
                llm_context.as_deref(),
                instrument_key.as_deref(),
            )?;
        }
        Commands::Quote { input } => {
            cmd_quote(input)?;
        }
        Commands::FetchCandles {
            instrument_key,
            interval,
            count,
            from,
            to,
            out,
            llm_context,
        } => {
            cmd_fetch_candles(
                instrument_key,
                interval,
                *count,
                *from,
                *to,
                out.as_deref(),
                llm_context.as_deref(),
            )
            .await?;
        }
        Commands::FetchQuote {
            instrument_key,
            out,
        } => {
            cmd_fetch_quote(instrument_key, out.as_deref()).await?;
        }
        Commands::Search { directory, query } => {
            cmd_search(directory, query).await?;
        }
    }

    Ok(())
}
