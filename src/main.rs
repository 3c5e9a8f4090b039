mod apex;
mod config;
mod dashboard;
mod derive;
mod fetch;
mod loader;
mod models;
mod report;
mod store;
mod utils;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::apex::ApexView;
use crate::config::{AppConfig, ViewMode};
use crate::dashboard::Dashboard;
use crate::derive::MarketCapBand;
use crate::fetch::source_from_config;
use crate::models::SignalColor;
use crate::store::{group_by_ticker, DateWindow, SignalFilter, SortDirection, SortKey};

#[derive(Parser)]
#[command(name = "crashdash", about = "LSE crash-signal dashboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Flat signal table (newest first by default)
    Signals {
        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        sort: SortArgs,

        /// Page through the full history instead of capping the table
        #[arg(long)]
        page: Option<usize>,

        /// Table rendering mode; persisted for later runs
        #[arg(long)]
        view: Option<ViewMode>,
    },

    /// One row per ticker, its signals grouped under the latest
    Tickers {
        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        sort: SortArgs,
    },

    /// Full detail card for one ticker
    Show { ticker: String },

    /// APEX composite-score report for one ticker
    Apex { ticker: String },

    /// Price history summary with signal markers
    Chart { ticker: String },

    /// Scan-level statistics
    Stats,
}

#[derive(Args)]
struct FilterArgs {
    /// Substring match on ticker or company name
    #[arg(short, long)]
    search: Option<String>,

    /// Signal color (PURPLE, RED, ORANGE, GREEN, YELLOW)
    #[arg(long, value_parser = parse_color)]
    color: Option<SignalColor>,

    #[arg(long)]
    sector: Option<String>,

    #[arg(long)]
    industry: Option<String>,

    /// Exchange-market pair, e.g. LSE-AIM or AQUIS-MAIN
    #[arg(long)]
    market: Option<String>,

    #[arg(long)]
    cap_band: Option<MarketCapBand>,

    /// Let a cap-band filter admit tickers with no resolvable market cap
    #[arg(long)]
    include_unknown_cap: bool,

    /// Lookback window
    #[arg(short, long, default_value = "all")]
    window: DateWindow,

    /// Custom range start (YYYY-MM-DD, inclusive)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Custom range end (YYYY-MM-DD, inclusive)
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Args)]
struct SortArgs {
    #[arg(long, default_value = "date")]
    sort: SortKey,

    #[arg(long, default_value = "desc")]
    dir: SortDirection,
}

fn parse_color(s: &str) -> Result<SignalColor, String> {
    SignalColor::parse(s).ok_or_else(|| format!("unknown signal color {:?}", s))
}

impl FilterArgs {
    fn into_filter(self, config: &AppConfig) -> SignalFilter {
        SignalFilter {
            search: self.search,
            color: self.color,
            sector: self.sector,
            industry: self.industry,
            market: self.market,
            cap_band: self.cap_band,
            include_unknown_market_cap: self.include_unknown_cap
                || config.filters.include_unknown_market_cap,
            window: self.window,
            from: self.from,
            to: self.to,
            reference_date: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "crashdash=info,warn",
        1 => "crashdash=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let source = source_from_config(&config.source)?;

    match cli.command {
        Command::Signals {
            filter,
            sort,
            page,
            view,
        } => {
            let _t = utils::Timer::start("Signal table");
            let dash = Dashboard::load(source).await?;

            let mode = match view {
                Some(mode) => {
                    mode.save(&config.display.view_state_path);
                    mode
                }
                None => ViewMode::load(&config.display.view_state_path),
            };

            let mut signals = dash.store.filter_signals(&filter.into_filter(&config));
            dash.store.sort_signals(&mut signals, sort.sort, sort.dir);

            match page {
                Some(page) => report::print_signal_page(
                    &dash.store,
                    &signals,
                    mode,
                    page.max(1),
                    config.display.page_size,
                ),
                None => report::print_signals(&dash.store, &signals, mode, config.display.max_rows),
            }
        }

        Command::Tickers { filter, sort } => {
            let _t = utils::Timer::start("Grouped ticker table");
            let dash = Dashboard::load(source).await?;

            let signals = dash.store.filter_signals(&filter.into_filter(&config));
            let mut groups = group_by_ticker(&signals);
            dash.store.sort_groups(&mut groups, sort.sort, sort.dir);

            report::print_groups(&dash.store, &groups);
        }

        Command::Show { ticker } => {
            let mut dash = Dashboard::load(source).await?;
            let meta = dash.ticker_details(&ticker).await?.clone();
            report::print_ticker_detail(&dash.store, &ticker, &meta);
        }

        Command::Apex { ticker } => {
            let dash = Dashboard::load(source).await?;
            let profile = dash.apex_profile(&ticker).await?;
            report::print_apex(&ticker, &ApexView::from_profile(&profile));
        }

        Command::Chart { ticker } => {
            let dash = Dashboard::load(source).await?;
            let chart = dash.chart(&ticker).await?;
            report::print_chart_summary(&ticker, &chart);
        }

        Command::Stats => {
            let dash = Dashboard::load(source).await?;
            let unique = group_by_ticker(&dash.store.signals).len();
            report::print_stats(&dash.store.stats, unique);
        }
    }

    Ok(())
}
