use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use poker_ledger::render::{artifact_name, render, summary_line};
use poker_ledger::web;
use poker_ledger::{Ledger, LedgerConfig, OutputFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "poker-ledger",
    version,
    about = "Rebuild a hand-by-hand ledger from a poker session log",
    author,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Exported session log (CSV, newest line first)
    log: Option<PathBuf>,

    /// Your player name, used to place your hole cards
    #[arg(long, short)]
    player: Option<String>,

    /// Where to write the report (defaults to <log>-(<player>).<ext>)
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "csv")]
    format: FormatArg,

    /// Minimum number of seat blocks in the hand table
    #[arg(long, default_value_t = 10)]
    seats: u32,

    /// Disable ANSI colors in CLI output
    #[arg(long = "no-color", default_value_t = false)]
    no_color: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the upload server
    Serve {
        /// Address to bind (HOST:PORT)
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
}

#[derive(Debug, Clone, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = color_eyre::install();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { addr }) => run_server(addr).await?,
        None => run_cli(cli)?,
    }

    Ok(())
}

fn run_cli(cli: Cli) -> Result<()> {
    let (Some(log), Some(player)) = (cli.log, cli.player) else {
        bail!("a log path and --player are required (or use `serve`)");
    };
    let format: OutputFormat = cli.format.into();
    let config = LedgerConfig {
        observer: player.clone(),
        seat_columns: cli.seats,
    };

    let ledger = Ledger::from_path(&log, &config)?;
    let bytes = render(&ledger, format)?;
    let out = cli.out.unwrap_or_else(|| {
        let stem = log
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());
        PathBuf::from(artifact_name(&stem, &player, format))
    });
    std::fs::write(&out, bytes).with_context(|| format!("writing {}", out.display()))?;

    println!("{}", summary_line(&ledger, !cli.no_color));
    println!("Report written to {}", out.display());
    Ok(())
}

async fn run_server(addr: String) -> Result<()> {
    let addr: SocketAddr = addr.parse()?;
    web::serve(addr).await
}
