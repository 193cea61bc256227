//! Tabletop - a card table in the terminal.
//!
//! Starts the console server, takes over the terminal and runs the tick
//! loop until the window is closed or a console sends `stop`.

use clap::Parser;
use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tabletop::config::LogConfig;
use tabletop::{control, window, AssetCatalog, Config, ConsoleServer, Orchestrator, TerminalWindow};
use tracing::{error, info};

/// Tabletop - a parallel card table for the terminal
#[derive(Parser, Debug)]
#[command(name = "tabletop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Console server listen address
    #[arg(long)]
    console_addr: Option<SocketAddr>,

    /// Do not start the console server
    #[arg(long)]
    no_console: bool,

    /// Fan-out worker threads (0 = one per core)
    #[arg(short, long)]
    workers: Option<usize>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = self.console_addr {
            config.console.addr = addr;
        }
        if self.no_console {
            config.console.enabled = false;
        }
        if let Some(workers) = self.workers {
            config.engine.workers = workers;
        }
    }
}

/// Log to a file; the terminal is the render surface.
fn init_tracing(log: &LogConfig) -> tabletop::Result<()> {
    let file = File::create(&log.file)?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = log.json || matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        window::restore_terminal();
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
        eprintln!("{info}");
    }));
    Ok(())
}

fn run(cli: &Cli) -> tabletop::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    init_tracing(&config.log)?;

    let catalog = match &config.assets {
        Some(path) => AssetCatalog::from_json_file(path)?,
        None => AssetCatalog::builtin(),
    };
    info!(assets = catalog.len(), "asset catalog loaded");

    let (sender, receiver) = control::channel(config.engine.control_capacity);
    let console = if config.console.enabled {
        Some(ConsoleServer::spawn(config.console.addr, sender)?)
    } else {
        drop(sender);
        None
    };

    let window = TerminalWindow::open(&config.window)?;
    let mut table = Orchestrator::new(window, &config, &catalog, receiver)?;
    table.run()?;

    if let Some(console) = console {
        console.join();
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "tabletop failed");
            eprintln!("tabletop: {e}");
            ExitCode::FAILURE
        }
    }
}
