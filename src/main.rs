use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use pulsebar::app::{App, notifier_from_config};
use pulsebar::config::{Config, load_config, load_config_from_path};
use pulsebar::event::EventHandler;
use pulsebar::logging;
use pulsebar::system::counters::CounterSource;
use pulsebar::system::platform::HostCounters;

#[derive(Parser)]
#[command(
    name = "pulsebar",
    about = "Status-line agent for host CPU and memory utilization"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Print a JSON snapshot on every update instead of the status line
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log filter, e.g. "info" or "pulsebar=debug"
    #[arg(long)]
    log_level: Option<String>,

    /// Take two samples one interval apart, print a JSON snapshot and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    logging::init(&config.logging.level);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(async {
        if cli.once {
            run_once(config).await
        } else {
            run(config).await
        }
    });
    // A pending blocking stdin read must not hold up exit.
    runtime.shutdown_background();

    result
}

fn host_source() -> Arc<dyn CounterSource> {
    Arc::new(HostCounters::new())
}

async fn run(config: Config) -> Result<()> {
    let mut app = App::new(&config, host_source(), notifier_from_config(&config.output.notifier));
    let mut events = EventHandler::new();

    app.connect(events.sender());
    app.start();

    while app.running {
        let Some(event) = events.next().await else {
            break;
        };
        if app.handle_event(event) {
            app.render(&mut stdout())?;
        }
    }

    app.stop();
    println!();
    Ok(())
}

async fn run_once(config: Config) -> Result<()> {
    let period = config.sampling.schedule().period;
    let app = App::new(&config, host_source(), notifier_from_config(&config.output.notifier));

    app.sample_now();
    tokio::time::sleep(period).await;
    app.sample_now();

    app.write_snapshot(&mut stdout())?;
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(interval) = cli.interval_ms {
        config.sampling.interval_ms = interval;
    }
    if cli.json {
        config.output.mode = "json".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    config
}
