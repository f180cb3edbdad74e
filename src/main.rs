use clap::Parser;
use std::sync::Arc;
use tracing::info;

use pomodoro_timer::cli::Cli;
use pomodoro_timer::logging;
use pomodoro_timer::notify::{self, DesktopNotifier, Notifier};
use pomodoro_timer::pomodoro::PhaseEngine;
use pomodoro_timer::ui::{self, OutputFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.engine_config()?;

    let log_file = cli.log.clone().unwrap_or_else(logging::default_log_path);
    logging::init(cli.verbose, &log_file)?;

    if cli.output == OutputFormat::Text {
        println!("🍅 Pomodoro Timer");
        println!("======================================================");
        println!(
            "Pomodoro settings: {} work / {} break / {} long break every {} sessions",
            humantime::format_duration(config.work),
            humantime::format_duration(config.short_break),
            humantime::format_duration(config.long_break),
            config.long_every
        );
        if cli.verbose {
            println!("Verbose mode: ON");
        }
        println!("Logging to: {}", log_file.display());
    }

    let engine = Arc::new(PhaseEngine::new(config)?);
    let notifier: Option<Arc<dyn Notifier>> = if cli.no_notify {
        None
    } else {
        Some(Arc::new(DesktopNotifier))
    };
    engine.set_subscriber(notify::subscriber(notifier, config));
    info!(?config, "timer ready");

    if cli.autostart {
        engine.start();
    }

    ui::run(Arc::clone(&engine), cli.output).await?;
    info!(completed_work = engine.state().completed_work, "timer exited");
    Ok(())
}
