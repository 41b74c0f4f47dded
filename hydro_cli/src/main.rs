mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn load_config(path: &Path) -> eyre::Result<hydro_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    hydro_config::load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))
}

fn rotation(name: Option<&str>) -> Rotation {
    match name {
        Some("never") => Rotation::NEVER,
        Some("minutely") => Rotation::MINUTELY,
        Some("hourly") => Rotation::HOURLY,
        _ => Rotation::DAILY,
    }
}

/// Console layer on stderr, plus a JSON-lines file layer when a log
/// directory is configured.
fn init_tracing(cli: &Cli, logging: &hydro_config::Logging) -> eyre::Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if cli.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file = match cli.log_dir.as_ref().or(logging.dir.as_ref()) {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("create log dir {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(rotation(logging.rotation.as_deref()))
                .filename_prefix("hydroponics")
                .filename_suffix("log")
                .max_log_files(logging.max_files)
                .build(dir)
                .wrap_err("init rolling log file")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let mut cfg = load_config(&cli.config)?;
    init_tracing(&cli, &cfg.logging)?;
    let json = cli.json;

    match cli.cmd {
        Commands::Run {
            tick_secs,
            max_ticks,
            stats,
        } => {
            if let Some(secs) = tick_secs {
                cfg.control.tick_secs = secs;
            }
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "could not install interrupt handler");
            }

            let loop_stats = run::run_loop(&cfg, max_ticks, shutdown)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "status": "stopped", "stats": run::stats_json(&loop_stats) })
                );
            } else {
                println!("control loop stopped after {} ticks", loop_stats.ticks);
            }
            if stats {
                run::print_stats(&loop_stats, Duration::from_secs(cfg.control.tick_secs));
            }
            Ok(())
        }
        Commands::SelfCheck => {
            let results = run::self_check(&cfg)?;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            if json {
                let sensors: serde_json::Map<String, serde_json::Value> = results
                    .iter()
                    .map(|(s, r)| {
                        let v = match r {
                            Ok(v) => serde_json::json!({ "ok": true, "value": v }),
                            Err(e) => serde_json::json!({ "ok": false, "error": e }),
                        };
                        (s.to_string(), v)
                    })
                    .collect();
                println!("{}", serde_json::json!({ "sensors": sensors, "failed": failed }));
            } else {
                for (s, r) in &results {
                    match r {
                        Ok(v) => println!("{s:<20} ok    {v}"),
                        Err(e) => println!("{s:<20} FAIL  {e}"),
                    }
                }
            }
            if failed > 0 {
                eyre::bail!("self-check failed: {failed} sensor(s) unreadable");
            }
            if !json {
                println!("self-check ok");
            }
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: color-eyre not installed: {e}");
    }

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "hydro failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}
