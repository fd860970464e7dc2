use std::fs::File;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use daemonize::Daemonize;
use log::{LevelFilter, info};
use syslog::{BasicLogger, Facility, Formatter3164};

use mirror_displayd::{application::Application, cli::Cli, config::Config};

const DAEMON_LOG: &str = "/var/tmp/mirror_displayd.log";

fn init_syslog() -> Result<()> {
    syslog::unix(Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: "mirror_displayd".into(),
        pid: 0,
    })
    .map_err(|e| anyhow!("{e}"))
    .and_then(|logger| {
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|_| log::set_max_level(LevelFilter::Info))
            .map_err(|e| anyhow!("{e}"))
    })
}

fn init_stderr_log() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn into_daemon() -> Result<()> {
    File::create(DAEMON_LOG)
        .and_then(|out| Ok((out.try_clone()?, out)))
        .map_err(|e| anyhow!("{e}"))
        .and_then(|(stderr, stdout)| {
            Daemonize::new()
                .stdout(stdout)
                .stderr(stderr)
                .start()
                .map_err(|e| anyhow!("{e}"))
        })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.daemonize {
        init_syslog().context("Failed to connect to syslog")?;
    } else {
        init_stderr_log();
    }

    let mut config = Config::load(cli.config)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    // Fork before the runtime spawns its worker threads.
    if cli.daemonize {
        into_daemon().context("Failed to daemonize")?;
    }

    info!(
        "Controlling output {} on display {} (rotation: {})",
        config.display.output, config.display.display, config.display.rotation
    );

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?
        .block_on(async {
            Application::builder()
                .with_config(config)
                .build()?
                .run()
                .await
        })
}
