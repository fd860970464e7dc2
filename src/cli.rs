use clap::Parser;
use std::{net::SocketAddr, path::PathBuf};

/// mirror_displayd — HTTP-controlled display power and window refresh daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML config file path (default: standard locations)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Detach from the terminal and log to syslog
    #[arg(short = 'd', long = "daemonize", default_value = "false")]
    pub daemonize: bool,

    /// Override the listen address from the config file
    #[arg(short = 'l', long = "listen")]
    pub listen: Option<SocketAddr>,
}
