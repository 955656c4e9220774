use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `gesture-arm` - drive a servo arm from hand poses over serial.
#[derive(Parser, Debug)]
#[command(name = "gesture-arm")]
#[command(version)]
#[command(about = "Hand-pose driven servo control for a prosthetic arm.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.gesture-arm/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a control session (keys on stdin: q quit, r reset, e emergency stop)
    Run {
        /// Serial port, overriding the config
        #[arg(short, long)]
        port: Option<String>,

        /// Replay JSON-lines pose records from this file
        #[arg(long)]
        poses: Option<PathBuf>,

        /// Use the in-process simulated controller instead of a serial port
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the config and print the joint table
    Check,

    /// Move every servo through its range, then back to rest
    Sweep {
        /// Serial port, overriding the config
        #[arg(short, long)]
        port: Option<String>,

        /// Pause after each move, in milliseconds
        #[arg(long, default_value = "1000")]
        pause_ms: u64,

        /// Use the in-process simulated controller instead of a serial port
        #[arg(long)]
        dry_run: bool,
    },
}
