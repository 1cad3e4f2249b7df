use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chatbridge")]
#[command(about = "OpenAI-compatible chat endpoint backed by an agent server", long_about = None)]
pub(crate) struct Cli {
    /// Directory searched for chatbridge.json{c,}
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) project: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    #[command(about = "Run the HTTP bridge")]
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long = "backend-url")]
        backend_url: Option<String>,
        #[arg(long = "print-logs", default_value_t = false)]
        print_logs: bool,
        #[arg(long = "log-dir")]
        log_dir: Option<PathBuf>,
    },
    #[command(about = "List models exposed by the bridge")]
    Models {
        #[arg(long = "backend-url")]
        backend_url: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    #[command(about = "Print the effective configuration")]
    Config,
}
