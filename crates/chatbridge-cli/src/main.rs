use clap::{CommandFactory, Parser};
use std::path::PathBuf;

mod cli;
mod serve;

use cli::*;
use serve::{run_models_command, run_serve_command, show_config};

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("chatbridge")
        .join("log")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logs = match &cli.command {
        Some(Commands::Serve {
            print_logs,
            log_dir,
            ..
        }) => {
            let logs = chatbridge_util::init_tracing(
                Some(log_dir.clone().unwrap_or_else(default_log_dir)),
                *print_logs,
            );
            if let Some(path) = &logs.path {
                println!("Logging to {}", path.display());
            }
            Some(logs)
        }
        Some(_) => Some(chatbridge_util::init_tracing(None, true)),
        None => None,
    };

    let project_dir = match cli.project {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let mut settings = chatbridge_config::load_config(&project_dir)?;

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            backend_url,
            ..
        }) => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            if let Some(url) = backend_url {
                settings.backend.url = url.trim_end_matches('/').to_string();
            }
            run_serve_command(settings).await?;
        }
        Some(Commands::Models { backend_url, json }) => {
            if let Some(url) = backend_url {
                settings.backend.url = url.trim_end_matches('/').to_string();
            }
            run_models_command(settings, json).await?;
        }
        Some(Commands::Config) => {
            show_config(&settings)?;
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
