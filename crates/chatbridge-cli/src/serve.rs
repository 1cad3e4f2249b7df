use anyhow::Context;
use chatbridge_config::Settings;
use chatbridge_server::{run_server, ServerState};
use std::net::SocketAddr;
use std::sync::Arc;

pub(crate) async fn run_serve_command(settings: Settings) -> anyhow::Result<()> {
    let addr = resolve_listen_addr(&settings.server.host, settings.server.port).await?;

    let state = Arc::new(ServerState::from_settings(&settings)?);
    tracing::info!(
        backend = %settings.backend.url,
        poll_interval_ms = settings.poll.interval_ms,
        poll_max_attempts = settings.poll.max_attempts,
        "bridge configured"
    );
    println!(
        "chatbridge listening on http://{} (backend {})",
        addr, settings.backend.url
    );
    run_server(addr, state).await
}

/// Resolves `host:port`, accepting hostnames such as `localhost` as well as
/// literal IPs. The first resolved address wins.
pub(crate) async fn resolve_listen_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("invalid listen address {}:{}", host, port))?
        .next()
        .with_context(|| format!("listen address {}:{} did not resolve", host, port))
}

pub(crate) async fn run_models_command(settings: Settings, json: bool) -> anyhow::Result<()> {
    let state = ServerState::from_settings(&settings)?;
    let models = state.bridge.models().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }
    for model in &models.data {
        println!("{:<40} {}", model.id, model.owned_by);
    }
    Ok(())
}

pub(crate) fn show_config(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
