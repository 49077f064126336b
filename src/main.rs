//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here; authentication is delegated to AuthService.

use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tg_herald::adapters::github::GitHubFeed;
use tg_herald::adapters::telegram::{GrammersAuthAdapter, GrammersTransport, session};
use tg_herald::adapters::ui::{TuiCredentialPrompt, TuiInputPort};
use tg_herald::domain::OutboundMessage;
use tg_herald::ports::{AuthPort, ChatTransport, FeedSource, InboundSource, InputPort};
use tg_herald::shared::config::AppConfig;
use tg_herald::usecases::{
    AuthService, DispatchTally, Dispatcher, ForwardService, NotificationEngine, PollService,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("load configuration: {}", e))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cfg.default_log_filter().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env found"),
    }

    let config_path = AppConfig::path();
    if !cfg.has_account_identity() {
        if AppConfig::write_example(&config_path).map_err(|e| anyhow::anyhow!("{}", e))? {
            info!(path = %config_path.display(), "wrote example configuration");
        }
        anyhow::bail!(
            "Set account.api_id and account.api_hash in {} (or TG_HERALD_API_ID / TG_HERALD_API_HASH in .env). Get them from https://my.telegram.org",
            config_path.display()
        );
    }
    cfg.validate().map_err(|e| anyhow::anyhow!("{}", e))?;

    tg_herald::adapters::ui::init_ui();

    // --- Telegram client (cloned for auth and transport; same connection) ---
    let session_path = PathBuf::from(&cfg.account.session_path);
    let tg_client = session::connect(&session_path, cfg.account.api_id, &cfg.account.api_hash)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    // --- Auth: adapter + service, then run flow ---
    let auth_adapter: Arc<dyn AuthPort> =
        Arc::new(GrammersAuthAdapter::new(tg_client.clone(), &session_path));
    let auth_service = AuthService::new(
        auth_adapter,
        Arc::new(TuiCredentialPrompt),
        cfg.account.phone.clone(),
    );
    auth_service
        .run_auth_flow()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let transport = Arc::new(GrammersTransport::new(tg_client));
    let me_id = transport
        .me_id()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    info!(me_id, "logged in");

    // --- Shutdown: Ctrl+C or console Quit ---
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down");
                    shutdown.cancel();
                }
                _ = shutdown.cancelled() => {}
            }
        }
    });

    // --- Engine: one rule set, one dispatcher, shared by both drivers ---
    let dispatcher = Dispatcher::new(
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
        cfg.send_interval(),
        cfg.send_timeout(),
        shutdown.clone(),
    );
    let rules = cfg.watch_rules();
    info!(
        rules = rules.len(),
        enabled = rules.iter().filter(|r| r.enabled).count(),
        "rules loaded"
    );
    let engine = Arc::new(NotificationEngine::new(rules, dispatcher));

    if cfg.monitor.send_startup_message {
        let targets = cfg.startup_targets();
        let results = engine
            .dispatcher()
            .dispatch(&OutboundMessage::text(&cfg.monitor.startup_message), &targets)
            .await;
        let tally = DispatchTally::from_results(&results);
        info!(
            delivered = tally.delivered,
            failed = tally.failed,
            "startup message sent"
        );
    }

    // --- Drivers ---
    let feed: Arc<dyn FeedSource> = Arc::new(
        GitHubFeed::new(&cfg.github.api_url, cfg.github_token(), cfg.request_timeout())
            .map_err(|e| anyhow::anyhow!("{}", e))?,
    );
    let poll_service = PollService::new(
        feed,
        Arc::clone(&engine),
        cfg.repo_watches(),
        cfg.poll_interval(),
        cfg.monitor.max_items_per_check,
        shutdown.clone(),
    );
    let poll_handle = tokio::spawn(async move { poll_service.run_loop().await });

    let forward_handle = if cfg.forward.rules.is_empty() {
        info!("No forward rules configured; chat forwarding disabled");
        None
    } else {
        let forward_service = Arc::new(ForwardService::new(
            Arc::clone(&transport) as Arc<dyn InboundSource>,
            Arc::clone(&engine),
            me_id,
            shutdown.clone(),
        ));
        Some(tokio::spawn(forward_service.run_loop()))
    };

    // --- Run (operator console until Quit / Ctrl+C) ---
    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        Arc::clone(&engine),
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
        shutdown.clone(),
    ));
    if let Err(e) = input_port.run().await {
        warn!(error = %e, "console stopped");
    }
    shutdown.cancel();

    if let Err(e) = poll_handle.await {
        warn!(error = %e, "poll task panicked");
    }
    if let Some(handle) = forward_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "forward task panicked");
        }
    }

    let totals = engine.dispatcher().totals();
    info!(
        delivered = totals.delivered,
        failed = totals.failed,
        "stopped"
    );
    Ok(())
}
