//! Thin HTTP edge binary: translates OpenAI/Anthropic chat requests onto
//! the canonical gateway core, exposes read-only admin introspection,
//! and runs the background probe loop.

mod args;
mod dto;
mod error;
mod handlers;
mod logger;

use std::sync::Arc;

use anyhow::anyhow;
use axum::Router as AxumRouter;
use axum::routing::{get, post};
use clap::Parser;
use config::GatewayConfig;
use telemetry::TelemetryGuard;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::args::Args;
use crate::handlers::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = GatewayConfig::load(&args.config).map_err(|err| anyhow!("failed to load config from {:?}: {err}", args.config))?;

    let _telemetry_guard = init_otel(&config, &args.log_filter).await;

    log::info!("starting gateway, listening on {}", args.listen);

    let (router, scheduler, election, dispatcher) = gateway_core::build_router(&config);
    let probe_adapters = gateway_core::adapters_for_probing(&config, &router);
    let probe_runner = Arc::new(gateway_core::ProbeRunner::new(config.probe.clone(), probe_adapters, scheduler.clone(), election.clone()));
    tokio::spawn(probe_runner.clone().run_forever());

    let state = Arc::new(AppState {
        router,
        scheduler,
        election,
        dispatcher,
    });

    let app = AxumRouter::new()
        .route("/v1/chat/completions", post(handlers::openai_chat_completions))
        .route("/v1/messages", post(handlers::anthropic_messages))
        .route("/healthz", get(handlers::healthz))
        .route("/admin/scheduler", get(handlers::admin_scheduler))
        .route("/admin/election", get(handlers::admin_election))
        .route("/admin/dispatcher", get(handlers::admin_dispatcher))
        .with_state(state);

    let listener = TcpListener::bind(args.listen).await.map_err(|e| anyhow!("failed to bind to {}: {e}", args.listen))?;

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_signal.cancel();
        }
    });

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.map_err(|e| anyhow!("server error: {e}"))?;
        }
        _ = shutdown.cancelled() => {
            log::info!("received shutdown signal, shutting down gracefully");
        }
    }

    fastrace::flush();
    Ok(())
}

async fn init_otel(config: &GatewayConfig, log_filter: &str) -> Option<TelemetryGuard> {
    match telemetry::init(&config.telemetry).await {
        Ok(guard) => {
            let otel_appender = guard.logs_appender().cloned();
            logger::init(log_filter, otel_appender);
            Some(guard)
        }
        Err(e) => {
            eprintln!("failed to initialize telemetry: {e}");
            logger::init(log_filter, None);
            None
        }
    }
}
