/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (CORS / request-id / timeout / trace)
 * - axum::serve() で起動し、Ctrl-C / SIGTERM で graceful shutdown
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    error,
    middleware::{cors, http},
    repos::{DrinkStore, MemoryDrinkStore, PgDrinkStore},
    services::auth::build_authorizer,
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG があればそちらを優先
    // Ex: RUST_LOG=info,drinks_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr が見えない起動方法でも panic を tracing 経由で残す
        tracing::error!(?info, "panic");

        // development: 即座にプロセスを落として気付けるようにする
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting drinks API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let store: Arc<dyn DrinkStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("using postgres drink store");
            Arc::new(PgDrinkStore::connect(url).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; drinks are kept in memory");
            Arc::new(MemoryDrinkStore::new())
        }
    };

    let authorizer = build_authorizer(config)?;

    Ok(AppState::new(store, authorizer))
}

/// Full application router: routes, JSON 404 fallback, CORS and the HTTP stack.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::routes(&state)
        .fallback(error::not_found)
        .with_state(state);

    let router = cors::apply(router, config);
    http::apply(router, config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
