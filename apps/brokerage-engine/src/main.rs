//! Brokerage Engine Binary
//!
//! Starts the simulated brokerage pipeline and its HTTP API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin brokerage-engine
//! ```
//!
//! # Environment Variables
//!
//! - `BROKERAGE_SERVER__HOST` / `BROKERAGE_SERVER__PORT`: bind address (default: 127.0.0.1:8080)
//! - `BROKERAGE_PRICING__TICK_INTERVAL_MS`: simulated tick cadence (default: 1000)
//! - `BROKERAGE_PRICING__MARKET_BUFFER`: market-order estimate padding (default: 1.05)
//! - `BROKERAGE_BUS__MAX_ATTEMPTS`: delivery attempts per consumer (default: 5)
//! - `RUST_LOG`: log filter (default: warn,brokerage_engine=info)

use std::sync::Arc;

use anyhow::Context;
use rust_decimal_macros::dec;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use brokerage_engine::application::services::{
    ExecutionService, FanoutService, SettlementService,
};
use brokerage_engine::application::use_cases::{
    CancelOrderUseCase, FundWalletUseCase, GetPortfolioUseCase, PlaceOrderUseCase,
    QueryOrdersUseCase,
};
use brokerage_engine::config::AppConfig;
use brokerage_engine::domain::shared::{Money, SymbolId};
use brokerage_engine::infrastructure::bus::InMemoryEventBus;
use brokerage_engine::infrastructure::http::{AppState, create_router};
use brokerage_engine::infrastructure::notify::SubscriberHub;
use brokerage_engine::infrastructure::persistence::InMemoryStore;
use brokerage_engine::infrastructure::pricing::{CachedPriceSource, SimulatedPriceSource};
use brokerage_engine::infrastructure::reference::InMemoryReferenceData;
use brokerage_engine::telemetry::init_telemetry;

fn opening_prices() -> Vec<(SymbolId, Money)> {
    vec![
        (SymbolId::new("sym-aapl"), Money::new(dec!(189.50))),
        (SymbolId::new("sym-goog"), Money::new(dec!(141.20))),
        (SymbolId::new("sym-msft"), Money::new(dec!(378.90))),
        (SymbolId::new("sym-amzn"), Money::new(dec!(151.75))),
        (SymbolId::new("sym-tsla"), Money::new(dec!(248.30))),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry();
    let config = AppConfig::load().context("loading configuration")?;

    let store = Arc::new(InMemoryStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let reference = Arc::new(InMemoryReferenceData::default_universe());
    let hub = Arc::new(SubscriberHub::new());

    let simulated = Arc::new(SimulatedPriceSource::with_symbols(&opening_prices()));
    let prices = Arc::new(CachedPriceSource::new(
        Arc::clone(&simulated),
        config.pricing.cache_ttl(),
    ));

    let cancel = CancellationToken::new();

    // Pipeline stages.
    let execution = Arc::new(ExecutionService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&prices),
        Arc::clone(&bus),
        config.bus.defer_delay(),
        config.bus.max_attempts,
    ));
    let settlement = Arc::new(SettlementService::new(
        Arc::clone(&store),
        Arc::clone(&bus),
        config.bus.retry_backoff(),
        config.bus.max_attempts,
    ));
    let fanout = Arc::new(FanoutService::new(Arc::clone(&hub), Arc::clone(&bus)));

    tokio::spawn(Arc::clone(&execution).run(cancel.child_token()));
    tokio::spawn(Arc::clone(&settlement).run(cancel.child_token()));
    tokio::spawn(Arc::clone(&fanout).run(cancel.child_token()));
    tokio::spawn(Arc::clone(&simulated).run_ticker(
        Arc::clone(&bus),
        config.pricing.tick_interval(),
        cancel.child_token(),
    ));

    // HTTP API.
    let state = AppState {
        place_order: Arc::new(PlaceOrderUseCase::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&prices),
            Arc::clone(&reference),
            Arc::clone(&bus),
            config.pricing.market_buffer,
        )),
        cancel_order: Arc::new(CancelOrderUseCase::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&bus),
        )),
        portfolio: Arc::new(GetPortfolioUseCase::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&prices),
            Arc::clone(&reference),
        )),
        fund_wallet: Arc::new(FundWalletUseCase::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&reference),
        )),
        queries: Arc::new(QueryOrdersUseCase::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
        )),
        reference,
        hub,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let router = create_router(state);

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "brokerage engine listening");

    let shutdown = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = signal::ctrl_c().await;
            info!("shutdown signal received");
            shutdown.cancel();
        })
        .await
        .context("http server")?;

    cancel.cancel();
    Ok(())
}
