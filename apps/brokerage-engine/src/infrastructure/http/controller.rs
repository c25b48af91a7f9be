//! REST and streaming API that delegates to application use cases.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;

use super::response::{ApiError, HealthResponse};
use crate::application::ports::{EventBusPort, PriceSourcePort, ReferenceDataPort};
use crate::application::use_cases::{
    CancelOrderUseCase, FundWalletUseCase, GetPortfolioUseCase, PlaceOrderUseCase,
    QueryOrdersUseCase,
};
use crate::application::dto::{PlaceOrderRequest, WalletMovementRequest};
use crate::domain::orders::{OrderRepository, OrderStatus};
use crate::domain::shared::{OrderId, UserId};
use crate::domain::trading::{
    HoldingRepository, LedgerRepository, TradeRepository, WalletRepository,
};
use crate::error::BrokerageError;
use crate::infrastructure::notify::SubscriberHub;

/// Header carrying the caller's user id.
pub const USER_HEADER: &str = "x-user-id";

/// Everything a store must implement to back the API.
pub trait ApiStore:
    OrderRepository + WalletRepository + HoldingRepository + TradeRepository + LedgerRepository
{
}

impl<T> ApiStore for T where
    T: OrderRepository + WalletRepository + HoldingRepository + TradeRepository + LedgerRepository
{
}

/// Application state shared across handlers.
pub struct AppState<S, P, R, B>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    /// Order placement.
    pub place_order: Arc<PlaceOrderUseCase<S, S, S, P, R, B>>,
    /// Order cancellation.
    pub cancel_order: Arc<CancelOrderUseCase<S, S, S, B>>,
    /// Portfolio read model.
    pub portfolio: Arc<GetPortfolioUseCase<S, S, P, R>>,
    /// Wallet funding.
    pub fund_wallet: Arc<FundWalletUseCase<S, S, R>>,
    /// Order, trade and ledger history.
    pub queries: Arc<QueryOrdersUseCase<S, S, S>>,
    /// Symbol reference data.
    pub reference: Arc<R>,
    /// Live subscriber registry.
    pub hub: Arc<SubscriberHub>,
    /// Application version.
    pub version: String,
}

impl<S, P, R, B> Clone for AppState<S, P, R, B>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    fn clone(&self) -> Self {
        Self {
            place_order: Arc::clone(&self.place_order),
            cancel_order: Arc::clone(&self.cancel_order),
            portfolio: Arc::clone(&self.portfolio),
            fund_wallet: Arc::clone(&self.fund_wallet),
            queries: Arc::clone(&self.queries),
            reference: Arc::clone(&self.reference),
            hub: Arc::clone(&self.hub),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<S, P, R, B>(state: AppState<S, P, R, B>) -> Router
where
    S: ApiStore + 'static,
    P: PriceSourcePort + 'static,
    R: ReferenceDataPort + 'static,
    B: EventBusPort + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/symbols", get(list_symbols))
        .route("/api/v1/orders", post(place_order).get(list_orders))
        .route("/api/v1/orders/{id}", get(get_order))
        .route("/api/v1/orders/{id}", delete(cancel_order))
        .route("/api/v1/portfolio", get(get_portfolio))
        .route("/api/v1/trades", get(list_trades))
        .route("/api/v1/ledger", get(list_ledger))
        .route("/api/v1/wallet", get(get_wallet))
        .route("/api/v1/wallet/deposits", post(deposit))
        .route("/api/v1/wallet/withdrawals", post(withdraw))
        .route("/api/v1/stream", get(stream))
        .with_state(state)
}

fn caller(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(UserId::new)
        .ok_or_else(|| {
            ApiError(BrokerageError::Validation(format!(
                "missing {USER_HEADER} header"
            )))
        })
}

async fn health<S, P, R, B>(State(state): State<AppState<S, P, R, B>>) -> impl IntoResponse
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

async fn list_symbols<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let symbols = state
        .reference
        .list_symbols()
        .await
        .map_err(BrokerageError::from)?;
    let body: Vec<serde_json::Value> = symbols
        .into_iter()
        .map(|s| {
            serde_json::json!({
                "id": s.id.to_string(),
                "ticker": s.ticker,
                "name": s.name,
            })
        })
        .collect();
    Ok(Json(body))
}

async fn place_order<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let view = state.place_order.execute(&user, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Query string for the order list.
#[derive(Debug, Deserialize)]
struct OrderListQuery {
    status: Option<OrderStatus>,
}

async fn list_orders<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let orders = state.queries.list_orders(&user, query.status).await?;
    Ok(Json(orders))
}

async fn get_order<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let order = state.queries.get_order(&user, &OrderId::new(id)).await?;
    Ok(Json(order))
}

async fn cancel_order<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let order = state.cancel_order.execute(&user, &OrderId::new(id)).await?;
    Ok(Json(order))
}

async fn get_portfolio<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let view = state.portfolio.execute(&user).await?;
    Ok(Json(view))
}

async fn list_trades<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let trades = state.queries.list_trades(&user).await?;
    Ok(Json(trades))
}

async fn list_ledger<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let entries = state.queries.list_ledger(&user).await?;
    Ok(Json(entries))
}

async fn get_wallet<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let view = state.portfolio.execute(&user).await?;
    Ok(Json(view.wallet))
}

async fn deposit<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
    Json(request): Json<WalletMovementRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let view = state.fund_wallet.deposit(&user, request).await?;
    Ok(Json(view))
}

async fn withdraw<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
    Json(request): Json<WalletMovementRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let view = state.fund_wallet.withdraw(&user, request).await?;
    Ok(Json(view))
}

async fn stream<S, P, R, B>(
    State(state): State<AppState<S, P, R, B>>,
    headers: HeaderMap,
    upgrade: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError>
where
    S: ApiStore,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    let user = caller(&headers)?;
    let hub = Arc::clone(&state.hub);
    Ok(upgrade.on_upgrade(move |socket| serve_stream(socket, hub, user)))
}

/// Forward the caller's portfolio updates and the market tick broadcast
/// over one socket until the client goes away.
async fn serve_stream(mut socket: WebSocket, hub: Arc<SubscriberHub>, user: UserId) {
    let mut portfolio = hub.subscribe_user(&user);
    let mut market = hub.subscribe_market();
    debug!(user_id = %user, "stream connected");

    loop {
        let notification = tokio::select! {
            n = portfolio.recv() => n,
            n = market.recv() => n,
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => continue,
                }
            }
        };
        let Some(notification) = notification else {
            break;
        };
        let Ok(text) = serde_json::to_string(&notification) else {
            continue;
        };
        if socket.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
    debug!(user_id = %user, "stream disconnected");
}
