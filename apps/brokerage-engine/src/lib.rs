// Allow unwrap/expect and pedantic noise in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Brokerage Engine - Rust Core Library
//!
//! Simulated retail brokerage backend: an event-driven pipeline from order
//! intake through execution and settlement to notification fan-out.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `orders`: Order aggregate, validation, status lifecycle
//!   - `trading`: Trades, wallets, holdings, ledger, settlement
//!   - `events`: Bus event envelope and topics
//!   - `shared`: Money, Quantity, Timestamp, typed identifiers
//!
//! - **Application**: Use cases and pipeline stages
//!   - `ports`: Interfaces for external systems (`EventBusPort`, `PriceSourcePort`)
//!   - `use_cases`: `PlaceOrder`, `CancelOrder`, `GetPortfolio`, `FundWallet`, queries
//!   - `services`: Execution, settlement and fan-out consumer loops
//!   - `dto`: Request/response shapes for API boundaries
//!
//! - **Infrastructure**: Adapters
//!   - `persistence`: In-memory store with per-user locking
//!   - `bus`: In-memory event bus with consumer groups
//!   - `pricing`: Simulated random-walk price source, TTL cache
//!   - `notify`: Subscriber hub for live client pushes
//!   - `http`: Axum REST and WebSocket API

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod telemetry;

pub use error::{BrokerageError, ErrorCode};
