//! HTTP adapter.

pub mod controller;
pub mod response;

pub use controller::{AppState, USER_HEADER, create_router};
pub use response::ApiError;
