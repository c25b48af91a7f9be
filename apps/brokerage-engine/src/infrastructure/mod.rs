//! Infrastructure adapters: persistence, bus, pricing, notification, HTTP.

pub mod bus;
pub mod http;
pub mod notify;
pub mod persistence;
pub mod pricing;
pub mod reference;
