//! Application layer: use cases, pipeline services and outbound ports.

pub mod dto;
pub mod ports;
pub mod services;
pub mod use_cases;
