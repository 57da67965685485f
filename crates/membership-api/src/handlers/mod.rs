//! HTTP handlers.

pub mod health_handler;
pub mod membership_handler;

pub use health_handler::health_routes;
pub use membership_handler::membership_routes;
