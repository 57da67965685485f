//! Common utilities shared across the workspace.
//!
//! This crate provides:
//! - Unified error handling with stage-aware HTTP responses
//! - Configuration structures for the directory client and fan-out

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, ErrorBody, ErrorResponse, Stage};
