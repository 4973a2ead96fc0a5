//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the relay endpoints
//! - Stream and download handlers
//! - Request logging and metrics middleware
//! - CORS and panic-catching layers

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
