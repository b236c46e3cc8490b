//! API Module
//!
//! HTTP handlers and routing for the key-value server.
//!
//! # Endpoints
//! - `POST /set?id=<key>` - Store a value
//! - `GET /get?id=<key>` - Retrieve a value
//! - `DELETE /del?id=<key>` - Delete a key
//! - `GET /stats` - Cache and pool statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
