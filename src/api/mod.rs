//! HTTP API Handlers and Routes
//!
//! A thin HTTP layer over [`RagPipeline`](crate::rag::RagPipeline), built on
//! the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `GET /health` - Liveness, index readiness and the selected backend
//! - `POST /api/ask` - `{"query": "..."}` to `{"answer", "backend", "failed", "contexts"}`
//!
//! # Errors
//!
//! Errors are JSON bodies of the form `{"error": "..."}`. Missing or
//! inconsistent index artifacts and an unavailable embedding model are
//! `503 Service Unavailable`; an empty query is `400 Bad Request`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
