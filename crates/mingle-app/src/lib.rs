//! HTTP layer for the mingle backend: routing, middleware, and the handlers
//! that translate requests into service calls.

pub mod app;
pub mod db_handler;
pub mod error;
pub mod middleware;
