//! HTTP layer for cinelog.
//!
//! - **Endpoints**: catalog, moderation, administration and import/export routes
//! - **Extractors**: bearer-token user, multipart forms
//! - **Middleware**: authentication and the per-route authorization policy
//! - **Responses**: redirect-with-message flashes and form errors
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::{app, router};
pub use middleware::AppState;
