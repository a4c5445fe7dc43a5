//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, one hub per request)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (fills the span field, echoes `x-request-id`)
//! 4. Security headers
//! 5. Authentication gate (resolves the caller, rejects anonymous callers on
//!    protected routes)

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::{CurrentUser, MaybeUser, authenticate, is_public};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
