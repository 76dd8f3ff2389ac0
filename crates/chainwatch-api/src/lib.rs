//! chainwatch-api: HTTP query API over a running [`chainwatch_core::WatchService`].
//!
//! Every response uses the same envelope; see [`response`]. Requests carry a
//! correlation id from the `X-Request-ID` header (generated when absent),
//! echoed back on the response.

pub mod error;
pub mod response;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{router, serve, RequestId, REQUEST_ID_HEADER};
