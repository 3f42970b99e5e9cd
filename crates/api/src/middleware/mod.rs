//! HTTP middleware components.

pub mod features;
pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod security_headers;
pub mod trace_id;
pub mod user_auth;

pub use features::require_product_approval;
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use rate_limit::{api_rate_limit, auth_rate_limit, RateLimiter};
pub use security_headers::security_headers_middleware;
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
pub use user_auth::UserAuth;
