// On-demand transformation service
//
// Serves `<route_prefix><key>?w=&h=&format=&q=` requests: verifies the
// signature, validates parameters, consults the variant cache, and
// transforms the original from the source on a miss.

pub mod config;
pub mod params;
pub mod response;
pub mod service;

pub use config::{JitConfig, UrlSigningConfig};
pub use params::{needs_transform, parse_params};
pub use response::{
    generate_etag, handle_conditional_request, CacheStatus, ConditionalResult, JitResponse,
};
pub use service::{JitRequest, JitService};
