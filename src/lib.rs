// Pixvariant image variant service library

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod imaging;
pub mod jit;
pub mod logging;
pub mod metrics;
pub mod optimize;
pub mod policy;
pub mod security;
pub mod signing;
pub mod source;
pub mod storage;
