//! Write-behind buffering pipeline for traffic logs.
//!
//! Writes are acknowledged once they reach the buffer (queue/cache) layer and
//! are made durable asynchronously by batch drain workers. Reads are served
//! from the cache snapshot taken at preload time and never fall back to the
//! durable store.

pub mod buffer;
pub mod domain;
pub mod drain;
pub mod pipeline;
pub mod preload;
pub mod store;

pub use domain::errors::PipelineError;
pub use domain::log::{IdRange, TrafficLog};
pub use pipeline::LogPipeline;
