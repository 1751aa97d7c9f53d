//! Fan-out aggregator.
//!
//! Dispatches independent completion calls concurrently under a bounded
//! limit and collects every settled outcome into an `AggregateReport`.

pub mod aggregator;
pub mod retry;

pub use aggregator::{FanoutAggregator, FanoutConfig, DEFAULT_CONCURRENCY};
pub use retry::{complete_with_retry, CallOutcome, RetryPolicy};
