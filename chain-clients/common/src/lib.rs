//! Shared utilities for chain client libraries.
//!
//! Every network call made by the chain clients goes through the policy in
//! [`retry`]: reads are retried a bounded number of times, each attempt
//! bounded by a timeout.

pub mod retry;

pub use retry::{with_retry, RetryError, RetryPolicy};
